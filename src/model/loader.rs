use std::{fs, path::Path, sync::Arc};

use serde::Deserialize;

use crate::{
    error::ServiceError,
    model::{
        Feature, Model,
        linear::{LinearModel, Link},
    },
};

pub const MANIFEST_FILE: &str = "model.json";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogisticOutput {
    Label,
    Probability,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Manifest {
    LinearRegression {
        name: Option<String>,
        features: Vec<Feature>,
        coefficients: Vec<f64>,
        intercept: f64,
    },
    LogisticRegression {
        name: Option<String>,
        features: Vec<Feature>,
        coefficients: Vec<f64>,
        intercept: f64,
        #[serde(default = "default_threshold")]
        threshold: f64,
        #[serde(default)]
        output: Option<LogisticOutput>,
    },
    Torchscript {
        name: Option<String>,
        features: Vec<Feature>,
        #[serde(default = "default_module_file")]
        file: String,
    },
}

fn default_threshold() -> f64 {
    0.5
}

fn default_module_file() -> String {
    "model.pt".to_string()
}

/// Loads the model stored in the artifact directory `dir`.
pub fn load_model(dir: &Path) -> Result<Arc<dyn Model>, ServiceError> {
    if !dir.is_dir() {
        return Err(ServiceError::Artifact(format!(
            "model artifact directory missing: {}",
            dir.display()
        )));
    }
    let manifest_path = dir.join(MANIFEST_FILE);
    if !manifest_path.exists() {
        return Err(ServiceError::Artifact(format!(
            "model manifest missing: {}",
            manifest_path.display()
        )));
    }

    let raw = fs::read_to_string(&manifest_path)?;
    let manifest: Manifest = serde_json::from_str(&raw).map_err(|e| {
        ServiceError::Artifact(format!("invalid manifest {}: {e}", manifest_path.display()))
    })?;

    let fallback_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "model".to_string());

    let model: Arc<dyn Model> = match manifest {
        Manifest::LinearRegression {
            name,
            features,
            coefficients,
            intercept,
        } => Arc::new(LinearModel::new(
            name.as_deref().unwrap_or(&fallback_name),
            dir,
            features,
            coefficients,
            intercept,
            Link::Identity,
        )?),
        Manifest::LogisticRegression {
            name,
            features,
            coefficients,
            intercept,
            threshold,
            output,
        } => Arc::new(LinearModel::new(
            name.as_deref().unwrap_or(&fallback_name),
            dir,
            features,
            coefficients,
            intercept,
            Link::Logistic {
                threshold,
                probability: matches!(output, Some(LogisticOutput::Probability)),
            },
        )?),
        Manifest::Torchscript {
            name,
            features,
            file,
        } => load_torchscript(
            name.as_deref().unwrap_or(&fallback_name),
            &dir.join(file),
            features,
        )?,
    };

    Ok(model)
}

#[cfg(feature = "tch-backend")]
fn load_torchscript(
    name: &str,
    module_path: &Path,
    features: Vec<Feature>,
) -> Result<Arc<dyn Model>, ServiceError> {
    let model = crate::model::tch_backend::TorchScriptModel::load(name, module_path, features)?;
    Ok(Arc::new(model))
}

#[cfg(not(feature = "tch-backend"))]
fn load_torchscript(
    _name: &str,
    module_path: &Path,
    _features: Vec<Feature>,
) -> Result<Arc<dyn Model>, ServiceError> {
    Err(ServiceError::Artifact(format!(
        "{} is a torchscript module but the service was built without the `tch-backend` feature",
        module_path.display()
    )))
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::model::{Record, RecordBatch};

    fn artifact(manifest: &str) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        dir
    }

    fn one_record() -> RecordBatch {
        RecordBatch::new(vec![Record { gre: 320.0, gpa: 3.8 }]).unwrap()
    }

    #[test]
    fn loads_linear_regression() {
        let dir = artifact(
            r#"{"kind": "linear_regression", "name": "lin", "features": ["gre", "gpa"],
                "coefficients": [0.0, 1.0], "intercept": 0.5}"#,
        );
        let model = load_model(dir.path()).unwrap();
        let meta = model.metadata();
        assert_eq!(meta.name, "lin");
        assert_eq!(meta.kind, "linear_regression");
        let out = model.predict(&one_record()).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0] - 4.3).abs() < 1e-9);
    }

    #[test]
    fn logistic_defaults_to_labels() {
        let dir = artifact(
            r#"{"kind": "logistic_regression", "features": ["gre", "gpa"],
                "coefficients": [0.0, 0.0], "intercept": 1.0}"#,
        );
        let model = load_model(dir.path()).unwrap();
        assert_eq!(model.metadata().kind, "logistic_regression");
        assert_eq!(model.predict(&one_record()).unwrap(), vec![1.0]);
    }

    #[test]
    fn logistic_probability_output() {
        let dir = artifact(
            r#"{"kind": "logistic_regression", "features": ["gpa"],
                "coefficients": [0.0], "intercept": 0.0, "output": "probability"}"#,
        );
        let model = load_model(dir.path()).unwrap();
        assert_eq!(model.predict(&one_record()).unwrap(), vec![0.5]);
    }

    #[test]
    fn missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_model(&dir.path().join("absent")).err().unwrap();
        assert!(matches!(err, ServiceError::Artifact(_)));
    }

    #[test]
    fn missing_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_model(dir.path()).is_err());
    }

    #[test]
    fn unknown_feature_fails() {
        let dir = artifact(
            r#"{"kind": "linear_regression", "features": ["gre", "rank"],
                "coefficients": [1.0, 1.0], "intercept": 0.0}"#,
        );
        assert!(load_model(dir.path()).is_err());
    }

    #[test]
    fn unknown_kind_fails() {
        let dir = artifact(r#"{"kind": "random_forest", "features": ["gre"]}"#);
        assert!(load_model(dir.path()).is_err());
    }

    #[cfg(not(feature = "tch-backend"))]
    #[test]
    fn torchscript_requires_feature() {
        let dir = artifact(r#"{"kind": "torchscript", "features": ["gre", "gpa"]}"#);
        let err = load_model(dir.path()).err().unwrap();
        assert!(err.to_string().contains("tch-backend"));
    }
}
