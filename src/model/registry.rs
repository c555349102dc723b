use std::{path::Path, sync::Arc};

use tokio::task;

use crate::{
    error::ServiceError,
    model::{Model, ModelMetadata, RecordBatch, loader::load_model},
};

/// Process-wide handle on the single loaded model.
pub struct ModelRegistry {
    model: Arc<dyn Model>,
}

impl ModelRegistry {
    pub fn initialize(model_path: &Path) -> Result<Self, ServiceError> {
        let model = load_model(model_path)?;
        Ok(Self::from_model(model))
    }

    pub fn from_model(model: Arc<dyn Model>) -> Self {
        Self { model }
    }

    pub fn metadata(&self) -> ModelMetadata {
        self.model.metadata()
    }

    /// Runs the model over the whole batch on the blocking pool.
    ///
    /// A panic inside the backend is reported as an inference error for this
    /// request only.
    pub async fn predict(&self, batch: RecordBatch) -> Result<Vec<f64>, ServiceError> {
        let model = self.model.clone();
        let expected = batch.len();

        let predictions = task::spawn_blocking(move || model.predict(&batch))
            .await
            .map_err(|err| ServiceError::Inference(format!("inference task failed: {err}")))??;

        if predictions.len() != expected {
            return Err(ServiceError::Inference(format!(
                "model returned {} predictions for {} records",
                predictions.len(),
                expected
            )));
        }

        if let Some(idx) = predictions.iter().position(|v| !v.is_finite()) {
            return Err(ServiceError::Inference(format!(
                "model returned non-finite prediction {} for record {}",
                predictions[idx],
                idx + 1
            )));
        }

        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::{Feature, Record};

    struct Fixed(Vec<f64>);

    impl Model for Fixed {
        fn predict(&self, _batch: &RecordBatch) -> Result<Vec<f64>, ServiceError> {
            Ok(self.0.clone())
        }

        fn metadata(&self) -> ModelMetadata {
            ModelMetadata {
                name: "fixed".into(),
                kind: "test".into(),
                features: vec![Feature::Gre],
                path: PathBuf::from("mem"),
            }
        }
    }

    struct Panicking;

    impl Model for Panicking {
        fn predict(&self, _batch: &RecordBatch) -> Result<Vec<f64>, ServiceError> {
            panic!("backend exploded");
        }

        fn metadata(&self) -> ModelMetadata {
            ModelMetadata {
                name: "panicking".into(),
                kind: "test".into(),
                features: Vec::new(),
                path: PathBuf::from("mem"),
            }
        }
    }

    fn batch(n: usize) -> RecordBatch {
        RecordBatch::new(vec![Record { gre: 310.0, gpa: 3.5 }; n]).unwrap()
    }

    #[tokio::test]
    async fn length_mismatch_is_an_inference_error() {
        let registry = ModelRegistry::from_model(Arc::new(Fixed(vec![1.0])));
        let err = registry.predict(batch(2)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Inference(_)));
        assert_eq!(registry.predict(batch(1)).await.unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn non_finite_outputs_are_inference_errors() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let registry = ModelRegistry::from_model(Arc::new(Fixed(vec![1.0, bad])));
            match registry.predict(batch(2)).await {
                Err(ServiceError::Inference(msg)) => assert!(msg.contains("record 2"), "{msg}"),
                other => panic!("expected inference error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let registry = ModelRegistry::from_model(Arc::new(Panicking));
        let err = registry.predict(batch(1)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Inference(_)));
        // The registry stays usable afterwards.
        assert!(registry.predict(batch(1)).await.is_err());
        assert_eq!(registry.metadata().name, "panicking");
    }
}
