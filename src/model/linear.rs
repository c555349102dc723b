use std::path::{Path, PathBuf};

use crate::{
    error::ServiceError,
    model::{Feature, Model, ModelMetadata, RecordBatch},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Link {
    /// Plain regression: the linear score is the prediction.
    Identity,
    /// Binary classification through a sigmoid.
    Logistic { threshold: f64, probability: bool },
}

#[derive(Debug, Clone)]
pub struct LinearModel {
    name: String,
    path: PathBuf,
    features: Vec<Feature>,
    coefficients: Vec<f64>,
    intercept: f64,
    link: Link,
}

impl LinearModel {
    pub fn new(
        name: &str,
        path: &Path,
        features: Vec<Feature>,
        coefficients: Vec<f64>,
        intercept: f64,
        link: Link,
    ) -> Result<Self, ServiceError> {
        if features.is_empty() {
            return Err(ServiceError::Artifact(
                "linear model needs at least one feature".into(),
            ));
        }
        if features.len() != coefficients.len() {
            return Err(ServiceError::Artifact(format!(
                "{} features but {} coefficients",
                features.len(),
                coefficients.len()
            )));
        }
        if let Some(dup) = features
            .iter()
            .enumerate()
            .find_map(|(i, f)| features[..i].contains(f).then_some(f))
        {
            return Err(ServiceError::Artifact(format!("feature '{dup}' listed twice")));
        }
        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ServiceError::Artifact(
                "coefficients and intercept must be finite".into(),
            ));
        }
        if let Link::Logistic { threshold, .. } = link {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ServiceError::Artifact(format!(
                    "threshold must lie in [0, 1], got {threshold}"
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            features,
            coefficients,
            intercept,
            link,
        })
    }

    fn score(&self, row: &[f64]) -> f64 {
        self.intercept
            + row
                .iter()
                .zip(&self.coefficients)
                .map(|(x, w)| x * w)
                .sum::<f64>()
    }
}

impl Model for LinearModel {
    fn predict(&self, batch: &RecordBatch) -> Result<Vec<f64>, ServiceError> {
        let width = self.features.len();
        let matrix = batch.to_row_major(&self.features);

        let predictions = matrix
            .chunks_exact(width)
            .map(|row| {
                let z = self.score(row);
                match self.link {
                    Link::Identity => z,
                    Link::Logistic {
                        threshold,
                        probability,
                    } => {
                        let p = sigmoid(z);
                        if probability {
                            p
                        } else if p >= threshold {
                            1.0
                        } else {
                            0.0
                        }
                    }
                }
            })
            .collect();

        Ok(predictions)
    }

    fn metadata(&self) -> ModelMetadata {
        let kind = match self.link {
            Link::Identity => "linear_regression",
            Link::Logistic { .. } => "logistic_regression",
        };
        ModelMetadata {
            name: self.name.clone(),
            kind: kind.to_string(),
            features: self.features.clone(),
            path: self.path.clone(),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
