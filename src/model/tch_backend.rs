use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tch::{Device, IValue, Kind, Tensor, no_grad};

use crate::{
    error::ServiceError,
    model::{Feature, Model, ModelMetadata, RecordBatch},
};

/// TorchScript module fed a `[N, F]` float32 tensor.
pub struct TorchScriptModel {
    name: String,
    path: PathBuf,
    features: Vec<Feature>,
    // CModule is Send but not Sync.
    module: Mutex<tch::CModule>,
}

impl TorchScriptModel {
    pub fn load(
        name: &str,
        module_path: &Path,
        features: Vec<Feature>,
    ) -> Result<Self, ServiceError> {
        if !module_path.exists() {
            return Err(ServiceError::Artifact(format!(
                "torchscript module missing: {}",
                module_path.display()
            )));
        }
        if features.is_empty() {
            return Err(ServiceError::Artifact(
                "torchscript model needs at least one feature".into(),
            ));
        }
        let mut module = tch::CModule::load_on_device(module_path, Device::Cpu)
            .map_err(|e| ServiceError::Artifact(e.to_string()))?;
        module.set_eval();

        Ok(Self {
            name: name.to_string(),
            path: module_path.to_path_buf(),
            features,
            module: Mutex::new(module),
        })
    }
}

impl Model for TorchScriptModel {
    fn predict(&self, batch: &RecordBatch) -> Result<Vec<f64>, ServiceError> {
        let rows = batch.len() as i64;
        let width = self.features.len() as i64;
        let input: Vec<f32> = batch
            .to_row_major(&self.features)
            .into_iter()
            .map(|v| v as f32)
            .collect();

        let output = no_grad(|| {
            let input = Tensor::from_slice(&input).reshape([rows, width]);
            let module = self.module.lock();
            module
                .forward_is(&[IValue::Tensor(input)])
                .map_err(|e| ServiceError::Inference(e.to_string()))
        })?;

        // Accept either a bare tensor or a tuple whose head is the prediction.
        let tensor = match output {
            IValue::Tensor(t) => t,
            IValue::Tuple(ref items) if !items.is_empty() => match &items[0] {
                IValue::Tensor(t) => t.shallow_clone(),
                _ => {
                    return Err(ServiceError::Inference(
                        "expected tensor as first tuple element".into(),
                    ));
                }
            },
            _ => {
                return Err(ServiceError::Inference(
                    "unexpected model output format".into(),
                ));
            }
        };

        let flat = tensor.to_kind(Kind::Double).flatten(0, -1);
        Vec::<f64>::try_from(&flat).map_err(|e| ServiceError::Inference(e.to_string()))
    }

    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            name: self.name.clone(),
            kind: "torchscript".to_string(),
            features: self.features.clone(),
            path: self.path.clone(),
        }
    }
}
