use crate::{
    error::ServiceError,
    model::{ModelMetadata, RecordBatch},
};

/// A loaded, read-only predictive model.
///
/// `predict` is called once per request with the whole batch and must return
/// one value per record, in record order. Implementations are shared across
/// concurrent requests and must not rely on `&mut self`.
pub trait Model: Send + Sync {
    fn predict(&self, batch: &RecordBatch) -> Result<Vec<f64>, ServiceError>;

    fn metadata(&self) -> ModelMetadata;
}
