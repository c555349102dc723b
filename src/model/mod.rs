mod backend;
mod linear;
mod loader;
mod registry;
mod types;

#[cfg(feature = "tch-backend")]
pub mod tch_backend;

pub use backend::Model;
pub use linear::{LinearModel, Link};
pub use loader::{MANIFEST_FILE, load_model};
pub use registry::ModelRegistry;
pub use types::{Feature, ModelMetadata, PredictionResponse, Record, RecordBatch};
