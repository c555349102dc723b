pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod server;

pub use config::AppConfig;
pub use error::ServiceError;
pub use model::{Model, ModelRegistry, PredictionResponse, Record, RecordBatch};
pub use server::build_router;
