mod inference_service;
mod model_service;
mod ort_service;
mod preprocessing;
mod registry;
mod routes;
mod server;
mod telemetry;

pub mod app;
pub mod config;

pub use app::start_app;
pub use inference_service::{InferenceService, ModelChoice, PredictionError};
pub use model_service::{AgeModel, InferenceError};
pub use preprocessing::{preprocess_for_ensemble, preprocess_for_transfer, PreprocessError};
pub use registry::{ModelRegistry, RegistryError};
