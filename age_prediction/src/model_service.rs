use ndarray::ArrayView4;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("session mutex poisoned: {0}")]
    Poisoned(String),
    #[error("failed to build tensor: {0}")]
    Tensor(String),
    #[error("inference failed: {0}")]
    Run(String),
    #[error("failed to extract tensor: {0}")]
    Extract(String),
    #[error("model {0} returned an empty output")]
    EmptyOutput(String),
}

/// A loaded model that maps one preprocessed image batch to a scalar age.
pub trait AgeModel: Send + Sync + 'static {
    fn name(&self) -> &str;
    fn predict(&self, input: ArrayView4<'_, f32>) -> Result<f32, InferenceError>;
}
