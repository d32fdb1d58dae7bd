use crate::{
    model_service::InferenceError,
    preprocessing::{preprocess_for_ensemble, preprocess_for_transfer, PreprocessError},
    registry::ModelRegistry,
};
use axum::body::Bytes;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelChoice {
    Ensemble,
    Transfer,
    Hybrid,
}

impl ModelChoice {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelChoice::Ensemble => "ensemble",
            ModelChoice::Transfer => "transfer",
            ModelChoice::Hybrid => "hybrid",
        }
    }

    pub fn runs_transfer(&self) -> bool {
        matches!(self, ModelChoice::Transfer | ModelChoice::Hybrid)
    }

    pub fn runs_ensemble(&self) -> bool {
        matches!(self, ModelChoice::Ensemble | ModelChoice::Hybrid)
    }
}

impl TryFrom<&str> for ModelChoice {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "ensemble" => Ok(Self::Ensemble),
            "transfer" => Ok(Self::Transfer),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("Invalid model choice: {0}")]
    InvalidChoice(String),
    #[error("Transfer learning model is not loaded")]
    TransferUnavailable,
    #[error("Ensemble models are not loaded")]
    EnsembleUnavailable,
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("Model inference failed: {0}")]
    Inference(#[from] InferenceError),
    #[error("Prediction worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct InferenceService {
    registry: Arc<ModelRegistry>,
}

impl InferenceService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Runs every model family selected by `model_choice` and averages their
    /// outputs. An unknown choice selects nothing and surfaces as
    /// [`PredictionError::InvalidChoice`] once no prediction was collected.
    pub fn predict_blocking(
        &self,
        image_data: &[u8],
        model_choice: &str,
    ) -> Result<f64, PredictionError> {
        let choice = ModelChoice::try_from(model_choice).ok();
        let mut predictions: Vec<f32> = Vec::new();

        if choice.is_some_and(|c| c.runs_transfer()) {
            let model = self
                .registry
                .transfer()
                .ok_or(PredictionError::TransferUnavailable)?;
            let input = preprocess_for_transfer(image_data)?;
            let prediction = model.predict(input.view())?;
            tracing::debug!(model = model.name(), prediction, "Transfer prediction");
            predictions.push(prediction);
        }

        if choice.is_some_and(|c| c.runs_ensemble()) {
            if !self.registry.is_ensemble_available() {
                return Err(PredictionError::EnsembleUnavailable);
            }
            let input = preprocess_for_ensemble(image_data)?;
            for model in self.registry.ensemble() {
                let prediction = model.predict(input.view())?;
                tracing::debug!(model = model.name(), prediction, "Ensemble prediction");
                predictions.push(prediction);
            }
        }

        if predictions.is_empty() {
            return Err(PredictionError::InvalidChoice(model_choice.to_string()));
        }

        let sum: f64 = predictions.iter().map(|p| *p as f64).sum();
        Ok(sum / predictions.len() as f64)
    }

    /// Moves the CPU-bound work onto the blocking pool.
    #[instrument(skip(self, image_data), fields(image_len = image_data.len()))]
    pub async fn predict(
        &self,
        image_data: Bytes,
        model_choice: String,
    ) -> Result<f64, PredictionError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.predict_blocking(&image_data, &model_choice))
            .await?
    }
}
