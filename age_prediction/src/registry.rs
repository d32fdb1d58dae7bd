use crate::{config::ModelsConfig, model_service::AgeModel, ort_service::OrtAgeModel};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Model file not found: {0:?}")]
    NotFound(PathBuf),
    #[error("Failed to load model from {path:?}: {message}")]
    Session { path: PathBuf, message: String },
    #[error("Model {0:?} declares no outputs")]
    NoOutput(PathBuf),
}

/// Models loaded once at startup and shared read-only by every request.
///
/// Either every configured model is present, or the registry is degraded and
/// holds none of them.
pub struct ModelRegistry {
    ensemble: Vec<Box<dyn AgeModel>>,
    transfer: Option<Box<dyn AgeModel>>,
}

impl ModelRegistry {
    pub fn from_models(
        ensemble: Vec<Box<dyn AgeModel>>,
        transfer: Option<Box<dyn AgeModel>>,
    ) -> Self {
        Self { ensemble, transfer }
    }

    pub fn degraded() -> Self {
        Self::from_models(Vec::new(), None)
    }

    pub fn load(models_cfg: &ModelsConfig) -> Result<Self, RegistryError> {
        let ensemble = models_cfg
            .ensemble_paths()
            .iter()
            .map(|path| {
                OrtAgeModel::load(path, models_cfg.intra_threads)
                    .map(|model| Box::new(model) as Box<dyn AgeModel>)
            })
            .collect::<Result<Vec<_>, RegistryError>>()?;
        tracing::info!("Ensemble models loaded successfully ({})", ensemble.len());

        let transfer = OrtAgeModel::load(&models_cfg.transfer_path(), models_cfg.intra_threads)?;
        tracing::info!("Transfer learning model loaded successfully");

        Ok(Self::from_models(ensemble, Some(Box::new(transfer))))
    }

    /// Loads every configured model, falling back to the degraded registry on
    /// the first failure. Never aborts startup.
    pub fn initialize(models_cfg: &ModelsConfig) -> Self {
        match Self::load(models_cfg) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!(
                    model_dir = %models_cfg.model_dir.display(),
                    "Could not load models, serving without them: {}",
                    e
                );
                Self::degraded()
            }
        }
    }

    pub fn is_ensemble_available(&self) -> bool {
        !self.ensemble.is_empty()
    }

    pub fn is_transfer_available(&self) -> bool {
        self.transfer.is_some()
    }

    pub fn ensemble(&self) -> &[Box<dyn AgeModel>] {
        &self.ensemble
    }

    pub fn transfer(&self) -> Option<&dyn AgeModel> {
        self.transfer.as_deref()
    }
}
