use crate::{
    config::Config, inference_service::InferenceService, registry::ModelRegistry,
    server::HttpServer, telemetry::Metrics,
};
use std::{error::Error, sync::Arc};

pub async fn start_app(config: Config) -> Result<(), Box<dyn Error>> {
    tracing::info!("Initializing age prediction models");
    let registry = Arc::new(ModelRegistry::initialize(&config.models));
    tracing::info!(
        ensemble_available = registry.is_ensemble_available(),
        transfer_available = registry.is_transfer_available(),
        "Model registry ready"
    );

    let metrics = match Metrics::new() {
        Ok(metrics) => Arc::new(metrics),
        Err(e) => {
            tracing::error!("Failed to initialize metrics: {:?}", e);
            return Err(Box::new(e));
        }
    };

    let inference_service = InferenceService::new(registry);
    let server = HttpServer::new(inference_service, metrics, &config.server).await?;

    server.run().await?;

    Ok(())
}
