use crate::{
    config::ServerConfig, inference_service::InferenceService, routes::api_routes,
    telemetry::Metrics,
};
use axum::Router;
use std::sync::Arc;
use tokio::{net::TcpListener, signal};

#[derive(Clone)]
pub struct SharedState {
    pub inference_service: InferenceService,
    pub metrics: Arc<Metrics>,
}

pub struct HttpServer {
    router: Router,
    listener: TcpListener,
}

impl HttpServer {
    pub async fn new(
        inference_service: InferenceService,
        metrics: Arc<Metrics>,
        server_cfg: &ServerConfig,
    ) -> anyhow::Result<Self> {
        let addr = server_cfg.get_address();

        let app_state = SharedState {
            inference_service,
            metrics,
        };
        let router = api_routes(app_state, server_cfg);

        let listener = TcpListener::bind(addr).await?;

        Ok(Self { router, listener })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tracing::info!("Starting app on {}", self.listener.local_addr()?);

        let shutdown = async {
            shutdown_signal().await;
            tracing::info!("Shutdown signal received, starting graceful shutdown")
        };

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
