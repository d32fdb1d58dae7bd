mod health;
mod metrics;
mod predict;

use crate::{config::ServerConfig, server::SharedState, telemetry::Metrics};
use axum::{
    extract::{DefaultBodyLimit, MatchedPath, Request, State},
    http::{HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

/// Counts every request that reached a registered route, labelled with the
/// route template.
async fn track_requests(
    State(metrics): State<Arc<Metrics>>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(route) = req.extensions().get::<MatchedPath>() {
        metrics.record_request(route.as_str());
    }
    next.run(req).await
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin {:?}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any)
}

pub fn api_routes(state: SharedState, server_cfg: &ServerConfig) -> Router {
    Router::new()
        .route("/", get(health::healthcheck))
        .route(
            "/predict/",
            post(predict::predict).fallback(predict::method_not_allowed),
        )
        .route("/metrics", get(metrics::metrics_handler))
        .route_layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            track_requests,
        ))
        .with_state(state)
        .layer(DefaultBodyLimit::max(server_cfg.max_upload_bytes()))
        .layer(cors_layer(&server_cfg.cors_origins))
}
