use axum::response::Json;
use serde::Serialize;

/// Wire string the React frontend checks on startup.
const STATUS_MESSAGE: &str = "Django backend is running!";

#[derive(Serialize)]
pub struct Status {
    status: &'static str,
}

pub async fn healthcheck() -> Json<Status> {
    Json(Status {
        status: STATUS_MESSAGE,
    })
}
