use crate::{
    inference_service::{ModelChoice, PredictionError},
    server::SharedState,
};
use axum::{
    body::Bytes,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use tracing::instrument;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request method")]
    MethodNotAllowed,
    #[error("Missing 'image' or 'model_choice'")]
    MissingFields,
    #[error("Invalid model choice: {0}")]
    InvalidChoice(String),
    #[error("An internal error occurred during prediction.")]
    Internal,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_age: f64,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::MissingFields | ApiError::InvalidChoice(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

struct PredictForm {
    image: Bytes,
    model_choice: String,
}

/// Collects the `image` file part and the `model_choice` text part. A repeated
/// field keeps its last value. A part with an empty filename is not a file.
async fn read_form(mut multipart: Multipart) -> Result<Option<PredictForm>, MultipartError> {
    let mut image = None;
    let mut model_choice = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_owned);
        let is_file = field.file_name().is_some_and(|f| !f.is_empty());
        match (name.as_deref(), is_file) {
            (Some("image"), true) => image = Some(field.bytes().await?),
            (Some("model_choice"), false) => model_choice = Some(field.text().await?),
            _ => {}
        }
    }

    Ok(image
        .zip(model_choice)
        .map(|(image, model_choice)| PredictForm {
            image,
            model_choice,
        }))
}

#[instrument(skip_all)]
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let form = match multipart {
        // A body that breaks off mid-stream or exceeds the upload limit is not
        // a missing field.
        Ok(multipart) => read_form(multipart).await.map_err(|e| {
            tracing::error!(status = %e.status(), "Failed to read multipart body: {}", e);
            state.metrics.record_prediction("none", "error");
            ApiError::Internal
        })?,
        Err(rejection) => {
            tracing::warn!("Request is not a multipart form: {}", rejection);
            None
        }
    };
    let Some(form) = form else {
        state.metrics.record_prediction("none", "missing_fields");
        return Err(ApiError::MissingFields);
    };

    let label = ModelChoice::try_from(form.model_choice.as_str())
        .map(|choice| choice.as_str())
        .unwrap_or("invalid");

    let start = Instant::now();
    let result = state
        .inference_service
        .predict(form.image, form.model_choice)
        .await;
    state
        .metrics
        .record_prediction_duration(start.elapsed().as_secs_f64() * 1000.0, label);

    match result {
        Ok(predicted_age) => {
            state.metrics.record_prediction(label, "success");
            tracing::info!(model_choice = label, predicted_age, "Prediction served");
            Ok(Json(Prediction { predicted_age }))
        }
        Err(PredictionError::InvalidChoice(choice)) => {
            state.metrics.record_prediction(label, "invalid_choice");
            Err(ApiError::InvalidChoice(choice))
        }
        Err(e) => {
            state.metrics.record_prediction(label, "error");
            tracing::error!("Prediction Error: {}", e);
            Err(ApiError::Internal)
        }
    }
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
