//! The prediction request path: validate the body, shape it into a frame,
//! run the model, pair results back to the caller's identifiers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::json;
use thiserror::Error;

use crate::api_models::{
    PredictionRequest, PredictionResponse, PredictionResult, PricePrediction,
};
use crate::frame::{ShapeError, TabularFrame};
use crate::internal;
use crate::model::{Model, MODEL_NAME};

/// Shared across all in-flight requests. The model is read-only once
/// loaded, so no locking is needed around predict.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<Model>,
}

/// Failures surfaced by the predict endpoint. The first four stem from
/// client-supplied data and map to 400 with a distinct detail message;
/// anything from the model side is an opaque 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request body must be UTF-8 encoded. Details: {0}")]
    Encoding(std::str::Utf8Error),
    #[error("Request body must be valid UTF-8 encoded JSON. Details: {0}")]
    Syntax(serde_json::Error),
    #[error("Request body validation failed")]
    Schema(#[source] serde_json::Error),
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error("prediction failed")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Internal(err) => {
                tracing::error!("prediction failed: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
            client_err => {
                tracing::error!("rejected request: {client_err}");
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "detail": client_err.to_string() })),
                )
                    .into_response()
            }
        }
    }
}

/// Classifies the raw body into the typed request, in validation order:
/// UTF-8, then JSON syntax, then schema.
fn parse_request(body: &[u8]) -> Result<PredictionRequest, ApiError> {
    let text = std::str::from_utf8(body).map_err(ApiError::Encoding)?;
    serde_json::from_str(text).map_err(|err| match err.classify() {
        serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
            ApiError::Syntax(err)
        }
        _ => ApiError::Schema(err),
    })
}

/// `POST /predict`. Predictions are paired to `prediction_id` positionally;
/// the frame preserves request row order, so index i of the model output
/// belongs to identifier i.
pub async fn predict(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PredictionResponse>, ApiError> {
    let request = parse_request(&body)?;

    let pred_ids = request.prediction_id.clone();
    let frame = TabularFrame::from_request(&request)?;
    let values = state.model.predict(&frame)?;

    let predictions = pred_ids
        .into_iter()
        .zip(values)
        .map(|(ride_id, ride_duration)| PredictionResult {
            model: MODEL_NAME,
            version: state.model.uri().to_string(),
            prediction: PricePrediction {
                ride_duration,
                ride_id,
            },
        })
        .collect();

    Ok(Json(PredictionResponse { predictions }))
}

/// Full service router: the predict endpoint plus the status routes.
pub fn router(model: Arc<Model>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .merge(internal::router())
        .with_state(AppState { model })
}
