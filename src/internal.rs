//! Status routes for liveness and readiness checks.

use axum::{http::StatusCode, routing::get, Router};

pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/internal/live", get(live))
        .route("/internal/ready", get(ready))
}

/// Service still alive.
async fn live() -> StatusCode {
    StatusCode::NO_CONTENT
}

/// Service ready after startup.
async fn ready() -> StatusCode {
    StatusCode::NO_CONTENT
}
