use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use super::handlers::ApiFailure;
use super::server::ApiState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Rejects requests without a matching `x-api-key` header. A blank
/// configured key disables the check.
pub async fn require_api_key(
    State(state): State<ApiState>,
    request: Request,
    next: Next,
) -> Response {
    let expected = state.config.api.api_key.as_str();
    if expected.is_empty() {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided == Some(expected) {
        next.run(request).await
    } else {
        debug!("Rejected {} {}: bad API key", request.method(), request.uri());
        ApiFailure::unauthorized().into_response()
    }
}
