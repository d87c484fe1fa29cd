//! API key middleware for the `/api` routes.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use super::error::ApiError;
use super::state::AppState;

pub const API_KEY_HEADER: &str = "api-key";

pub async fn require_api_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if state.verifier.uses_store() {
        let verifier_state = Arc::clone(&state);
        tokio::task::spawn_blocking(move || verifier_state.verifier.verify(presented.as_deref()))
            .await
            .map_err(|e| ApiError::AuthUnavailable(e.to_string()))??;
    } else {
        state.verifier.verify(presented.as_deref())?;
    }

    Ok(next.run(request).await)
}
