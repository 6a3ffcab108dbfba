//! Middleware for the REST API server.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use carebell_core::verify_access_code;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Header carrying the caregiver access code.
pub const CAREGIVER_CODE_HEADER: &str = "x-caregiver-code";

/// Create CORS middleware.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Request logging middleware.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}

/// Caregiver access middleware.
///
/// Rejects requests whose `X-Caregiver-Code` does not match the profile's
/// code, or the configured default when there is no profile.
pub async fn caregiver_auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let expected = state.caregiver_code()?;
    let supplied = request
        .headers()
        .get(CAREGIVER_CODE_HEADER)
        .and_then(|v| v.to_str().ok());

    if let Err(e) = verify_access_code(&expected, supplied) {
        warn!(uri = %request.uri(), "Caregiver access rejected");
        return Err(ApiError::from(e));
    }

    Ok(next.run(request).await)
}
