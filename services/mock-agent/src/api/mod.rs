//! HTTP API handlers and routing.

pub mod error;
mod servers;

use axum::{
    extract::Request,
    http::{header::CONTENT_TYPE, HeaderValue},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::context::AppState;

use self::error::ApiError;

/// Create the main API router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(servers::routes())
        .fallback(servers::not_found)
        // Middleware (outermost last)
        .layer(middleware::from_fn(require_json))
        .layer(middleware::from_fn(log_request))
        .layer(TraceLayer::new_for_http())
        // Application state
        .with_state(state)
}

async fn log_request(request: Request, next: Next) -> Response {
    info!(
        method = %request.method(),
        path = %request.uri().path(),
        "Handling request"
    );
    next.run(request).await
}

/// Reject any request whose declared body type is not JSON.
async fn require_json(request: Request, next: Next) -> Result<Response, ApiError> {
    if let Some(content_type) = request.headers().get(CONTENT_TYPE) {
        if !is_json(content_type) {
            return Err(ApiError::bad_request(
                "malformed_request",
                "content-type must be application/json",
            ));
        }
    }
    Ok(next.run(request).await)
}

/// Media type check; parameters such as `charset` are ignored.
fn is_json(content_type: &HeaderValue) -> bool {
    content_type
        .to_str()
        .ok()
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case("application/json"))
}
