//! Shared-secret bearer authentication for the trigger and scheduling API.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use constant_time_eq::constant_time_eq;

use crate::error::AppError;
use crate::state::AppState;

/// Rejects requests that do not carry `Authorization: Bearer <dispatch.trigger_secret>`.
///
/// An empty configured secret disables the check.
///
/// # Errors
/// Returns 401 Unauthorized if the header is missing, malformed or carries
/// the wrong secret.
///
/// # Example
/// ```ignore
/// OpenApiRouter::new()
///     .merge(dispatch_routes())
///     .layer(middleware::from_fn_with_state(state.clone(), require_trigger_secret))
/// ```
pub async fn require_trigger_secret(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let expected = state.settings.dispatch.trigger_secret.as_str();
    if expected.is_empty() {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized {
            message: "Missing authorization header".to_string(),
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized {
            message: "Invalid authorization header format. Expected: Bearer <token>".to_string(),
        })?;

    if !constant_time_eq(token.trim().as_bytes(), expected.as_bytes()) {
        tracing::warn!(path = %request.uri().path(), "Rejected request with invalid trigger secret");
        return Err(AppError::Unauthorized {
            message: "Invalid credentials".to_string(),
        });
    }

    Ok(next.run(request).await)
}
