//! Error handler for converting AppError to HTTP responses.
//!
//! `AppError` renders as an [`ErrorResponse`] body. The global handler makes
//! every other error response (axum rejections, unmatched routes) follow the
//! same shape and stamps the request id on error bodies.

use axum::{
    Json,
    body::{Body, HttpBody},
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};

use super::RequestId;
use crate::api::dto::ErrorResponse;
use crate::error::AppError;

/// Error bodies known to be larger than this are passed through untouched.
const MAX_ERROR_BODY_BYTES: usize = 64 * 1024;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = error_to_status_code(&self);
        let code = error_to_code(&self);

        let body = match &self {
            AppError::NotFound {
                entity,
                field,
                value,
            } => ErrorResponse::not_found(entity, field, value),
            AppError::Duplicate {
                entity,
                field,
                value,
            } => ErrorResponse::duplicate(entity, field, value),
            AppError::Conflict { message } => ErrorResponse::new(code, message),
            AppError::Validation { field, reason } => {
                ErrorResponse::new(code, &format!("Validation failed for {}: {}", field, reason))
                    .with_details(json!({ "field": field, "reason": reason }))
            }
            AppError::ValidationErrors { errors } => ErrorResponse::validation(errors),
            AppError::BadRequest { message } => ErrorResponse::new(code, message),
            AppError::Unauthorized { message } => ErrorResponse::new(code, message),
            AppError::Database { operation, .. } => {
                tracing::error!(error = %self.detailed_message(), "Database error");
                ErrorResponse::new(code, &format!("Database operation failed: {}", operation))
                    .with_details(json!({ "operation": operation }))
            }
            AppError::Configuration { key, .. } => {
                tracing::error!(error = %self.detailed_message(), "Configuration error");
                ErrorResponse::new(code, &format!("Configuration error: {}", key))
            }
            AppError::ConnectionPool { .. } => {
                tracing::error!(error = %self.detailed_message(), "Connection pool error");
                ErrorResponse::new(code, "Database connection unavailable")
            }
            AppError::Internal { .. } => {
                tracing::error!(error = %self.detailed_message(), "Internal error");
                ErrorResponse::new(code, "An internal error occurred")
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Maps an AppError variant to its HTTP status code.
pub fn error_to_status_code(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound { .. } => StatusCode::NOT_FOUND,
        AppError::Duplicate { .. } | AppError::Conflict { .. } => StatusCode::CONFLICT,
        AppError::Validation { .. }
        | AppError::ValidationErrors { .. }
        | AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        AppError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        AppError::Database { .. } | AppError::Configuration { .. } | AppError::Internal { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        AppError::ConnectionPool { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Maps an AppError variant to its error code string.
pub fn error_to_code(error: &AppError) -> &'static str {
    match error {
        AppError::NotFound { .. } => "NOT_FOUND",
        AppError::Duplicate { .. } => "DUPLICATE_ENTRY",
        AppError::Conflict { .. } => "CONFLICT",
        AppError::Validation { .. } | AppError::ValidationErrors { .. } => "VALIDATION_ERROR",
        AppError::BadRequest { .. } => "BAD_REQUEST",
        AppError::Unauthorized { .. } => "UNAUTHORIZED",
        AppError::Database { .. } => "DATABASE_ERROR",
        AppError::Configuration { .. } => "CONFIGURATION_ERROR",
        AppError::ConnectionPool { .. } => "SERVICE_UNAVAILABLE",
        AppError::Internal { .. } => "INTERNAL_ERROR",
    }
}

/// Normalizes error responses produced outside the handlers.
///
/// - Non-JSON error bodies become an [`ErrorResponse`] carrying the original text.
/// - JSON error bodies in the `{code, message}` shape get the request id added.
/// - Bodies whose size hint exceeds `MAX_ERROR_BODY_BYTES` pass through unread.
/// - A body that fails to read is replaced by the status' default error.
/// - Anything else passes through.
pub async fn global_error_handler(request: Request, next: Next) -> Response {
    let request_id = request.extensions().get::<RequestId>().cloned();
    let response = next.run(request).await;

    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"));

    if response.body().size_hint().lower() > MAX_ERROR_BODY_BYTES as u64 {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, MAX_ERROR_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, status = %status, "Failed to read error body");
            Default::default()
        }
    };

    if is_json {
        let Ok(mut value) = serde_json::from_slice::<Value>(&bytes) else {
            return Response::from_parts(parts, Body::from(bytes));
        };
        match (&request_id, value.as_object_mut()) {
            (Some(id), Some(object)) if object.contains_key("code") => {
                object
                    .entry("request_id")
                    .or_insert_with(|| Value::String(id.0.clone()));
            }
            _ => return Response::from_parts(parts, Body::from(bytes)),
        }
        let mut response = (status, Json(value)).into_response();
        for (name, value) in parts.headers.iter() {
            if *name != header::CONTENT_TYPE && *name != header::CONTENT_LENGTH {
                response.headers_mut().append(name.clone(), value.clone());
            }
        }
        return response;
    }

    let original = String::from_utf8_lossy(&bytes).trim().to_string();
    let mut error = fallback_error(status, original);
    if let Some(id) = &request_id {
        error = error.with_request_id(&id.0);
    }

    let mut response = (status, Json(error)).into_response();
    for name in [header::ALLOW, header::WWW_AUTHENTICATE, header::RETRY_AFTER] {
        if let Some(value) = parts.headers.get(&name) {
            response.headers_mut().insert(name, value.clone());
        }
    }
    response
}

fn fallback_error(status: StatusCode, original: String) -> ErrorResponse {
    let (code, default_message) = match status {
        StatusCode::BAD_REQUEST => ("BAD_REQUEST", "Bad request - invalid or malformed request"),
        StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "Authentication required"),
        StatusCode::NOT_FOUND => ("NOT_FOUND", "The requested resource was not found"),
        StatusCode::METHOD_NOT_ALLOWED => {
            ("METHOD_NOT_ALLOWED", "HTTP method not allowed for this endpoint")
        }
        StatusCode::UNSUPPORTED_MEDIA_TYPE => ("UNSUPPORTED_MEDIA_TYPE", "Unsupported media type"),
        StatusCode::PAYLOAD_TOO_LARGE => ("PAYLOAD_TOO_LARGE", "Request payload too large"),
        StatusCode::UNPROCESSABLE_ENTITY => ("UNPROCESSABLE_CONTENT", "Request body could not be processed"),
        StatusCode::REQUEST_TIMEOUT => ("REQUEST_TIMEOUT", "Request timeout"),
        StatusCode::SERVICE_UNAVAILABLE => ("SERVICE_UNAVAILABLE", "Service temporarily unavailable"),
        s if s.is_server_error() => ("INTERNAL_SERVER_ERROR", "An internal server error occurred"),
        _ => ("UNKNOWN_ERROR", "An unknown error occurred"),
    };

    let message = if original.is_empty() {
        default_message.to_string()
    } else {
        original
    };
    ErrorResponse::new(code, &message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationFieldError;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_code_mapping() {
        let cases = [
            (AppError::job_not_found("x"), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (
                AppError::Conflict {
                    message: "busy".to_string(),
                },
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                AppError::ValidationErrors { errors: vec![] },
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                AppError::Unauthorized {
                    message: "no".to_string(),
                },
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
            ),
            (
                AppError::ConnectionPool {
                    source: anyhow::anyhow!("timed out"),
                },
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
            ),
            (
                AppError::Internal {
                    source: anyhow::anyhow!("boom"),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
            ),
        ];

        for (error, status, code) in cases {
            assert_eq!(error_to_status_code(&error), status);
            assert_eq!(error_to_code(&error), code);
        }
    }

    #[tokio::test]
    async fn test_conflict_body() {
        let response = AppError::Conflict {
            message: "Job 1 is completed; only pending jobs can be cancelled".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["code"], "CONFLICT");
        assert!(json["message"].as_str().unwrap().contains("only pending"));
    }

    #[tokio::test]
    async fn test_validation_errors_body_lists_fields() {
        let response = AppError::ValidationErrors {
            errors: vec![ValidationFieldError {
                field: "title".to_string(),
                message: "Title is required".to_string(),
            }],
        }
        .into_response();

        let json = body_json(response).await;
        assert_eq!(json["details"]["errors"][0]["message"], "Title is required");
    }

    #[tokio::test]
    async fn test_internal_error_hides_source() {
        let response = AppError::Internal {
            source: anyhow::anyhow!("password=hunter2"),
        }
        .into_response();

        let json = body_json(response).await;
        assert_eq!(json["message"], "An internal error occurred");
        assert!(!json.to_string().contains("hunter2"));
    }

    #[tokio::test]
    async fn test_oversized_error_body_passes_through() {
        use axum::{Router, routing::get};
        use tower::ServiceExt;

        let big = "x".repeat(MAX_ERROR_BODY_BYTES + 1);
        let expected = big.clone();
        let app = Router::new()
            .route(
                "/big",
                get(move || {
                    let big = big.clone();
                    async move { (StatusCode::INTERNAL_SERVER_ERROR, big) }
                }),
            )
            .layer(axum::middleware::from_fn(global_error_handler));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/big")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.len(), expected.len());
        assert_eq!(&bytes[..], expected.as_bytes());
    }

    #[test]
    fn test_fallback_error_uses_original_text() {
        let error = fallback_error(StatusCode::UNPROCESSABLE_ENTITY, "missing field".to_string());
        assert_eq!(error.code, "UNPROCESSABLE_CONTENT");
        assert_eq!(error.message, "missing field");

        let error = fallback_error(StatusCode::NOT_FOUND, String::new());
        assert_eq!(error.message, "The requested resource was not found");
    }
}
