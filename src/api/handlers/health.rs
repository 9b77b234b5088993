//! Health check endpoints.

use std::collections::HashMap;
use std::time::Instant;

use axum::{Json, extract::State, http::StatusCode};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::HEALTH_TAG;
use crate::api::dto::{ComponentHealth, HealthResponse, HealthStatus};
use crate::state::AppState;

pub fn health_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health_check))
        .routes(routes!(liveness_check))
}

/// Store reachability plus channel and trigger configuration.
///
/// # Responses
/// - `200 OK` - healthy, or degraded when a channel is not configured
/// - `503 Service Unavailable` - the job store cannot be reached
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy or degraded", body = HealthResponse),
        (status = 503, description = "Job store unreachable", body = HealthResponse)
    ),
    tag = HEALTH_TAG
)]
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut checks = HashMap::new();

    let store = check_store(&state).await;
    let channels = check_channels(&state);
    let overall = store.status.worst(channels.status);

    checks.insert("job_store".to_string(), store);
    checks.insert("channels".to_string(), channels);
    checks.insert("dispatch_trigger".to_string(), check_trigger(&state));

    let status = match overall {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };

    let response = HealthResponse {
        status: overall,
        version: state.settings.application.version.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        checks,
    };

    (status, Json(response))
}

/// Liveness probe; does not touch any dependency.
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Service is alive")
    ),
    tag = HEALTH_TAG
)]
pub async fn liveness_check() -> StatusCode {
    StatusCode::OK
}

async fn check_store(state: &AppState) -> ComponentHealth {
    let start_time = Instant::now();

    match state.store.ping().await {
        Ok(()) => ComponentHealth {
            status: HealthStatus::Healthy,
            message: Some("Reachable".to_string()),
            response_time_ms: Some(start_time.elapsed().as_millis() as u64),
        },
        Err(e) => {
            tracing::warn!(error = %e.detailed_message(), "Job store health check failed");
            ComponentHealth {
                status: HealthStatus::Unhealthy,
                message: Some(e.to_string()),
                response_time_ms: Some(start_time.elapsed().as_millis() as u64),
            }
        }
    }
}

fn check_channels(state: &AppState) -> ComponentHealth {
    let channels = &state.settings.channels;
    let missing: Vec<&str> = [("push", &channels.push_url), ("email", &channels.email_url)]
        .into_iter()
        .filter(|(_, url)| url.is_empty())
        .map(|(name, _)| name)
        .collect();

    if missing.is_empty() {
        ComponentHealth {
            status: HealthStatus::Healthy,
            message: Some("push and email configured".to_string()),
            response_time_ms: None,
        }
    } else {
        ComponentHealth {
            status: HealthStatus::Degraded,
            message: Some(format!("Not configured: {}", missing.join(", "))),
            response_time_ms: None,
        }
    }
}

fn check_trigger(state: &AppState) -> ComponentHealth {
    let dispatch = &state.settings.dispatch;
    let message = if dispatch.enabled {
        format!("Scheduled: {}", dispatch.schedule)
    } else {
        "External trigger only".to_string()
    };

    ComponentHealth {
        status: HealthStatus::Healthy,
        message: Some(message),
        response_time_ms: None,
    }
}
