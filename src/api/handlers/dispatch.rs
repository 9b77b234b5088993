//! HTTP trigger for the dispatch loop.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::DISPATCH_TAG;
use crate::api::dto::DispatchErrorResponse;
use crate::dispatch::BatchSummary;
use crate::state::AppState;

pub fn dispatch_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(run_dispatch))
}

/// POST /api/dispatch/run - Run one dispatch batch now
///
/// Per-job failures are recorded on the jobs and still return 200; only a
/// batch that could not start (job store unreachable) returns 500.
#[utoipa::path(
    post,
    path = "/dispatch/run",
    tag = DISPATCH_TAG,
    responses(
        (status = 200, description = "Batch finished", body = BatchSummary),
        (status = 401, description = "Missing or invalid trigger secret"),
        (status = 500, description = "Batch could not run", body = DispatchErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn run_dispatch(State(state): State<AppState>) -> Response {
    match state.dispatcher.run_batch().await {
        Ok(summary) => Json(summary).into_response(),
        Err(e) => {
            tracing::error!(error = %e.job_message(), "Dispatch batch failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(DispatchErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}
