//! Notification job scheduling handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use uuid::Uuid;

use crate::api::doc::NOTIFICATION_JOB_TAG;
use crate::api::dto::{
    CreateNotificationJobRequest, ErrorResponse, ListNotificationJobsQuery,
    NotificationJobResponse, PagedResponse,
};
use crate::error::AppResult;
use crate::state::AppState;
use crate::utils::validate::{ValidatedJson, ValidatedQuery};

pub fn notification_job_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_jobs, create_job))
        .routes(routes!(get_job))
        .routes(routes!(cancel_job))
}

/// GET /api/notification-jobs - List jobs, newest scheduled first
#[utoipa::path(
    get,
    path = "/notification-jobs",
    tag = NOTIFICATION_JOB_TAG,
    params(ListNotificationJobsQuery),
    responses(
        (status = 200, description = "List jobs by page", body = PagedResponse<NotificationJobResponse>),
        (status = 400, description = "Invalid query", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn list_jobs(
    State(state): State<AppState>,
    ValidatedQuery(query): ValidatedQuery<ListNotificationJobsQuery>,
) -> AppResult<Json<PagedResponse<NotificationJobResponse>>> {
    let params = query.pagination();
    let (jobs, total) = state
        .services
        .notification_jobs
        .list(query.status, params.offset(), params.limit())
        .await?;

    let data = jobs.into_iter().map(NotificationJobResponse::from).collect();
    Ok(Json(PagedResponse::new(data, &params, total.max(0) as u64)))
}

/// POST /api/notification-jobs - Schedule a notification job
#[utoipa::path(
    post,
    path = "/notification-jobs",
    tag = NOTIFICATION_JOB_TAG,
    request_body = CreateNotificationJobRequest,
    responses(
        (status = 201, description = "Job scheduled", body = NotificationJobResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn create_job(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateNotificationJobRequest>,
) -> AppResult<(StatusCode, Json<NotificationJobResponse>)> {
    let job = state
        .services
        .notification_jobs
        .schedule(req.into_draft())
        .await?;
    Ok((StatusCode::CREATED, Json(NotificationJobResponse::from(job))))
}

/// GET /api/notification-jobs/{id} - Get a job with its counters
#[utoipa::path(
    get,
    path = "/notification-jobs/{id}",
    tag = NOTIFICATION_JOB_TAG,
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job found", body = NotificationJobResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NotificationJobResponse>> {
    let job = state.services.notification_jobs.get(id).await?;
    Ok(Json(NotificationJobResponse::from(job)))
}

/// POST /api/notification-jobs/{id}/cancel - Cancel a pending job
#[utoipa::path(
    post,
    path = "/notification-jobs/{id}/cancel",
    tag = NOTIFICATION_JOB_TAG,
    params(
        ("id" = Uuid, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job cancelled", body = NotificationJobResponse),
        (status = 404, description = "Job not found", body = ErrorResponse),
        (status = 409, description = "Job is no longer pending", body = ErrorResponse)
    ),
    security(
        ("bearerAuth" = [])
    )
)]
async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NotificationJobResponse>> {
    let job = state.services.notification_jobs.cancel(id).await?;
    Ok(Json(NotificationJobResponse::from(job)))
}
