//! Router configuration for the API.
//!
//! This module provides centralized route registration and middleware
//! configuration for the application.

use std::time::Duration;

use axum::{
    Router,
    http::{Method, StatusCode, header},
    middleware,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::doc::ApiDoc;
use crate::api::handlers;
use crate::api::middleware::{
    global_error_handler, logging_middleware, request_id_middleware, require_trigger_secret,
};
use crate::state::AppState;

/// Creates the main application router with all routes and middleware.
///
/// # Middleware Order
/// Middleware is applied in reverse order of declaration (last added runs first):
/// 1. Request ID middleware - generates/propagates request IDs
/// 2. Global error handler - normalizes error bodies, stamps the request ID
/// 3. Logging middleware - logs requests with request IDs
///
/// # Routes
/// - `/api/health` - health checks (public)
/// - `/api/geo` - route planner and geofence (public)
/// - `/api/dispatch/run` - dispatch trigger (trigger secret)
/// - `/api/notification-jobs` - job scheduling (trigger secret)
/// - `/swagger-ui` - OpenAPI documentation
pub fn create_router(state: AppState) -> Router {
    let protected = OpenApiRouter::new()
        .merge(handlers::dispatch::dispatch_routes())
        .merge(handlers::notification_jobs::notification_job_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_trigger_secret,
        ));

    let api_routes = OpenApiRouter::new()
        .merge(handlers::health::health_routes())
        .merge(handlers::geo::geo_routes())
        .merge(protected);

    let (router, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", api_routes)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    let request_timeout = Duration::from_secs(state.settings.server.request_timeout);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        // Middleware is applied in reverse order - last added runs first
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(global_error_handler))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::middleware::REQUEST_ID_HEADER;
    use crate::config::Settings;
    use crate::dispatch::{FixedClock, MemoryJobStore, UnreachableJobStore};
    use crate::models::JobStatus;
    use crate::services::notifications::ChannelSenders;
    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    const SECRET: &str = "s3cret";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 10, 18, 30, 0).unwrap()
    }

    fn test_app() -> (Router, Arc<MemoryJobStore>) {
        let mut settings = Settings::default();
        settings.dispatch.trigger_secret = SECRET.to_string();
        settings.channels.email_url = "http://email.internal/send".to_string();

        let store = Arc::new(MemoryJobStore::new());
        let state = AppState::new(
            settings,
            store.clone(),
            ChannelSenders::default(),
            Arc::new(FixedClock::new(now())),
        );
        (create_router(state), store)
    }

    fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", SECRET));
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_job(app: &Router, body: Value) -> Value {
        let response = app
            .clone()
            .oneshot(request(Method::POST, "/api/notification-jobs", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_health_is_public_and_reports_missing_channel() {
        let (app, _) = test_app();

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
        let json = json_body(response).await;
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["checks"]["job_store"]["status"], "healthy");
        assert_eq!(json["checks"]["channels"]["message"], "Not configured: push");
    }

    #[tokio::test]
    async fn test_protected_routes_require_secret() {
        let (app, _) = test_app();

        let response = app
            .clone()
            .oneshot(
                Request::post("/api/dispatch/run")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::get("/api/notification-jobs")
                    .header(header::AUTHORIZATION, "Bearer wrong")
                    .header(REQUEST_ID_HEADER, "req-42")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["code"], "UNAUTHORIZED");
        assert_eq!(json["request_id"], "req-42");
    }

    #[tokio::test]
    async fn test_dispatch_trigger_with_no_due_jobs() {
        let (app, _) = test_app();

        let response = app
            .oneshot(request(Method::POST, "/api/dispatch/run", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["processed"], 0);
    }

    #[tokio::test]
    async fn test_dispatch_trigger_reports_total_failure_as_bare_error() {
        let mut settings = Settings::default();
        settings.dispatch.trigger_secret = SECRET.to_string();
        let state = AppState::new(
            settings,
            Arc::new(UnreachableJobStore),
            ChannelSenders::default(),
            Arc::new(FixedClock::new(now())),
        );
        let app = create_router(state);

        let response = app
            .oneshot(request(Method::POST, "/api/dispatch/run", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        let body = json.as_object().unwrap();
        assert_eq!(body.len(), 1, "unexpected keys in {}", json);
        assert!(!body["error"].as_str().unwrap().is_empty());
        assert!(body.get("code").is_none());
        assert!(body.get("request_id").is_none());
    }

    #[tokio::test]
    async fn test_schedule_then_dispatch_without_push_sender() {
        let (app, store) = test_app();

        let created = create_job(
            &app,
            json!({
                "kind": "push",
                "title": "Weekend deals",
                "body": "20% off produce",
                "scheduled_at": "2026-07-10T18:25:00Z"
            }),
        )
        .await;
        assert_eq!(created["status"], "pending");
        assert_eq!(created["audience"], "all");

        let response = app
            .clone()
            .oneshot(request(Method::POST, "/api/dispatch/run", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary = json_body(response).await;
        assert_eq!(summary["processed"], 1);
        assert_eq!(summary["failed"], 1);

        let jobs = store.all().await;
        assert_eq!(jobs[0].status, JobStatus::Failed);
        assert_eq!(
            jobs[0].error_message.as_deref(),
            Some("no push channel sender is configured")
        );
    }

    #[tokio::test]
    async fn test_create_job_validation_error() {
        let (app, _) = test_app();

        let response = app
            .oneshot(request(
                Method::POST,
                "/api/notification-jobs",
                Some(json!({ "kind": "email", "title": "", "body": "b" })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["details"]["errors"][0]["field"], "title");
    }

    #[tokio::test]
    async fn test_get_list_and_cancel() {
        let (app, _) = test_app();

        let created = create_job(
            &app,
            json!({
                "kind": "email",
                "title": "Your weekly plan",
                "body": "Five dinners",
                "scheduled_at": "2026-07-11T09:00:00Z"
            }),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request(Method::GET, &format!("/api/notification-jobs/{}", id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["title"], "Your weekly plan");

        let response = app
            .clone()
            .oneshot(request(
                Method::GET,
                "/api/notification-jobs?status=pending&page=1&page_size=10",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let page = json_body(response).await;
        assert_eq!(page["pagination"]["total_items"], 1);
        assert_eq!(page["data"][0]["id"], id.as_str());

        let cancel_uri = format!("/api/notification-jobs/{}/cancel", id);
        let response = app
            .clone()
            .oneshot(request(Method::POST, &cancel_uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "cancelled");

        let response = app
            .oneshot(request(Method::POST, &cancel_uri, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(response).await["code"], "CONFLICT");
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let (app, _) = test_app();

        let response = app
            .oneshot(request(
                Method::GET,
                "/api/notification-jobs/6f1c2f1e-9a4b-4c55-8d7e-1f2a3b4c5d6e",
                None,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_route_plan_endpoint() {
        let (app, _) = test_app();

        let response = app
            .oneshot(request(
                Method::POST,
                "/api/geo/route",
                Some(json!({
                    "start": { "lat": 0.0, "lng": 0.0 },
                    "stores": [
                        { "id": "far", "name": "Far", "location": { "lat": 0.0, "lng": 0.02 } },
                        { "id": "near", "name": "Near", "location": { "lat": 0.0, "lng": 0.01 } }
                    ]
                })),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let plan = json_body(response).await;
        assert_eq!(plan["stops"][0]["store_id"], "near");
        assert_eq!(plan["stops"][1]["store_id"], "far");
    }

    #[tokio::test]
    async fn test_geofence_fires_once_per_store() {
        let (app, _) = test_app();
        let stores = json!([
            { "id": "s-1", "name": "Corner Market", "location": { "lat": 52.5200, "lng": 13.4050 } }
        ]);

        let response = app
            .clone()
            .oneshot(request(
                Method::POST,
                "/api/geo/geofence",
                Some(json!({ "location": { "lat": 52.5201, "lng": 13.4051 }, "stores": stores })),
            ))
            .await
            .unwrap();
        let first = json_body(response).await;
        assert_eq!(first["hits"][0]["store_id"], "s-1");
        assert_eq!(first["notified_store_ids"], json!(["s-1"]));

        let response = app
            .oneshot(request(
                Method::POST,
                "/api/geo/geofence",
                Some(json!({
                    "location": { "lat": 52.5201, "lng": 13.4051 },
                    "stores": stores,
                    "notified_store_ids": first["notified_store_ids"]
                })),
            ))
            .await
            .unwrap();
        let second = json_body(response).await;
        assert_eq!(second["hits"], json!([]));
    }

    #[tokio::test]
    async fn test_unmatched_route_gets_json_error() {
        let (app, _) = test_app();

        let response = app
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
    }
}
