//! Route planner and geofence endpoints.

use axum::{Json, extract::State};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::api::doc::GEO_TAG;
use crate::api::dto::{ErrorResponse, GeofenceRequest, GeofenceResponse, RouteRequest};
use crate::error::AppResult;
use crate::geo::{ProximityNotifier, RoutePlan, plan_route};
use crate::state::AppState;
use crate::utils::validate::ValidatedJson;

pub fn geo_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(route))
        .routes(routes!(geofence))
}

/// POST /api/geo/route - Nearest-neighbor visiting order
#[utoipa::path(
    post,
    path = "/geo/route",
    tag = GEO_TAG,
    request_body = RouteRequest,
    responses(
        (status = 200, description = "Visiting order with distances", body = RoutePlan),
        (status = 400, description = "Invalid coordinates", body = ErrorResponse)
    )
)]
async fn route(ValidatedJson(req): ValidatedJson<RouteRequest>) -> AppResult<Json<RoutePlan>> {
    Ok(Json(plan_route(req.start, &req.stores)))
}

/// POST /api/geo/geofence - Stores entered since the last check
///
/// The caller keeps the session: it sends back `notified_store_ids` from the
/// previous response so each store fires once.
#[utoipa::path(
    post,
    path = "/geo/geofence",
    tag = GEO_TAG,
    request_body = GeofenceRequest,
    responses(
        (status = 200, description = "New hits and the updated notified set", body = GeofenceResponse),
        (status = 400, description = "Invalid coordinates or radius", body = ErrorResponse)
    )
)]
async fn geofence(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<GeofenceRequest>,
) -> AppResult<Json<GeofenceResponse>> {
    let radius_m = req
        .radius_m
        .unwrap_or(state.settings.geo.geofence_radius_m);

    let mut notifier = ProximityNotifier::restore(radius_m, req.stores, req.notified_store_ids);
    let hits = notifier.observe(req.location);

    Ok(Json(GeofenceResponse {
        hits,
        notified_store_ids: notifier.notified_ids(),
        radius_m: notifier.radius_m(),
    }))
}
