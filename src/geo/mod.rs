//! Store proximity: great-circle distance, geofence notifier and route planner.

mod geofence;
pub mod haversine;
mod route;

pub use geofence::{ProximityNotifier, StoreHit};
pub use haversine::{EARTH_RADIUS_M, distance_m};
pub use route::{RoutePlan, RouteStop, WALKING_SPEED_M_PER_MIN, plan_route};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Coordinate {
    #[validate(range(min = -90.0, max = 90.0))]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A grocery store location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Store {
    #[validate(length(min = 1, max = 100))]
    pub id: String,
    #[validate(length(max = 255))]
    pub name: String,
    #[validate(nested)]
    pub location: Coordinate,
}
