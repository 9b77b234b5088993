//! Geo endpoint DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::geo::{Coordinate, Store, StoreHit};

#[derive(Debug, Deserialize, ToSchema, Validate)]
#[schema(example = json!({
    "start": { "lat": 52.5200, "lng": 13.4050 },
    "stores": [
        { "id": "s-1", "name": "Corner Market", "location": { "lat": 52.5210, "lng": 13.4100 } },
        { "id": "s-2", "name": "Bio Laden", "location": { "lat": 52.5185, "lng": 13.4020 } }
    ]
}))]
pub struct RouteRequest {
    #[validate(nested)]
    pub start: Coordinate,

    #[validate(length(max = 200, message = "At most 200 stores per request"), nested)]
    pub stores: Vec<Store>,
}

#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GeofenceRequest {
    /// Current position of the shopper
    #[validate(nested)]
    pub location: Coordinate,

    #[validate(length(max = 200, message = "At most 200 stores per request"), nested)]
    pub stores: Vec<Store>,

    /// Overrides the configured radius
    #[validate(range(exclusive_min = 0.0, max = 50000.0, message = "Radius must be in (0, 50000] metres"))]
    pub radius_m: Option<f64>,

    /// Stores that already fired in this session
    #[serde(default)]
    pub notified_store_ids: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeofenceResponse {
    /// Stores entered for the first time
    pub hits: Vec<StoreHit>,
    /// Every store notified so far, to send back on the next check
    pub notified_store_ids: Vec<String>,
    pub radius_m: f64,
}
