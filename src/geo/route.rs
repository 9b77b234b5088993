use serde::Serialize;
use utoipa::ToSchema;

use super::{Coordinate, Store, haversine};

/// Average walking speed, 5 km/h
pub const WALKING_SPEED_M_PER_MIN: f64 = 5_000.0 / 60.0;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RouteStop {
    pub store_id: String,
    pub name: String,
    pub location: Coordinate,
    /// Distance from the previous stop (or the start)
    pub leg_distance_m: f64,
    pub cumulative_distance_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RoutePlan {
    pub stops: Vec<RouteStop>,
    pub total_distance_m: f64,
    /// Walking time rounded up to whole minutes
    pub estimated_walking_minutes: u32,
}

/// Greedy nearest-neighbor visiting order from `start`.
///
/// Ties go to the destination listed first. O(n²), meant for a handful of
/// nearby stores.
pub fn plan_route(start: Coordinate, destinations: &[Store]) -> RoutePlan {
    let mut remaining: Vec<&Store> = destinations.iter().collect();
    let mut stops = Vec::with_capacity(remaining.len());
    let mut position = start;
    let mut total = 0.0;

    while !remaining.is_empty() {
        let mut best = 0;
        let mut best_distance = f64::INFINITY;
        for (i, store) in remaining.iter().enumerate() {
            let d = haversine::distance_m(position, store.location);
            if d < best_distance {
                best = i;
                best_distance = d;
            }
        }

        let store = remaining.remove(best);
        total += best_distance;
        position = store.location;
        stops.push(RouteStop {
            store_id: store.id.clone(),
            name: store.name.clone(),
            location: store.location,
            leg_distance_m: best_distance,
            cumulative_distance_m: total,
        });
    }

    RoutePlan {
        stops,
        total_distance_m: total,
        estimated_walking_minutes: walking_minutes(total),
    }
}

fn walking_minutes(distance_m: f64) -> u32 {
    (distance_m / WALKING_SPEED_M_PER_MIN).ceil() as u32
}
