use std::collections::HashSet;

use serde::Serialize;
use utoipa::ToSchema;

use super::{Coordinate, Store, haversine};

/// A store entered for the first time since the store list was set.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct StoreHit {
    pub store_id: String,
    pub name: String,
    pub distance_m: f64,
}

/// Threshold-crossing detector over a set of store coordinates.
///
/// Each store fires at most once until the store list is replaced by a
/// different one.
#[derive(Debug, Clone)]
pub struct ProximityNotifier {
    radius_m: f64,
    stores: Vec<Store>,
    notified: HashSet<String>,
}

impl ProximityNotifier {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            stores: Vec::new(),
            notified: HashSet::new(),
        }
    }

    /// Rebuild a session from ids already notified, ignoring unknown ids.
    pub fn restore<I>(radius_m: f64, stores: Vec<Store>, notified: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let notified = notified
            .into_iter()
            .filter(|id| stores.iter().any(|s| &s.id == id))
            .collect();
        Self {
            radius_m,
            stores,
            notified,
        }
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Replace the store list. A different list clears every notified flag.
    pub fn set_stores(&mut self, stores: Vec<Store>) {
        if stores != self.stores {
            self.stores = stores;
            self.notified.clear();
        }
    }

    /// Hits for stores within the radius that have not fired yet.
    pub fn observe(&mut self, location: Coordinate) -> Vec<StoreHit> {
        let mut hits = Vec::new();
        for store in &self.stores {
            if self.notified.contains(&store.id) {
                continue;
            }
            let distance = haversine::distance_m(location, store.location);
            if distance <= self.radius_m {
                self.notified.insert(store.id.clone());
                hits.push(StoreHit {
                    store_id: store.id.clone(),
                    name: store.name.clone(),
                    distance_m: distance,
                });
            }
        }
        hits
    }

    pub fn is_notified(&self, store_id: &str) -> bool {
        self.notified.contains(store_id)
    }

    /// Notified ids, in store-list order.
    pub fn notified_ids(&self) -> Vec<String> {
        self.stores
            .iter()
            .filter(|s| self.notified.contains(&s.id))
            .map(|s| s.id.clone())
            .collect()
    }
}
