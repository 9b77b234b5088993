//! Application state for Axum web framework.
//!
//! Contains shared services and resources that are accessible
//! across all request handlers.

use std::sync::Arc;

use crate::config::Settings;
use crate::dispatch::{Clock, Dispatcher, DispatcherConfig, NotificationJobStore};
use crate::services::Services;
use crate::services::notifications::ChannelSenders;

/// Application state containing all shared services and resources.
///
/// Cloning is cheap; every field is reference counted.
#[derive(Clone)]
pub struct AppState {
    /// All business logic services
    pub services: Services,
    /// The one dispatcher every trigger goes through
    pub dispatcher: Arc<Dispatcher>,
    /// Direct store access for health checks
    pub store: Arc<dyn NotificationJobStore>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wires services and the dispatcher around a single job store and clock.
    ///
    /// # Example
    /// ```ignore
    /// let store = Arc::new(NotificationJobRepository::new(pool));
    /// let senders = ChannelSenders::from_config(&settings.channels);
    /// let state = AppState::new(settings, store, senders, Arc::new(SystemClock));
    /// ```
    pub fn new(
        settings: Settings,
        store: Arc<dyn NotificationJobStore>,
        senders: ChannelSenders,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            store.clone(),
            senders,
            clock.clone(),
            DispatcherConfig::from(&settings.dispatch),
        ));
        let services = Services::new(store.clone(), clock);

        Self {
            services,
            dispatcher,
            store,
            settings: Arc::new(settings),
        }
    }
}
