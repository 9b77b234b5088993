//! Server module for managing HTTP server lifecycle
//!
//! This module handles server initialization, startup, and graceful shutdown.

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::api::create_router;
use crate::config::{Environment, Settings};
use crate::db::{establish_async_connection_pool, migrate};
use crate::dispatch::{DispatchScheduler, NotificationJobStore, SystemClock};
use crate::repositories::NotificationJobRepository;
use crate::services::notifications::ChannelSenders;
use crate::state::AppState;

/// HTTP server manager
pub struct Server {
    settings: Settings,
}

impl Server {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Start the server and run until shutdown signal
    ///
    /// # Errors
    /// - Database connection pool initialization errors
    /// - Migration errors when `database.auto_migrate` is set
    /// - Scheduler start errors when `dispatch.enabled` is set
    /// - Address binding errors
    pub async fn run(self) -> anyhow::Result<()> {
        self.log_configuration();

        self.settings.validate().map_err(|e| {
            tracing::error!(error = %e, "Configuration validation failed");
            anyhow::anyhow!("Configuration validation failed: {}", e)
        })?;

        if self.settings.database.auto_migrate {
            let applied = migrate::run_pending_migrations(&self.settings.database.url)
                .await
                .map_err(|e| anyhow::anyhow!(e.detailed_message()))?;
            tracing::info!(count = applied.len(), "Database migrations applied");
        }

        tracing::info!("Initializing database connection pool...");
        let pool = establish_async_connection_pool(&self.settings.database)
            .await
            .map_err(|e| anyhow::anyhow!(e.detailed_message()))?;
        tracing::info!("Database connection pool initialized");

        let store: Arc<dyn NotificationJobStore> = Arc::new(NotificationJobRepository::new(pool));
        let senders = ChannelSenders::from_config(&self.settings.channels);
        let state = AppState::new(self.settings.clone(), store, senders, Arc::new(SystemClock));

        let scheduler = if self.settings.dispatch.enabled {
            let scheduler =
                DispatchScheduler::new(state.dispatcher.clone(), &self.settings.dispatch.schedule)
                    .await?;
            scheduler.start().await?;
            Some(scheduler)
        } else {
            tracing::info!("In-process dispatch disabled, waiting for external triggers");
            None
        };

        let router = create_router(state);

        let address = self.settings.server.address();
        let listener = TcpListener::bind(&address).await.map_err(|e| {
            tracing::error!(error = %e, address = %address, "Failed to bind to address");
            anyhow::anyhow!("Failed to bind to {}: {}", address, e)
        })?;

        tracing::info!(address = %address, "Server listening");

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(scheduler) = scheduler {
            if let Err(e) = scheduler.stop().await {
                tracing::warn!(error = %e, "Dispatch scheduler did not stop cleanly");
            }
        }
        served?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }

    fn log_configuration(&self) {
        let settings = &self.settings;

        tracing::info!(
            app_name = %settings.application.name,
            app_version = %settings.application.version,
            environment = %Environment::from_env().as_str(),
            "Application starting"
        );

        tracing::info!(
            host = %settings.server.host,
            port = %settings.server.port,
            request_timeout = %settings.server.request_timeout,
            "Server configuration loaded"
        );

        // URL omitted, it carries credentials
        tracing::info!(
            max_connections = %settings.database.max_connections,
            min_connections = %settings.database.min_connections,
            connection_timeout = %settings.database.connection_timeout,
            auto_migrate = %settings.database.auto_migrate,
            "Database configuration loaded"
        );

        tracing::info!(
            enabled = %settings.dispatch.enabled,
            schedule = %settings.dispatch.schedule,
            batch_size = %settings.dispatch.batch_size,
            stale_after_secs = %settings.dispatch.stale_after_secs,
            max_attempts = %settings.dispatch.max_attempts,
            trigger_secret_configured = %(!settings.dispatch.trigger_secret.is_empty()),
            "Dispatch configuration loaded"
        );

        tracing::info!(
            push_configured = %(!settings.channels.push_url.is_empty()),
            email_configured = %(!settings.channels.email_url.is_empty()),
            timeout_secs = %settings.channels.timeout_secs,
            "Channel configuration loaded"
        );
    }
}

/// Waits for Ctrl+C or SIGTERM.
///
/// If a handler cannot be installed, that branch never resolves.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
