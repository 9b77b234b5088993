//! Configuration validation logic
//!
//! This module provides validation methods for all configuration structures
//! to ensure configuration values are within acceptable ranges and formats.

use crate::config::error::ConfigError;
use crate::config::settings::{
    ChannelsConfig, DatabaseConfig, DispatchConfig, FileSettings, GeoConfig, LoggerSettings,
    ServerConfig, Settings,
};

/// Valid log levels
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid log formats
const VALID_LOG_FORMATS: &[&str] = &["full", "compact", "json"];

/// Upper bound for a single dispatch batch
const MAX_BATCH_SIZE: u32 = 100;

/// Upper bound for `dispatch.stale_after_secs` (7 days)
const MAX_STALE_AFTER_SECS: u64 = 7 * 24 * 60 * 60;

/// Upper bound for `dispatch.max_attempts`; stored in an `INTEGER` column
const MAX_ATTEMPTS: u32 = 100;

impl ServerConfig {
    /// Validate server configuration
    ///
    /// # Validation Rules
    /// - Port must be between 1 and 65535
    /// - Request timeout must be greater than 0
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::validation(
                "server.port",
                "Port must be between 1 and 65535. Please specify a valid port number.",
            ));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::validation(
                "server.request_timeout",
                "Request timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl DatabaseConfig {
    /// Validate database configuration
    ///
    /// # Validation Rules
    /// - URL must not be empty and must use a PostgreSQL scheme
    /// - Min and max connections must be greater than 0, min not exceeding max
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.is_empty() {
            return Err(ConfigError::validation(
                "database.url",
                "Database URL is required. Please specify a valid database connection string.",
            ));
        }

        if !self.is_valid_database_url() {
            return Err(ConfigError::validation(
                "database.url",
                "Invalid database URL format. Expected format: postgres://[user:password@]host[:port]/database",
            ));
        }

        if self.max_connections == 0 {
            return Err(ConfigError::validation(
                "database.max_connections",
                "Max connections must be greater than 0.",
            ));
        }

        if self.min_connections == 0 {
            return Err(ConfigError::validation(
                "database.min_connections",
                "Min connections must be greater than 0.",
            ));
        }

        if self.min_connections > self.max_connections {
            return Err(ConfigError::ValidationError {
                field: "database.min_connections".to_string(),
                message: format!(
                    "Min connections ({}) cannot exceed max connections ({}).",
                    self.min_connections, self.max_connections
                ),
            });
        }

        Ok(())
    }

    fn is_valid_database_url(&self) -> bool {
        ["postgres://", "postgresql://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }
}

impl FileSettings {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled && self.path.trim().is_empty() {
            return Err(ConfigError::validation(
                "logger.file.path",
                "File path is required when file logging is enabled.",
            ));
        }

        if !VALID_LOG_FORMATS.contains(&self.format.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.file.format".to_string(),
                message: format!(
                    "Invalid log format '{}'. Valid formats are: {}",
                    self.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        Ok(())
    }
}

impl LoggerSettings {
    /// Validate logger settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !VALID_LOG_LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::ValidationError {
                field: "logger.level".to_string(),
                message: format!(
                    "Invalid log level '{}'. Valid levels are: {}",
                    self.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        self.file.validate()?;

        Ok(())
    }
}

impl DispatchConfig {
    /// Validate dispatch configuration
    ///
    /// # Validation Rules
    /// - Batch size must be between 1 and 100
    /// - Stale threshold must be between 1 second and 7 days
    /// - Attempt limit must be between 1 and 100
    /// - A schedule is required when the in-process trigger is enabled
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::ValidationError {
                field: "dispatch.batch_size".to_string(),
                message: format!("Batch size must be between 1 and {}.", MAX_BATCH_SIZE),
            });
        }

        if self.stale_after_secs == 0 || self.stale_after_secs > MAX_STALE_AFTER_SECS {
            return Err(ConfigError::ValidationError {
                field: "dispatch.stale_after_secs".to_string(),
                message: format!(
                    "Stale threshold must be between 1 and {} seconds.",
                    MAX_STALE_AFTER_SECS
                ),
            });
        }

        if self.max_attempts == 0 || self.max_attempts > MAX_ATTEMPTS {
            return Err(ConfigError::ValidationError {
                field: "dispatch.max_attempts".to_string(),
                message: format!("Max attempts must be between 1 and {}.", MAX_ATTEMPTS),
            });
        }

        if self.enabled && self.schedule.trim().is_empty() {
            return Err(ConfigError::validation(
                "dispatch.schedule",
                "A cron schedule is required when the dispatch trigger is enabled.",
            ));
        }

        Ok(())
    }
}

impl ChannelsConfig {
    /// Validate channel sender configuration
    ///
    /// Empty URLs are allowed: jobs for an unconfigured channel fail with a
    /// recorded error instead of blocking startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, url) in [
            ("channels.push_url", &self.push_url),
            ("channels.email_url", &self.email_url),
        ] {
            if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ValidationError {
                    field: field.to_string(),
                    message: format!("Channel URL must use http or https, got '{}'.", url),
                });
            }
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::validation(
                "channels.timeout_secs",
                "Channel timeout must be greater than 0 seconds.",
            ));
        }

        Ok(())
    }
}

impl GeoConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.geofence_radius_m.is_finite() || self.geofence_radius_m <= 0.0 {
            return Err(ConfigError::validation(
                "geo.geofence_radius_m",
                "Geofence radius must be a positive number of metres.",
            ));
        }
        Ok(())
    }
}

impl Settings {
    /// Validate all configuration settings
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.database.validate()?;
        self.logger.validate()?;
        self.dispatch.validate()?;
        self.channels.validate()?;
        self.geo.validate()?;

        // A claim younger than one channel request is still in flight
        if self.dispatch.stale_after_secs <= self.channels.timeout_secs {
            return Err(ConfigError::ValidationError {
                field: "dispatch.stale_after_secs".to_string(),
                message: format!(
                    "Stale threshold ({}s) must exceed channels.timeout_secs ({}s).",
                    self.dispatch.stale_after_secs, self.channels.timeout_secs
                ),
            });
        }

        Ok(())
    }
}
