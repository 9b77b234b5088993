//! Serve command handler
//!
//! Handles the serve command including dry-run validation and server startup.

use crate::config::Settings;
use crate::server::Server;

/// Handler for the serve command
pub struct ServeCommandHandler {
    config: Settings,
}

impl ServeCommandHandler {
    pub fn new(config: Settings) -> Self {
        Self { config }
    }

    /// Validate only, or run the server until a shutdown signal.
    pub async fn execute(&self, dry_run: bool) -> anyhow::Result<()> {
        if dry_run {
            return self.validate_only();
        }
        Server::new(self.config.clone()).run().await
    }

    /// Validate configuration without starting the server
    pub fn validate_only(&self) -> anyhow::Result<()> {
        self.config.validate()?;

        let dispatch = &self.config.dispatch;
        println!("✓ Configuration is valid");
        println!("✓ Server would bind to: {}", self.config.server.address());
        if dispatch.enabled {
            println!("✓ In-process dispatch trigger: {}", dispatch.schedule);
        } else {
            println!("✓ Dispatch trigger: external only (POST /api/dispatch/run)");
        }
        if dispatch.trigger_secret.is_empty() {
            println!("! dispatch.trigger_secret is empty - trigger and scheduling API are unauthenticated");
        }
        for (name, url) in [
            ("push", &self.config.channels.push_url),
            ("email", &self.config.channels.email_url),
        ] {
            if url.is_empty() {
                println!("! No {} channel configured - {} jobs will fail", name, name);
            } else {
                println!("✓ {} channel: {}", name, url);
            }
        }

        println!("Dry run completed successfully - configuration is ready for deployment");
        Ok(())
    }

    pub fn config(&self) -> &Settings {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Settings {
        let mut config = Settings::default();
        config.database.url = "postgres://localhost/basket".to_string();
        config
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run() {
        let handler = ServeCommandHandler::new(create_valid_config());
        assert!(handler.execute(true).await.is_ok());
    }

    #[tokio::test]
    async fn test_serve_handler_dry_run_invalid_config() {
        let mut config = create_valid_config();
        config.server.port = 0;
        let handler = ServeCommandHandler::new(config);

        assert!(handler.execute(true).await.is_err());
    }
}
