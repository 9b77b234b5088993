use std::sync::LazyLock;
use std::time::Duration;

/// User-Agent sent to the channel senders
pub const USER_AGENT: &str = concat!("basket-rs/", env!("CARGO_PKG_VERSION"));

/// Global HTTP client, initialized on first access.
///
/// Shared by all channel senders so connections are pooled across batches.
/// Per-request timeouts set with `RequestBuilder::timeout` take precedence
/// over the 30s default below.
pub static HTTP_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        // Timeouts
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        // Connection pooling
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        // HTTP/2 settings
        .http2_adaptive_window(true)
        .http2_keep_alive_interval(Duration::from_secs(10))
        .http2_keep_alive_timeout(Duration::from_secs(20))
        .gzip(true)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to build tuned HTTP client, using defaults");
            reqwest::Client::new()
        })
});
