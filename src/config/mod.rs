//! Configuration management for basket-rs
//!
//! Layered loading from TOML files with `BASKET_*` environment overrides,
//! see [`ConfigLoader`] for the precedence order.

pub mod environment;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use environment::Environment;
pub use loader::ConfigLoader;
pub use settings::{
    ChannelsConfig, DatabaseConfig, DispatchConfig, GeoConfig, LoggerSettings, ServerConfig,
    Settings,
};
