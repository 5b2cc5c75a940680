//! Annokit Settings Crate
//!
//! Handles application configuration and its persistence.

pub mod config;
pub mod error;

pub use config::{CacheSettings, Config, LoggingSettings, SessionSettings, LOG_LEVELS};
pub use error::{ConfigError, SettingsError, SettingsResult};
