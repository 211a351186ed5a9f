//! # migr8-core
//!
//! Configuration loading and logging setup shared by the migr8 binary.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, DatabaseConfig, Driver, MigrationSettings, CONFIG_FILE_NAME};
pub use logging::{init_logging, LoggingConfig};
