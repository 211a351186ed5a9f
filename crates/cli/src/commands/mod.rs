pub mod config;
pub mod migrate;
pub mod version;

use std::path::PathBuf;

use anyhow::{Context, Result};
use migr8_core::{Config, LoggingConfig};

/// Flags accepted by every command
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub verbose: bool,
    pub database_url: Option<String>,
}

impl GlobalOptions {
    /// Load the configuration and apply command-line overrides
    pub fn load_config(&self) -> Result<Config> {
        let mut config =
            Config::load(self.config.as_deref()).context("failed to load config")?;

        if let Some(url) = &self.database_url {
            config.database.url = Some(url.clone());
        }
        config.verbose |= self.verbose;
        Ok(config)
    }
}

/// Install the stderr logger; `MIGR8_LOG_FORMAT=json` switches to JSON lines
pub fn init_logging(verbose: bool) -> Result<()> {
    let config = if verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    let json = std::env::var("MIGR8_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    migr8_core::init_logging(config.with_json_format(json))
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
