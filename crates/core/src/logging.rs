//! Logging setup
//!
//! Installs a `tracing-subscriber` registry that writes to stderr, keeping
//! stdout free for command output. `RUST_LOG` overrides the configured
//! filter when set.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TOOL_TARGETS: [&str; 3] = ["migr8", "migr8_core", "migr8_engine"];

/// Logging configuration for the migr8 binary
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level for migr8's own targets (e.g. "info", "debug")
    pub level: String,
    /// Level for everything else, sqlx included
    pub dependency_level: String,
    /// Emit JSON lines instead of plain text
    pub json_format: bool,
    /// Include file and line number information
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dependency_level: "warn".to_string(),
            json_format: false,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    /// Debug output with source locations
    pub fn verbose() -> Self {
        Self {
            level: "debug".to_string(),
            include_location: true,
            ..Self::default()
        }
    }

    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }

    /// Filter directive used when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> String {
        let mut directives = vec![self.dependency_level.clone()];
        directives.extend(
            TOOL_TARGETS
                .iter()
                .map(|target| format!("{}={}", target, self.level)),
        );
        directives.join(",")
    }
}

/// Initialize logging for the process.
///
/// Fails if the filter does not parse or a global subscriber is already set.
pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let directive = config.filter_directive();
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&directive))?;

    let layer = Layer::new()
        .with_writer(io::stderr)
        .with_target(false)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer)
            .try_init()?;
    }

    tracing::debug!(filter = %directive, json = config.json_format, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(
            LoggingConfig::default().filter_directive(),
            "warn,migr8=info,migr8_core=info,migr8_engine=info"
        );
    }

    #[test]
    fn test_verbose_directive() {
        let config = LoggingConfig::verbose();
        assert!(config.include_location);
        assert_eq!(
            config.filter_directive(),
            "warn,migr8=debug,migr8_core=debug,migr8_engine=debug"
        );
    }

    #[test]
    fn test_json_format_keeps_directive() {
        let config = LoggingConfig::default().with_json_format(true);
        assert!(config.json_format);
        assert_eq!(config.filter_directive(), LoggingConfig::default().filter_directive());
    }

    #[test]
    fn test_directives_parse() {
        for config in [
            LoggingConfig::default(),
            LoggingConfig::verbose(),
        ] {
            assert!(EnvFilter::try_new(config.filter_directive()).is_ok());
        }
    }
}
