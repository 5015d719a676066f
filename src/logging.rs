//! Logging setup
//!
//! Installs a global `tracing` subscriber built from [`LoggingConfig`].
//! `RUST_LOG` takes precedence over the configured level.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cloudroid_core::LoggingConfig;

/// Build the filter for a logging configuration
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.is_empty() => EnvFilter::try_new(&directives)
            .with_context(|| format!("invalid RUST_LOG directives: {}", directives)),
        _ => EnvFilter::try_new(&config.level)
            .with_context(|| format!("invalid logging.level: {}", config.level)),
    }
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter(config)?)
        .with_target(config.with_target)
        .with_file(config.with_file)
        .with_line_number(config.with_file)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_level_is_accepted() {
        let config = LoggingConfig {
            level: "cloudroid_genycloud=debug,info".to_string(),
            ..LoggingConfig::default()
        };
        if std::env::var(EnvFilter::DEFAULT_ENV).is_err() {
            assert!(env_filter(&config).is_ok());
        }
    }

    #[test]
    fn test_init_twice_fails_the_second_time() {
        let config = LoggingConfig::default();
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
