//! Process logging setup.
//!
//! The filter comes from `RUST_LOG` when set, else from the `[logging]` table,
//! else `info`. Classifier events are logged under [`EVENT_TARGET`], so
//! `RUST_LOG=info,xdpgate::events=debug` shows every verdict without turning
//! on debug output for the rest of the daemon.

use serde::Deserialize;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// `tracing` target used when rendering classifier events.
pub const EVENT_TARGET: &str = "xdpgate::events";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
    Json,
}

/// `[logging]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// error, warn, info, debug or trace. Unknown names fall back to info.
    pub level: Option<String>,
    pub format: LogFormat,
}

impl LogConfig {
    fn filter(&self) -> EnvFilter {
        let level = self.level.as_deref().map(parse_level).unwrap_or(Level::INFO);
        EnvFilter::new(level.as_str())
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(config: Option<&LogConfig>) {
    let env_filter = match std::env::var("RUST_LOG") {
        Ok(_) => EnvFilter::from_default_env(),
        Err(_) => config.map(LogConfig::filter).unwrap_or_else(|| EnvFilter::new("info")),
    };
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = match config.map(|c| c.format).unwrap_or_default() {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_span_events(FmtSpan::CLOSE),
            ),
        ),
        LogFormat::Compact => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().compact()),
        ),
        LogFormat::Pretty => {
            tracing::subscriber::set_global_default(registry.with(tracing_subscriber::fmt::layer()))
        }
    };
    // Already installed by an earlier call
    let _ = installed;
}

fn parse_level(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level(" debug "), Level::DEBUG);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn test_log_config_from_toml() {
        let config: LogConfig = toml::from_str("format = \"json\"").unwrap();
        assert_eq!(config.level, None);
        assert_eq!(config.format, LogFormat::Json);

        let config: LogConfig = toml::from_str("").unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(toml::from_str::<LogConfig>("format = \"xml\"").is_err());
    }
}
