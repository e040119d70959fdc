//! # seatswap-telemetry
//!
//! Structured logging for the replacement service.
//!
//! - [`init_telemetry`] installs the global `tracing` subscriber: an
//!   `EnvFilter` (`RUST_LOG` wins over the configured level) and a compact or
//!   JSON fmt layer on stderr.
//! - [`capture_logs`] installs a thread-local subscriber that records events
//!   in memory, for tests that assert on what was logged.

#![deny(unsafe_code)]

pub mod test_utils;

pub use test_utils::{CapturedEvent, CapturedLogs, capture_logs};

use seatswap_settings::LoggingSettings;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Default filter directive (e.g. `info` or `seatswap_engine=debug`).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl From<&LoggingSettings> for TelemetryConfig {
    fn from(settings: &LoggingSettings) -> Self {
        Self {
            level: settings.level.clone(),
            json: settings.json,
        }
    }
}

impl TelemetryConfig {
    /// The filter this config resolves to, with `RUST_LOG` taking precedence.
    /// An unparsable configured level falls back to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Install the global subscriber. Call once at startup; later calls are no-ops.
pub fn init_telemetry(config: &TelemetryConfig) {
    let filter = config.env_filter();

    let result = if config.json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_logging_settings() {
        let settings = LoggingSettings {
            level: "warn".into(),
            json: true,
        };
        let config = TelemetryConfig::from(&settings);
        assert_eq!(config.level, "warn");
        assert!(config.json);
    }

    #[test]
    fn default_config() {
        assert_eq!(TelemetryConfig::default().level, "info");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_telemetry(&TelemetryConfig::default());
        init_telemetry(&TelemetryConfig {
            level: "debug".into(),
            json: true,
        });
    }

    #[test]
    fn bad_level_still_builds_filter() {
        let config = TelemetryConfig {
            level: "=[not a directive".into(),
            json: false,
        };
        let _ = config.env_filter();
    }
}
