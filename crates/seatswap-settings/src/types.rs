//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! settings file only needs the keys it changes.

use std::time::Duration;

use seatswap_core::constants::{DEFAULT_IDLE_THRESHOLD_MS, DEFAULT_MAX_REPLACEMENT_MS};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Upper bound for every configured duration (one day).
pub const MAX_DURATION_MS: u64 = 86_400_000;

/// Root settings type.
///
/// ```json
/// {
///   "replacement": { "idleThresholdMs": 90000 },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeatswapSettings {
    /// Replacement protocol timing.
    pub replacement: ReplacementSettings,
    /// Session database.
    pub store: StoreSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Live connection settings.
    pub live: LiveSettings,
}

impl SeatswapSettings {
    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        check_duration("replacement.idleThresholdMs", self.replacement.idle_threshold_ms)?;
        check_duration("replacement.maxDurationMs", self.replacement.max_duration_ms)?;
        if self.live.send_queue_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "live.sendQueueCapacity must be greater than 0".into(),
            ));
        }
        if self.store.database_path.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "store.databasePath must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn check_duration(key: &str, ms: u64) -> Result<()> {
    if ms == 0 {
        return Err(SettingsError::InvalidValue(format!("{key} must be greater than 0")));
    }
    if ms > MAX_DURATION_MS {
        return Err(SettingsError::InvalidValue(format!(
            "{key} must be at most {MAX_DURATION_MS}, got {ms}"
        )));
    }
    Ok(())
}

/// Replacement protocol timing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplacementSettings {
    /// How long the seat on turn must be idle before it may be contested.
    pub idle_threshold_ms: u64,
    /// How long a proposal stays open before it expires.
    pub max_duration_ms: u64,
}

impl ReplacementSettings {
    /// Idle threshold as a [`Duration`].
    pub fn idle_threshold(&self) -> Duration {
        Duration::from_millis(self.idle_threshold_ms)
    }

    /// Proposal lifetime as a [`Duration`].
    pub fn max_duration(&self) -> Duration {
        Duration::from_millis(self.max_duration_ms)
    }
}

impl Default for ReplacementSettings {
    fn default() -> Self {
        Self {
            idle_threshold_ms: DEFAULT_IDLE_THRESHOLD_MS,
            max_duration_ms: DEFAULT_MAX_REPLACEMENT_MS,
        }
    }
}

/// Session database.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreSettings {
    /// Path to the SQLite database (relative to `~/.seatswap`).
    pub database_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            database_path: "seatswap.db".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Live connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LiveSettings {
    /// Frames buffered per connection before new ones are dropped.
    pub send_queue_capacity: usize,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            send_queue_capacity: 64,
        }
    }
}
