//! # seatswap-settings
//!
//! Layered configuration for the replacement service.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`SeatswapSettings::default()`]
//! 2. **User file**: `~/.seatswap/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SEATSWAP_*` overrides (highest priority)

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{database_path, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

use std::sync::OnceLock;

/// Global settings singleton.
static SETTINGS: OnceLock<SeatswapSettings> = OnceLock::new();

/// Get the global settings instance.
///
/// On first call, loads settings from `~/.seatswap/settings.json` with env
/// var overrides. If loading fails, logs the error and returns compiled
/// defaults.
pub fn get_settings() -> &'static SeatswapSettings {
    SETTINGS.get_or_init(|| {
        load_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            SeatswapSettings::default()
        })
    })
}

/// Initialize the global settings with a specific value.
///
/// Returns the settings back if the global was already initialized.
#[allow(clippy::result_large_err)]
pub fn init_settings(settings: SeatswapSettings) -> std::result::Result<(), SeatswapSettings> {
    SETTINGS.set(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = SeatswapSettings::default();
        assert!(settings_path().ends_with(".seatswap/settings.json"));
    }

    #[test]
    fn global_is_set_once() {
        let first = get_settings().clone();
        assert!(init_settings(SeatswapSettings::default()).is_err());
        assert_eq!(get_settings(), &first);
    }
}
