//! # bridge-settings
//!
//! Configuration for the event bridge, loaded from three layers (in priority
//! order):
//! 1. **Compiled defaults**: [`BridgeSettings::default()`]
//! 2. **Settings file**: `~/.laplace/event-bridge.json` or an explicit path,
//!    deep-merged over defaults
//! 3. **Environment variables**: `LEB_*` and the legacy `HOST`, `DEBUG`,
//!    `LAPLACE_EVENT_BRIDGE_AUTH` names (highest priority)
//!
//! Command-line flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    LoadedSettings, RejectedOverride, apply_env_overrides, apply_overrides_from, deep_merge,
    load_settings, load_settings_from_path, settings_path,
};
pub use types::BridgeSettings;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let settings = BridgeSettings::default();
        assert!(settings.validate().is_ok());
        assert!(settings_path().ends_with(".laplace/event-bridge.json"));
    }
}
