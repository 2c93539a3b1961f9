//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`BridgeSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Environment values that fail to parse are skipped and returned as
//! [`RejectedOverride`]s, so the caller can report them once logging is up.
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::BridgeSettings;

/// Resolve the default settings file path (`~/.laplace/event-bridge.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".laplace").join("event-bridge.json")
}

/// An environment value that failed to parse and was ignored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RejectedOverride {
    /// Variable name.
    pub key: &'static str,
    /// Raw value as found.
    pub value: String,
    /// What the variable accepts.
    pub expected: &'static str,
}

impl RejectedOverride {
    /// Emit the warning for this value.
    pub fn warn(&self) {
        tracing::warn!(
            key = self.key,
            value = %self.value,
            expected = self.expected,
            "invalid env var, ignoring"
        );
    }
}

/// Result of [`load_settings_from_path`].
#[derive(Clone, Debug)]
pub struct LoadedSettings {
    /// Validated settings.
    pub settings: BridgeSettings,
    /// Environment values that were skipped.
    pub rejected: Vec<RejectedOverride>,
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LoadedSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an invalid final value
/// combination is an error.
pub fn load_settings_from_path(path: &Path) -> Result<LoadedSettings> {
    let mut settings = read_file_layer(path)?;
    let rejected = apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(LoadedSettings { settings, rejected })
}

fn read_file_layer(path: &Path) -> Result<BridgeSettings> {
    let defaults = serde_json::to_value(BridgeSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply process environment overrides to loaded settings.
pub fn apply_env_overrides(settings: &mut BridgeSettings) -> Vec<RejectedOverride> {
    apply_overrides_from(settings, |name| std::env::var(name).ok())
}

/// Apply overrides read through `lookup`.
///
/// When two names are listed for one field, the first set one wins. Invalid
/// values are ignored (falling back to file/default) and returned.
pub fn apply_overrides_from(
    settings: &mut BridgeSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> Vec<RejectedOverride> {
    let mut env = EnvReader {
        lookup,
        rejected: Vec::new(),
    };

    if let Some(v) = env.string(&["LEB_HOST", "HOST"]) {
        settings.host = v;
    }
    if let Some(v) = env.u16("LEB_PORT", 1, 65535) {
        settings.port = v;
    }
    if let Some(v) = env.string(&["LEB_AUTH", "LAPLACE_EVENT_BRIDGE_AUTH"]) {
        settings.auth_token = v;
    }
    if let Some(v) = env.bool(&["LEB_DEBUG", "DEBUG"]) {
        settings.debug = v;
    }
    if let Some(v) = env.u64("LEB_HEARTBEAT_INTERVAL_SECS", 1, 3600) {
        settings.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.u64("LEB_HEARTBEAT_TIMEOUT_SECS", 1, 86_400) {
        settings.heartbeat_timeout_secs = v;
    }
    env.rejected
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

struct EnvReader<F> {
    lookup: F,
    rejected: Vec<RejectedOverride>,
}

impl<F: Fn(&str) -> Option<String>> EnvReader<F> {
    /// First non-empty value among `names`, with the name it came from.
    fn first(&self, names: &[&'static str]) -> Option<(&'static str, String)> {
        names
            .iter()
            .find_map(|&name| (self.lookup)(name).filter(|v| !v.is_empty()).map(|v| (name, v)))
    }

    fn string(&self, names: &[&'static str]) -> Option<String> {
        self.first(names).map(|(_, v)| v)
    }

    fn parsed<T>(
        &mut self,
        names: &[&'static str],
        expected: &'static str,
        parse: impl FnOnce(&str) -> Option<T>,
    ) -> Option<T> {
        let (key, value) = self.first(names)?;
        let result = parse(&value);
        if result.is_none() {
            self.rejected.push(RejectedOverride {
                key,
                value,
                expected,
            });
        }
        result
    }

    fn bool(&mut self, names: &[&'static str]) -> Option<bool> {
        self.parsed(names, "boolean", parse_bool)
    }

    fn u16(&mut self, name: &'static str, min: u16, max: u16) -> Option<u16> {
        self.parsed(&[name], "integer in range", |v| parse_u16_range(v, min, max))
    }

    fn u64(&mut self, name: &'static str, min: u64, max: u64) -> Option<u64> {
        self.parsed(&[name], "integer in range", |v| parse_u64_range(v, min, max))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
