//! TOML-based application configuration.
//!
//! Stores:
//! - Scheduler tuning (error back-off, optional sleep cap)
//! - Mute effect hooks (commands run when muting/unmuting)
//! - Log filter
//!
//! Configuration is stored at `~/.config/automute/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::data_dir;
use crate::error::ConfigError;

/// Scheduler loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds to wait after a failed cycle before trying again.
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
    /// Upper bound on a single sleep. Unset means sleep until the next event.
    #[serde(default)]
    pub max_sleep_secs: Option<u64>,
}

/// Commands run by the CLI mute sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EffectConfig {
    #[serde(default)]
    pub mute_command: Option<String>,
    #[serde(default)]
    pub unmute_command: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/automute/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub effect: EffectConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_error_backoff_secs() -> u64 {
    60
}
fn default_log_filter() -> String {
    "info".into()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            error_backoff_secs: default_error_backoff_secs(),
            max_sleep_secs: None,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

impl SchedulerConfig {
    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs.max(1))
    }

    pub fn max_sleep(&self) -> Option<Duration> {
        self.max_sleep_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: serde_json::Value,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                if !obj.contains_key(part) {
                    return Err(unknown());
                }
                obj.insert(part.to_string(), value);
                return Ok(());
            }
            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Ways to read `raw` for a field currently holding `existing`, most
    /// specific first. `""` and `none` also offer null, which clears an
    /// optional field.
    fn candidate_values(existing: &serde_json::Value, raw: &str) -> Vec<serde_json::Value> {
        use serde_json::Value;

        let trimmed = raw.trim();
        let mut out = Vec::new();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            out.push(Value::Null);
        }
        match existing {
            Value::Bool(_) => out.extend(trimmed.parse::<bool>().ok().map(Value::Bool)),
            Value::Number(_) => out.extend(trimmed.parse::<u64>().ok().map(Value::from)),
            Value::String(_) => out.push(Value::String(raw.into())),
            // Unset optional: the field's type decides, so offer both.
            Value::Null => {
                out.extend(trimmed.parse::<u64>().ok().map(Value::from));
                out.push(Value::String(raw.into()));
            }
            Value::Object(_) | Value::Array(_) => out.extend(serde_json::from_str(raw).ok()),
        }
        out
    }

    /// Default location, `<data_dir>/config.toml`.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("config.toml"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Returns error if key is unknown
    /// or the value does not fit the field. `""` or `none` clears an optional
    /// field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        let existing = Self::get_json_value_by_path(&json, key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

        let mut last_error = format!("cannot use '{value}' here");
        for candidate in Self::candidate_values(existing, value) {
            let mut attempt = json.clone();
            Self::set_json_value_by_path(&mut attempt, key, candidate)?;
            match serde_json::from_value(attempt) {
                Ok(updated) => {
                    *self = updated;
                    return Ok(());
                }
                Err(e) => last_error = e.to_string(),
            }
        }
        Err(invalid(last_error))
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.scheduler.error_backoff_secs, 60);
        assert_eq!(parsed.scheduler.max_sleep_secs, None);
        assert_eq!(parsed.log.filter, "info");
    }

    #[test]
    fn empty_file_uses_defaults() {
        let parsed: Config = toml::from_str("").unwrap();
        assert_eq!(parsed.scheduler.error_backoff_secs, 60);
        assert!(parsed.effect.mute_command.is_none());
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduler.error_backoff_secs").as_deref(), Some("60"));
        assert_eq!(cfg.get("log.filter").as_deref(), Some("info"));
        assert_eq!(cfg.get("effect.mute_command").as_deref(), Some("null"));
        assert!(cfg.get("scheduler.missing_key").is_none());
    }

    #[test]
    fn set_updates_number_and_optional_fields() {
        let mut cfg = Config::default();
        cfg.set("scheduler.error_backoff_secs", "15").unwrap();
        cfg.set("scheduler.max_sleep_secs", "3600").unwrap();
        cfg.set("effect.mute_command", "amixer set Master mute").unwrap();

        assert_eq!(cfg.scheduler.error_backoff_secs, 15);
        assert_eq!(cfg.scheduler.max_sleep(), Some(Duration::from_secs(3600)));
        assert_eq!(
            cfg.effect.mute_command.as_deref(),
            Some("amixer set Master mute")
        );
    }

    #[test]
    fn set_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set("scheduler.nonexistent_key", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
        assert!(cfg.set("", "1").is_err());
    }

    #[test]
    fn set_rejects_invalid_type() {
        let mut cfg = Config::default();
        let err = cfg.set("scheduler.error_backoff_secs", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.scheduler.error_backoff_secs, 60);
    }

    #[test]
    fn set_types_unset_optionals_by_field() {
        let mut cfg = Config::default();
        // A numeric-looking command stays a string.
        cfg.set("effect.mute_command", "1234").unwrap();
        assert_eq!(cfg.effect.mute_command.as_deref(), Some("1234"));

        let err = cfg.set("scheduler.max_sleep_secs", "later").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.scheduler.max_sleep_secs, None);
    }

    #[test]
    fn set_clears_optionals_with_empty_or_none() {
        let mut cfg = Config::default();
        cfg.set("effect.mute_command", "pactl set-sink-mute @DEFAULT_SINK@ 1").unwrap();
        cfg.set("scheduler.max_sleep_secs", "600").unwrap();

        cfg.set("effect.mute_command", "").unwrap();
        cfg.set("scheduler.max_sleep_secs", "none").unwrap();
        assert!(cfg.effect.mute_command.is_none());
        assert!(cfg.scheduler.max_sleep_secs.is_none());

        // Required fields cannot be cleared.
        let err = cfg.set("scheduler.error_backoff_secs", "none").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
        assert_eq!(cfg.scheduler.error_backoff_secs, 60);

        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        assert!(!toml_str.contains("mute_command"));
    }

    #[test]
    fn zero_backoff_is_clamped() {
        let cfg = SchedulerConfig {
            error_backoff_secs: 0,
            max_sleep_secs: Some(0),
        };
        assert_eq!(cfg.error_backoff(), Duration::from_secs(1));
        assert_eq!(cfg.max_sleep(), None);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.scheduler.error_backoff_secs, 60);

        let mut cfg = cfg;
        cfg.set("log.filter", "debug").unwrap();
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().log.filter, "debug");
    }
}
