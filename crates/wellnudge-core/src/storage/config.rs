//! TOML-based engine configuration.
//!
//! Stores scheduling tunables:
//! - Delays for immediate notifications and snoozes
//! - Fallback offset when nothing is known about the user
//! - Presentation thresholds
//!
//! Configuration is stored at `~/.config/wellnudge/config.toml`. User
//! preferences (categories, preferred times, quiet windows) live in the
//! database instead.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;

/// Timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulingConfig {
    /// Delay before achievements, streaks and health alerts fire.
    #[serde(default = "default_immediate_delay_secs")]
    pub immediate_delay_secs: u64,
    #[serde(default = "default_snooze_minutes")]
    pub snooze_minutes: u32,
    /// Used when neither history nor a preferred time is available.
    #[serde(default = "default_fallback_offset_minutes")]
    pub fallback_offset_minutes: u32,
    /// How long before a planned audio session its reminder fires.
    #[serde(default = "default_session_lead_minutes")]
    pub session_lead_minutes: u32,
}

/// Foreground presentation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Recommendations at or above this priority get full presentation.
    #[serde(default = "default_recommendation_full_priority")]
    pub recommendation_full_priority: u8,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/wellnudge/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduling: SchedulingConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

fn default_immediate_delay_secs() -> u64 {
    1
}
fn default_snooze_minutes() -> u32 {
    15
}
fn default_fallback_offset_minutes() -> u32 {
    60
}
fn default_session_lead_minutes() -> u32 {
    5
}
fn default_recommendation_full_priority() -> u8 {
    3
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            immediate_delay_secs: default_immediate_delay_secs(),
            snooze_minutes: default_snooze_minutes(),
            fallback_offset_minutes: default_fallback_offset_minutes(),
            session_lead_minutes: default_session_lead_minutes(),
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            recommendation_full_priority: default_recommendation_full_priority(),
        }
    }
}

/// Upper bounds for the scheduling tunables.
const MAX_IMMEDIATE_DELAY_SECS: u64 = 24 * 60 * 60;
const MAX_SNOOZE_MINUTES: u32 = 24 * 60;
const MAX_FALLBACK_OFFSET_MINUTES: u32 = 7 * 24 * 60;
const MAX_SESSION_LEAD_MINUTES: u32 = 24 * 60;

impl SchedulingConfig {
    /// Reject values outside the supported ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |key: &str, value: u64, max: u64| {
            if value > max {
                Err(ConfigError::InvalidValue {
                    key: format!("scheduling.{key}"),
                    message: format!("{value} exceeds the maximum of {max}"),
                })
            } else {
                Ok(())
            }
        };
        check("immediate_delay_secs", self.immediate_delay_secs, MAX_IMMEDIATE_DELAY_SECS)?;
        check("snooze_minutes", self.snooze_minutes.into(), MAX_SNOOZE_MINUTES.into())?;
        check(
            "fallback_offset_minutes",
            self.fallback_offset_minutes.into(),
            MAX_FALLBACK_OFFSET_MINUTES.into(),
        )?;
        check(
            "session_lead_minutes",
            self.session_lead_minutes.into(),
            MAX_SESSION_LEAD_MINUTES.into(),
        )
    }

    pub fn immediate_delay(&self) -> Duration {
        let secs = self.immediate_delay_secs.min(MAX_IMMEDIATE_DELAY_SECS);
        Duration::seconds(i64::try_from(secs).unwrap_or_default())
    }

    pub fn snooze(&self) -> Duration {
        Duration::minutes(i64::from(self.snooze_minutes))
    }

    pub fn fallback_offset(&self) -> Duration {
        Duration::minutes(i64::from(self.fallback_offset_minutes))
    }

    pub fn session_lead(&self) -> Duration {
        Duration::minutes(i64::from(self.session_lead_minutes))
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
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".to_string(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        let n = value
                            .parse::<u64>()
                            .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?;
                        serde_json::Value::Number(n.into())
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/wellnudge"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from the default location, writing defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Self =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                cfg.scheduling.validate()?;
                Ok(cfg)
            }
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

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.scheduling.validate()?;
        *self = updated;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default configuration");
            Self::default()
        })
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
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.scheduling.snooze_minutes, 15);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str("[scheduling]\nsnooze_minutes = 5\n").unwrap();
        assert_eq!(parsed.scheduling.snooze_minutes, 5);
        assert_eq!(parsed.scheduling.fallback_offset_minutes, 60);
        assert_eq!(parsed.presentation.recommendation_full_priority, 3);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduling.snooze_minutes").as_deref(), Some("15"));
        assert!(cfg.get("scheduling.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_number() {
        let mut cfg = Config::default();
        cfg.set("scheduling.immediate_delay_secs", "3").unwrap();
        assert_eq!(cfg.scheduling.immediate_delay_secs, 3);
        assert_eq!(cfg.scheduling.immediate_delay(), Duration::seconds(3));
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_value() {
        let mut cfg = Config::default();
        assert!(cfg.set("scheduling.nonexistent", "1").is_err());
        assert!(cfg.set("scheduling.snooze_minutes", "soon").is_err());
        assert!(cfg.set("presentation.recommendation_full_priority", "300").is_err());
    }

    #[test]
    fn set_rejects_out_of_range_delays() {
        let mut cfg = Config::default();
        let err = cfg
            .set("scheduling.immediate_delay_secs", "10000000000000")
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "scheduling.immediate_delay_secs"));
        assert_eq!(cfg.scheduling.immediate_delay_secs, 1);
        assert!(cfg.set("scheduling.snooze_minutes", "1441").is_err());
        assert!(cfg.set("scheduling.snooze_minutes", "1440").is_ok());
    }

    #[test]
    fn load_from_rejects_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[scheduling]\nfallback_offset_minutes = 99999999\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());

        let mut changed = cfg.clone();
        changed.set("scheduling.snooze_minutes", "30").unwrap();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().scheduling.snooze_minutes, 30);
    }
}
