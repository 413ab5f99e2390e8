//! TOML-based application configuration.
//!
//! Stores:
//! - Work and break durations (the two user-facing tunables)
//! - Auto-start delay and completion alert
//! - Break suggestion provider credentials and endpoints
//!
//! Configuration is stored at `~/.config/rhythm/config.toml`.
//! `GEMINI_API_KEY` and `ARCADE_API_KEY` in the environment take precedence
//! over the keys in the file.

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{ConfigurationError, CoreError, ValidationError};

/// Allowed work duration when set by the user, in minutes.
pub const WORK_MINUTES_RANGE: RangeInclusive<u32> = 1..=60;
/// Allowed break duration when set by the user, in minutes.
pub const BREAK_MINUTES_RANGE: RangeInclusive<u32> = 1..=30;

const PLACEHOLDER_CREDENTIALS: [&str; 3] = [
    "your_api_key_here",
    "your_gemini_api_key_here",
    "your_arcade_api_key_here",
];

/// True for keys that are empty or still the template placeholder.
pub fn is_placeholder_credential(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || PLACEHOLDER_CREDENTIALS.contains(&key)
}

/// Timer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_work_minutes")]
    pub work_minutes: f64,
    #[serde(default = "default_break_minutes")]
    pub break_minutes: f64,
    /// Pause between a completed phase and the automatic start of the next.
    #[serde(default = "default_auto_start_delay_ms")]
    pub auto_start_delay_ms: u64,
    /// Fire the completion alert when a phase ends.
    #[serde(default = "default_true")]
    pub alert: bool,
}

/// Break suggestion provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Ceiling for each external suggestion call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Probability of trying a video first on breaks of 5+ minutes.
    #[serde(default = "default_video_chance")]
    pub video_chance: f64,
    #[serde(default)]
    pub gemini_api_key: String,
    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,
    #[serde(default)]
    pub arcade_api_key: String,
    #[serde(default = "default_arcade_base_url")]
    pub arcade_base_url: String,
    #[serde(default = "default_arcade_user_id")]
    pub arcade_user_id: String,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/rhythm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub timer: TimerConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

// Default functions
fn default_work_minutes() -> f64 {
    25.0
}
fn default_break_minutes() -> f64 {
    5.0
}
fn default_auto_start_delay_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_video_chance() -> f64 {
    0.5
}
fn default_gemini_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_arcade_base_url() -> String {
    "https://api.arcade.dev".into()
}
fn default_arcade_user_id() -> String {
    "rhythm".into()
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: default_work_minutes(),
            break_minutes: default_break_minutes(),
            auto_start_delay_ms: default_auto_start_delay_ms(),
            alert: true,
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            video_chance: default_video_chance(),
            gemini_api_key: String::new(),
            gemini_model: default_gemini_model(),
            gemini_base_url: default_gemini_base_url(),
            arcade_api_key: String::new(),
            arcade_base_url: default_arcade_base_url(),
            arcade_user_id: default_arcade_user_id(),
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Gemini key, environment first.
    pub fn gemini_key(&self) -> String {
        std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| self.gemini_api_key.clone())
    }

    /// Arcade key, environment first.
    pub fn arcade_key(&self) -> String {
        std::env::var("ARCADE_API_KEY").unwrap_or_else(|_| self.arcade_api_key.clone())
    }
}

/// Check a work/break pair against the user-facing bounds.
pub(crate) fn validate_durations(work: f64, brk: f64) -> Result<(), ValidationError> {
    check_range("work", work, &WORK_MINUTES_RANGE)?;
    check_range("break", brk, &BREAK_MINUTES_RANGE)
}

/// Looser check for values read from the file: fractional testing
/// durations are fine as long as they can drive a countdown.
fn check_loaded(cfg: &Config) -> Result<(), ConfigurationError> {
    let invalid = |key: &str, message: &str| ConfigurationError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    };
    for (key, minutes) in [
        ("timer.work_minutes", cfg.timer.work_minutes),
        ("timer.break_minutes", cfg.timer.break_minutes),
    ] {
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(invalid(key, "must be a positive number of minutes"));
        }
    }
    let chance = cfg.providers.video_chance;
    if !(0.0..=1.0).contains(&chance) {
        return Err(invalid("providers.video_chance", "must be between 0 and 1"));
    }
    Ok(())
}

fn check_range(field: &str, value: f64, range: &RangeInclusive<u32>) -> Result<(), ValidationError> {
    let (min, max) = (f64::from(*range.start()), f64::from(*range.end()));
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        })
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
    ) -> Result<(), ConfigurationError> {
        let unknown = || ConfigurationError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigurationError::InvalidValue {
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
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
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

    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and write) the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigurationError::LoadFailed {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                check_loaded(&cfg)?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigurationError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
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
    /// A duration being set is checked against the same bounds as the
    /// settings screen; a rejected value leaves the config untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting durations are out of range.
    pub fn apply(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json)?;
        match key {
            "timer.work_minutes" => check_range("work", updated.timer.work_minutes, &WORK_MINUTES_RANGE)?,
            "timer.break_minutes" => check_range("break", updated.timer.break_minutes, &BREAK_MINUTES_RANGE)?,
            _ => {}
        }
        check_loaded(&updated)?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        self.apply(key, value)?;
        self.save()
    }
}
