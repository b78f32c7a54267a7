//! Auto-DJ configuration
//!
//! Stored as a plain `key=value` file next to the other user settings.
//! All values are fixed once the controller starts.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("{key} out of range: {reason}")]
    OutOfRange { key: &'static str, reason: &'static str },
}

/// How tempo is matched during a fade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncFade {
    /// Ease the leading deck's tempo over the first part of the fade
    #[default]
    Gradual,
    /// Sync in one step on the first beat found
    Snap,
}

impl SyncFade {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncFade::Gradual => "gradual",
            SyncFade::Snap => "snap",
        }
    }
}

/// Transition controller configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AutoDjConfig {
    /// Largest BPM difference accepted between consecutive tracks
    /// (after half/double-time matching)
    pub max_bpm_adjustment: f64,
    /// Match tempo and beat phase during fades
    pub bpm_sync: bool,
    pub sync_fade: SyncFade,
    /// Start strict and widen the BPM tolerance after repeated skips
    pub adaptive_bpm_search: bool,
    /// Shuffle the queue whenever the skip count surrenders
    pub shuffle_after_skip: bool,
    /// Skips before widening tolerance / shuffling
    pub skips_till_surrender: u32,
    /// Reject tracks whose key clashes with the playing one
    pub care_about_key: bool,
    /// Move the fading-out track to the incoming key late in the fade
    pub adjust_key: bool,
    /// Sweep the quick effect knobs along with the crossfader
    pub fade_quick_effect: bool,
    /// false: fade out to the left, in from the right
    pub reverse_quick_effect: bool,
    /// How far the quick effect knobs travel, 0.0 - 1.0
    pub fade_range: f64,
    /// Low EQ decrement per tick on the fading-out deck, 0.0 disables
    pub low_change_rate: f64,
    /// Minimum time between two track selection passes
    pub refine_duration_ms: u64,
    /// Control loop period
    pub tick_interval_ms: u64,
}

impl Default for AutoDjConfig {
    fn default() -> Self {
        Self {
            max_bpm_adjustment: 12.0,
            bpm_sync: true,
            sync_fade: SyncFade::Gradual,
            adaptive_bpm_search: false,
            shuffle_after_skip: false,
            skips_till_surrender: 24,
            care_about_key: false,
            adjust_key: false,
            fade_quick_effect: true,
            reverse_quick_effect: false,
            fade_range: 0.5,
            low_change_rate: 0.1,
            refine_duration_ms: 1000,
            tick_interval_ms: 200,
        }
    }
}

impl AutoDjConfig {
    /// Load config from the default location
    ///
    /// Returns default config if the file doesn't exist or can't be used.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load and validate config from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.serialize())?;
        Ok(())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("segue")
            .join("autodj.conf")
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Gradual tempo easing is in effect
    pub fn gradual_sync(&self) -> bool {
        self.bpm_sync && self.sync_fade == SyncFade::Gradual
    }

    /// Check value ranges and the relation between the two timings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_bpm_adjustment.is_finite() && self.max_bpm_adjustment >= 0.0) {
            return Err(ConfigError::OutOfRange {
                key: "max_bpm_adjustment",
                reason: "must be a non-negative number",
            });
        }
        if !(0.0..=1.0).contains(&self.fade_range) {
            return Err(ConfigError::OutOfRange {
                key: "fade_range",
                reason: "must be between 0.0 and 1.0",
            });
        }
        if !(0.0..=1.0).contains(&self.low_change_rate) {
            return Err(ConfigError::OutOfRange {
                key: "low_change_rate",
                reason: "must be between 0.0 and 1.0",
            });
        }
        if self.skips_till_surrender == 0 {
            return Err(ConfigError::OutOfRange {
                key: "skips_till_surrender",
                reason: "must be at least 1",
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::OutOfRange {
                key: "tick_interval_ms",
                reason: "must be at least 1",
            });
        }
        if self.tick_interval_ms > self.refine_duration_ms {
            return Err(ConfigError::OutOfRange {
                key: "tick_interval_ms",
                reason: "must not exceed refine_duration_ms",
            });
        }
        Ok(())
    }

    /// Parse config from simple key=value format
    ///
    /// Missing keys keep their defaults; unknown keys are ignored.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                tracing::warn!("Ignoring config line without '=': {}", line);
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "max_bpm_adjustment" => config.max_bpm_adjustment = parse_value(key, value)?,
                "bpm_sync" => config.bpm_sync = parse_flag(key, value)?,
                "sync_fade" => {
                    config.sync_fade = match value {
                        "gradual" => SyncFade::Gradual,
                        "snap" => SyncFade::Snap,
                        _ => return Err(invalid(key, value)),
                    }
                }
                "adaptive_bpm_search" => config.adaptive_bpm_search = parse_flag(key, value)?,
                "shuffle_after_skip" => config.shuffle_after_skip = parse_flag(key, value)?,
                "skips_till_surrender" => config.skips_till_surrender = parse_value(key, value)?,
                "care_about_key" => config.care_about_key = parse_flag(key, value)?,
                "adjust_key" => config.adjust_key = parse_flag(key, value)?,
                "fade_quick_effect" => config.fade_quick_effect = parse_flag(key, value)?,
                "reverse_quick_effect" => config.reverse_quick_effect = parse_flag(key, value)?,
                "fade_range" => config.fade_range = parse_value(key, value)?,
                "low_change_rate" => config.low_change_rate = parse_value(key, value)?,
                "refine_duration_ms" => config.refine_duration_ms = parse_value(key, value)?,
                "tick_interval_ms" => config.tick_interval_ms = parse_value(key, value)?,
                _ => tracing::warn!("Unknown config key: {}", key),
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        let lines = [
            "# Segue auto-DJ configuration".to_string(),
            format!("max_bpm_adjustment={}", self.max_bpm_adjustment),
            format!("bpm_sync={}", self.bpm_sync),
            format!("sync_fade={}", self.sync_fade.as_str()),
            format!("adaptive_bpm_search={}", self.adaptive_bpm_search),
            format!("shuffle_after_skip={}", self.shuffle_after_skip),
            format!("skips_till_surrender={}", self.skips_till_surrender),
            format!("care_about_key={}", self.care_about_key),
            format!("adjust_key={}", self.adjust_key),
            format!("fade_quick_effect={}", self.fade_quick_effect),
            format!("reverse_quick_effect={}", self.reverse_quick_effect),
            format!("fade_range={}", self.fade_range),
            format!("low_change_rate={}", self.low_change_rate),
            format!("refine_duration_ms={}", self.refine_duration_ms),
            format!("tick_interval_ms={}", self.tick_interval_ms),
        ];
        lines.join("\n")
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| invalid(key, value))
}

/// Accepts true/false and the 1/0 spelling
fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let config = AutoDjConfig::parse("").unwrap();
        assert_eq!(config, AutoDjConfig::default());
    }

    #[test]
    fn test_parse_with_comments_and_unknown_keys() {
        let content = "# Comment\nmax_bpm_adjustment=8\nfavourite_colour=teal\n# Another";
        let config = AutoDjConfig::parse(content).unwrap();
        assert_eq!(config.max_bpm_adjustment, 8.0);
    }

    #[test]
    fn test_parse_flags_and_sync_fade() {
        let content = "bpm_sync=0\nsync_fade=snap\ncare_about_key=1\nadjust_key=true";
        let config = AutoDjConfig::parse(content).unwrap();
        assert!(!config.bpm_sync);
        assert_eq!(config.sync_fade, SyncFade::Snap);
        assert!(config.care_about_key);
        assert!(config.adjust_key);
        assert!(!config.gradual_sync());
    }

    #[test]
    fn test_parse_invalid_value() {
        let err = AutoDjConfig::parse("fade_range=lots").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "fade_range"));

        let err = AutoDjConfig::parse("sync_fade=sideways").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_ranges() {
        assert!(AutoDjConfig::parse("fade_range=1.5").is_err());
        assert!(AutoDjConfig::parse("low_change_rate=-0.1").is_err());
        assert!(AutoDjConfig::parse("skips_till_surrender=0").is_err());
        assert!(AutoDjConfig::parse("max_bpm_adjustment=-1").is_err());
    }

    #[test]
    fn test_tick_must_not_exceed_refine_duration() {
        let err = AutoDjConfig::parse("tick_interval_ms=500\nrefine_duration_ms=400").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::OutOfRange {
                key: "tick_interval_ms",
                ..
            }
        ));
        assert!(AutoDjConfig::parse("tick_interval_ms=400\nrefine_duration_ms=400").is_ok());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = AutoDjConfig {
            max_bpm_adjustment: 9.5,
            sync_fade: SyncFade::Snap,
            adaptive_bpm_search: true,
            skips_till_surrender: 3,
            fade_range: 0.25,
            ..AutoDjConfig::default()
        };

        let parsed = AutoDjConfig::parse(&config.serialize()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("segue-config-test-{}", std::process::id()))
            .join("autodj.conf");
        let config = AutoDjConfig {
            care_about_key: true,
            ..AutoDjConfig::default()
        };

        config.save_to(&path).unwrap();
        let loaded = AutoDjConfig::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
