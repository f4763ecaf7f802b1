//! Configuration for the dispatcher, loaded from TOML.
//!
//! Every section is `#[serde(default)]`, so an empty file yields the
//! production defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ReminderTemplate;

/// Largest batch the store accepts in one atomic commit.
pub const MAX_BATCH_LIMIT: usize = 500;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeraldConfig {
    pub dispatch: DispatchConfig,
    pub messages: MessageConfig,
    pub logging: LoggingConfig,
}

/// Batch pass settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Seconds between scheduled passes.
    pub interval_secs: u64,
    /// Maximum number of due notifications handled per pass.
    pub batch_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            batch_limit: 100,
        }
    }
}

impl DispatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Static message content and delivery hints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageConfig {
    pub event_channel_id: String,
    pub click_action: String,
    pub sound: String,
    pub login_channel_id: String,
    pub login_title: String,
    pub login_body: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            event_channel_id: "event_reminders".to_string(),
            click_action: "FLUTTER_NOTIFICATION_CLICK".to_string(),
            sound: "default".to_string(),
            login_channel_id: "login_notifications".to_string(),
            login_title: "Login Alert".to_string(),
            login_body: "You have successfully logged in.".to_string(),
        }
    }
}

impl MessageConfig {
    pub fn reminder_template(&self) -> ReminderTemplate {
        ReminderTemplate {
            channel_id: self.event_channel_id.clone(),
            click_action: self.click_action.clone(),
            sound: self.sound.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl HeraldConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: HeraldConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispatch.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "dispatch.interval_secs must be positive".to_string(),
            ));
        }
        if !(1..=MAX_BATCH_LIMIT).contains(&self.dispatch.batch_limit) {
            return Err(ConfigError::Invalid(format!(
                "dispatch.batch_limit must be between 1 and {MAX_BATCH_LIMIT}, got {}",
                self.dispatch.batch_limit
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn empty_file_yields_defaults() {
        let config = HeraldConfig::from_toml_str("").unwrap();
        assert_eq!(config, HeraldConfig::default());
        assert_eq!(config.dispatch.interval(), Duration::from_secs(300));
        assert_eq!(config.dispatch.batch_limit, 100);
        assert_eq!(config.messages.event_channel_id, "event_reminders");
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = HeraldConfig::from_toml_str(
            r#"
            [dispatch]
            batch_limit = 25

            [logging]
            filter = "herald_core=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.dispatch.batch_limit, 25);
        assert_eq!(config.dispatch.interval_secs, 300);
        assert_eq!(config.logging.filter, "herald_core=debug");
        assert_eq!(config.messages.login_title, "Login Alert");
    }

    #[rstest]
    #[case::zero_limit("[dispatch]\nbatch_limit = 0")]
    #[case::huge_limit("[dispatch]\nbatch_limit = 501")]
    #[case::zero_interval("[dispatch]\ninterval_secs = 0")]
    fn out_of_range_values_are_rejected(#[case] raw: &str) {
        let err = HeraldConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = HeraldConfig::from_toml_str("[dispatch\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
