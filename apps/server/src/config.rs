//! Application configuration.

use rates_core::DEFAULT_ALERT_THRESHOLD;
use rates_feeds::{DEFAULT_ENDPOINT, REQUEST_TIMEOUT};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Alert threshold must be positive, got {0}")]
    NonPositiveThreshold(Decimal),
    #[error("Missing required setting: {0}")]
    Missing(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// SQLite database URL.
    pub database_url: String,
    /// Rates worker configuration.
    pub worker: WorkerSettings,
    /// Rate source configuration.
    pub source: SourceSettings,
    /// Telegram bot configuration.
    pub bot: BotSettings,
    /// Seconds to wait for the rates worker on shutdown before aborting it.
    pub shutdown_grace_secs: u64,
    /// Logging level.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://rates.sqlite3".to_string(),
            worker: WorkerSettings::default(),
            source: SourceSettings::default(),
            bot: BotSettings::default(),
            shutdown_grace_secs: 5,
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Check settings that cannot be expressed in the types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker.alert_threshold <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveThreshold(self.worker.alert_threshold));
        }
        if self.source.app_id.trim().is_empty() {
            return Err(ConfigError::Missing("rate source app id"));
        }
        if self.bot.token.trim().is_empty() {
            return Err(ConfigError::Missing("telegram bot token"));
        }
        Ok(())
    }
}

/// Rates worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSettings {
    /// Minimum relative change that triggers an alert (0.05 = 5%).
    pub alert_threshold: Decimal,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
        }
    }
}

/// Rate source settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Latest-rates endpoint.
    pub endpoint: String,
    /// API application id.
    pub app_id: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceSettings")
            .field("endpoint", &self.endpoint)
            .field("app_id", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            app_id: String::new(),
            timeout_secs: REQUEST_TIMEOUT.as_secs(),
        }
    }
}

/// Telegram bot settings.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct BotSettings {
    /// Bot API token.
    pub token: String,
    /// Telegram user allowed to use /send.
    pub owner_id: Option<u64>,
}

impl std::fmt::Debug for BotSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotSettings")
            .field("token", &"<redacted>")
            .field("owner_id", &self.owner_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn valid_config() -> AppConfig {
        AppConfig {
            source: SourceSettings {
                app_id: "app".to_string(),
                ..Default::default()
            },
            bot: BotSettings {
                token: "123:abc".to_string(),
                owner_id: Some(42),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.worker.alert_threshold, dec!(0.05));
        assert_eq!(config.source.timeout_secs, 30);
        assert_eq!(config.source.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.shutdown_grace_secs, 5);
    }

    #[test]
    fn test_validate() {
        assert_eq!(valid_config().validate(), Ok(()));

        let mut config = valid_config();
        config.worker.alert_threshold = Decimal::ZERO;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositiveThreshold(Decimal::ZERO))
        );

        let mut config = valid_config();
        config.bot.token = String::new();
        assert_eq!(config.validate(), Err(ConfigError::Missing("telegram bot token")));

        let mut config = valid_config();
        config.source.app_id = "  ".to_string();
        assert_eq!(config.validate(), Err(ConfigError::Missing("rate source app id")));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", valid_config());
        assert!(!debug.contains("123:abc"));
        assert!(debug.contains("owner_id: Some(42)"));
    }

    #[test]
    fn test_config_serialization() {
        let config = valid_config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.worker.alert_threshold, config.worker.alert_threshold);
        assert_eq!(parsed.bot.owner_id, Some(42));
    }
}
