use config::{Config, Environment, File};
use serde::Deserialize;
use std::env;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Number of lock shards per index; power of two greater than one
    #[serde(default = "default_shard_amount")]
    pub shard_amount: usize,
    /// Pre-allocated capacity per index
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,
}

fn default_shard_amount() -> usize {
    64
}

fn default_initial_capacity() -> usize {
    1024
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Timeout for a single send to one connection, in milliseconds
    #[serde(default = "default_send_timeout_ms")]
    pub send_timeout_ms: u64,
    /// Maximum sends in flight per fan-out batch
    #[serde(default = "default_max_concurrent_sends")]
    pub max_concurrent_sends: usize,
}

fn default_send_timeout_ms() -> u64 {
    5000
}

fn default_max_concurrent_sends() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiagnosticsConfig {
    /// Seconds between registry dumps; 0 disables the task
    #[serde(default = "default_diagnostics_interval")]
    pub interval_secs: u64,
}

fn default_diagnostics_interval() -> u64 {
    60 // 1 minute
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            .set_default("registry.shard_amount", default_shard_amount() as u64)?
            .set_default("registry.initial_capacity", default_initial_capacity() as u64)?
            .set_default("delivery.send_timeout_ms", default_send_timeout_ms())?
            .set_default("delivery.max_concurrent_sends", default_max_concurrent_sends() as u64)?
            .set_default("diagnostics.interval_secs", default_diagnostics_interval())?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.format", "pretty")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // CHAT_REGISTRY__SHARD_AMOUNT, CHAT_LOGGING__FORMAT, etc.
            .add_source(
                Environment::with_prefix("CHAT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let shards = self.registry.shard_amount;
        if shards < 2 || !shards.is_power_of_two() {
            return Err(AppError::InvalidConfig(format!(
                "registry.shard_amount must be a power of two greater than 1, got {}",
                shards
            )));
        }
        if self.delivery.max_concurrent_sends == 0 {
            return Err(AppError::InvalidConfig(
                "delivery.max_concurrent_sends must be greater than 0".to_string(),
            ));
        }
        if self.delivery.send_timeout_ms == 0 {
            return Err(AppError::InvalidConfig(
                "delivery.send_timeout_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            shard_amount: default_shard_amount(),
            initial_capacity: default_initial_capacity(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            send_timeout_ms: default_send_timeout_ms(),
            max_concurrent_sends: default_max_concurrent_sends(),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_diagnostics_interval(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let settings = Settings::default();
        assert_eq!(settings.registry.shard_amount, 64);
        assert_eq!(settings.registry.initial_capacity, 1024);
        assert_eq!(settings.delivery.send_timeout_ms, 5000);
        assert_eq!(settings.diagnostics.interval_secs, 60);
        assert_eq!(settings.logging.format, LogFormat::Pretty);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_shard_amount() {
        let mut settings = Settings::default();
        settings.registry.shard_amount = 48;
        assert!(matches!(settings.validate(), Err(AppError::InvalidConfig(_))));

        settings.registry.shard_amount = 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let mut settings = Settings::default();
        settings.delivery.max_concurrent_sends = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_sources() {
        let settings: Settings = Config::builder()
            .set_override("registry.shard_amount", 8)
            .unwrap()
            .set_override("logging.format", "json")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.registry.shard_amount, 8);
        assert_eq!(settings.registry.initial_capacity, 1024);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.delivery.max_concurrent_sends, 256);
    }
}
