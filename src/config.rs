use crate::domain::money::{
    BillingPolicy, CommissionRate, DEFAULT_CLASS_THRESHOLD, DEFAULT_COMMISSION_RATE,
};
use crate::error::{BillingError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub billing: BillingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Classes per cycle before the student is asked to pay.
    #[serde(default = "default_class_threshold")]
    pub class_threshold: u32,
    #[serde(default = "default_commission_rate")]
    pub commission_rate: Decimal,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            class_threshold: default_class_threshold(),
            commission_rate: default_commission_rate(),
        }
    }
}

fn default_class_threshold() -> u32 {
    DEFAULT_CLASS_THRESHOLD
}

fn default_commission_rate() -> Decimal {
    DEFAULT_COMMISSION_RATE
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads the config file, or the defaults if it doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| BillingError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.billing.policy()?;
        Ok(config)
    }
}

impl BillingConfig {
    pub fn policy(&self) -> Result<BillingPolicy> {
        BillingPolicy::new(
            CommissionRate::new(self.commission_rate)?,
            self.class_threshold,
        )
    }
}
