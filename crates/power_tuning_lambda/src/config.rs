//! Environment configuration resolved once per cold start.

use std::collections::BTreeSet;

use power_tuning_core::cost::{CostSettings, DEFAULT_STATE_MACHINE_EXECUTION_COST};
use thiserror::Error;

pub const POWER_VALUES_ENV: &str = "POWER_VALUES";
pub const VISUALIZATION_URL_ENV: &str = "VISUALIZATION_URL";
pub const EXECUTION_COST_ENV: &str = "STATE_MACHINE_EXECUTION_COST";

pub const MIN_POWER_MB: u32 = 128;
pub const MAX_POWER_MB: u32 = 10_240;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must be configured")]
    Missing { key: &'static str },
    #[error("{key} is invalid: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerConfig {
    pub power_values: Vec<u32>,
}

impl InitializerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = lookup(POWER_VALUES_ENV).ok_or(ConfigError::Missing {
            key: POWER_VALUES_ENV,
        })?;
        Ok(Self {
            power_values: parse_power_values(&raw)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FinalizerConfig {
    pub cost_settings: CostSettings,
}

impl FinalizerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let visualization_url = lookup(VISUALIZATION_URL_ENV)
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        let execution_cost = match lookup(EXECUTION_COST_ENV) {
            Some(raw) => parse_execution_cost(&raw)?,
            None => DEFAULT_STATE_MACHINE_EXECUTION_COST,
        };

        Ok(Self {
            cost_settings: CostSettings {
                execution_cost,
                visualization_url,
            },
        })
    }
}

/// Parses an ordered, comma-separated list of memory sizes in MB.
pub fn parse_power_values(raw: &str) -> Result<Vec<u32>, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        key: POWER_VALUES_ENV,
        message,
    };

    if raw.trim().is_empty() {
        return Err(invalid("list is empty".to_string()));
    }

    let mut seen = BTreeSet::new();
    let mut values = Vec::new();
    for item in raw.split(',') {
        let item = item.trim();
        if item.is_empty() {
            return Err(invalid("list contains an empty entry".to_string()));
        }
        let value: u32 = item
            .parse()
            .map_err(|error| invalid(format!("'{item}' is not a positive integer ({error})")))?;
        if !(MIN_POWER_MB..=MAX_POWER_MB).contains(&value) {
            return Err(invalid(format!(
                "{value} is outside the supported range {MIN_POWER_MB}..={MAX_POWER_MB}"
            )));
        }
        if !seen.insert(value) {
            return Err(invalid(format!("{value} is listed more than once")));
        }
        values.push(value);
    }

    Ok(values)
}

fn parse_execution_cost(raw: &str) -> Result<f64, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        key: EXECUTION_COST_ENV,
        message,
    };
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|error| invalid(format!("'{raw}' is not a number ({error})")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(invalid(format!("{value} must be a non-negative number")));
    }
    Ok(value)
}
