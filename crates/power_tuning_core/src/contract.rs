use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ALIAS_PREFIX: &str = "RAM";
pub const MIN_MEASUREMENTS: u64 = 5;
pub const DEFAULT_BALANCED_WEIGHT: f64 = 0.5;

/// Payload handed to the initializer step by the workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InitializerEvent {
    #[serde(rename = "lambdaARN", default)]
    pub lambda_arn: String,
    #[serde(default)]
    pub num: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementStats {
    #[serde(default)]
    pub average_price: Option<f64>,
    #[serde(default)]
    pub average_duration: Option<f64>,
    #[serde(default)]
    pub total_cost: Option<f64>,
}

/// One executor result. `strategy` and `balanced_weight` are only honoured on
/// the first record of a batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementRecord {
    #[serde(alias = "power")]
    pub value: u32,
    #[serde(default)]
    pub stats: Option<MeasurementStats>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub balanced_weight: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedStats {
    pub power: u32,
    pub cost: f64,
    pub duration: f64,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Cost,
    Speed,
    Balanced,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cost => "cost",
            Self::Speed => "speed",
            Self::Balanced => "balanced",
        }
    }
}

impl FromStr for Strategy {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "cost" => Ok(Self::Cost),
            "speed" => Ok(Self::Speed),
            "balanced" => Ok(Self::Balanced),
            other => Err(ValidationError::new(format!(
                "Unknown optimization strategy '{other}' (expected cost, speed or balanced)"
            ))),
        }
    }
}

/// Trade-off between cost and duration for [`Strategy::Balanced`].
///
/// `1.0` scores purely on cost (cheapest wins), `0.0` purely on duration
/// (fastest wins). Values outside `[0, 1]` are clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalancedWeight(f64);

impl BalancedWeight {
    pub fn new(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }
}

impl Default for BalancedWeight {
    fn default() -> Self {
        Self(DEFAULT_BALANCED_WEIGHT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineCost {
    pub execution_cost: f64,
    pub lambda_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<String>,
}

/// Winning configuration as returned to the workflow.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimalConfiguration {
    pub power: u32,
    pub cost: f64,
    pub duration: f64,
    pub state_machine: StateMachineCost,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn alias_name(power: u32) -> String {
    format!("{ALIAS_PREFIX}{power}")
}
