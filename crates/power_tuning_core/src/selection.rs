//! Reduction of executor measurements to a single recommended power value.

use serde_json::Value;
use thiserror::Error;

use crate::contract::{
    BalancedWeight, ExtractedStats, MeasurementRecord, OptimalConfiguration, StateMachineCost,
    Strategy, ValidationError,
};
use crate::cost::{build_visualization_url, lambda_cost, CostSettings};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Wrong input {0}")]
    WrongInput(String),
    #[error(transparent)]
    UnknownStrategy(#[from] ValidationError),
    #[error("No valid measurements to select from")]
    NoValidMeasurements,
}

/// Executor output for one tuning run. Entries that were `null` or could not
/// be decoded are kept as `None` so extraction can drop them.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementBatch {
    pub records: Vec<Option<MeasurementRecord>>,
    pub strategy: Strategy,
    pub balanced_weight: BalancedWeight,
}

pub fn parse_measurements(event: &Value) -> Result<MeasurementBatch, SelectionError> {
    let entries = match event.as_array() {
        Some(entries) if !entries.is_empty() => entries,
        _ => return Err(SelectionError::WrongInput(event.to_string())),
    };

    let records: Vec<Option<MeasurementRecord>> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| decode_record(index, entry))
        .collect();

    // Run settings come from the raw first entry, even when it carries no
    // usable measurement.
    let first = &entries[0];
    let strategy = match first.get("strategy") {
        None | Some(Value::Null) => Strategy::default(),
        Some(Value::String(name)) if name.is_empty() => Strategy::default(),
        Some(Value::String(name)) => name.parse()?,
        Some(other) => {
            return Err(ValidationError::new(format!(
                "Unknown optimization strategy {other} (expected cost, speed or balanced)"
            ))
            .into())
        }
    };
    let balanced_weight = first
        .get("balancedWeight")
        .and_then(Value::as_f64)
        .map(BalancedWeight::new)
        .unwrap_or_default();

    Ok(MeasurementBatch {
        records,
        strategy,
        balanced_weight,
    })
}

fn decode_record(index: usize, entry: &Value) -> Option<MeasurementRecord> {
    if entry.is_null() {
        return None;
    }
    match serde_json::from_value(entry.clone()) {
        Ok(record) => Some(record),
        Err(error) => {
            tracing::warn!(index, error = %error, "ignoring undecodable measurement record");
            None
        }
    }
}

/// Keeps the records that carry a non-zero average duration and a price.
pub fn extract_statistics(records: &[Option<MeasurementRecord>]) -> Vec<ExtractedStats> {
    records
        .iter()
        .flatten()
        .filter_map(|record| {
            let stats = record.stats.as_ref()?;
            let duration = stats.average_duration.filter(|duration| *duration != 0.0)?;
            let cost = stats.average_price?;
            Some(ExtractedStats {
                power: record.value,
                cost,
                duration,
                total_cost: stats.total_cost.unwrap_or(0.0),
            })
        })
        .collect()
}

pub fn rank_cheapest(stats: &[ExtractedStats]) -> Vec<ExtractedStats> {
    rank_by(stats, |entry| entry.cost)
}

pub fn rank_fastest(stats: &[ExtractedStats]) -> Vec<ExtractedStats> {
    rank_by(stats, |entry| entry.duration)
}

/// Ranks by `weight * cost / max_cost + (1 - weight) * duration / max_duration`.
///
/// A term whose maximum is zero contributes nothing.
pub fn rank_balanced(stats: &[ExtractedStats], weight: BalancedWeight) -> Vec<ExtractedStats> {
    let max_cost = stats.iter().map(|entry| entry.cost).fold(0.0, f64::max);
    let max_duration = stats.iter().map(|entry| entry.duration).fold(0.0, f64::max);
    let weight = weight.as_f64();

    rank_by(stats, |entry| {
        weight * normalized(entry.cost, max_cost)
            + (1.0 - weight) * normalized(entry.duration, max_duration)
    })
}

fn normalized(value: f64, max: f64) -> f64 {
    if max == 0.0 {
        0.0
    } else {
        value / max
    }
}

fn rank_by(
    stats: &[ExtractedStats],
    key: impl Fn(&ExtractedStats) -> f64,
) -> Vec<ExtractedStats> {
    let mut ranked = stats.to_vec();
    // sort_by is stable: equal keys keep input order.
    ranked.sort_by(|left, right| key(left).total_cmp(&key(right)));
    ranked
}

pub fn rank(
    stats: &[ExtractedStats],
    strategy: Strategy,
    weight: BalancedWeight,
) -> Vec<ExtractedStats> {
    match strategy {
        Strategy::Cost => rank_cheapest(stats),
        Strategy::Speed => rank_fastest(stats),
        Strategy::Balanced => rank_balanced(stats, weight),
    }
}

pub fn select(
    records: &[Option<MeasurementRecord>],
    strategy: Strategy,
    weight: BalancedWeight,
    settings: &CostSettings,
) -> Result<OptimalConfiguration, SelectionError> {
    let stats = extract_statistics(records);
    let ranked = rank(&stats, strategy, weight);
    tracing::debug!(
        strategy = strategy.as_str(),
        balanced_weight = weight.as_f64(),
        ranking = ?ranked,
        "ranked power configurations"
    );

    let winner = ranked.first().ok_or(SelectionError::NoValidMeasurements)?;

    Ok(OptimalConfiguration {
        power: winner.power,
        cost: winner.cost,
        duration: winner.duration,
        state_machine: StateMachineCost {
            execution_cost: settings.execution_cost,
            lambda_cost: lambda_cost(&stats),
            visualization: build_visualization_url(
                &stats,
                settings.visualization_url.as_deref(),
            ),
        },
    })
}

pub fn find_optimal_configuration(
    event: &Value,
    settings: &CostSettings,
) -> Result<OptimalConfiguration, SelectionError> {
    let batch = parse_measurements(event)?;
    select(
        &batch.records,
        batch.strategy,
        batch.balanced_weight,
        settings,
    )
}
