use power_tuning_core::contract::OptimalConfiguration;
use power_tuning_core::cost::CostSettings;
use power_tuning_core::selection::{parse_measurements, select, SelectionError};
use serde_json::Value;

/// Picks the winning power configuration from the executor results.
pub fn handle_finalizer_event(
    event: &Value,
    settings: &CostSettings,
) -> Result<OptimalConfiguration, SelectionError> {
    let batch = parse_measurements(event)?;
    tracing::info!(
        records = batch.records.len(),
        strategy = batch.strategy.as_str(),
        balanced_weight = batch.balanced_weight.as_f64(),
        "selecting optimal power configuration"
    );

    let optimal = select(
        &batch.records,
        batch.strategy,
        batch.balanced_weight,
        settings,
    )?;

    tracing::info!(
        power = optimal.power,
        cost = optimal.cost,
        duration = optimal.duration,
        lambda_cost = optimal.state_machine.lambda_cost,
        "optimal power configuration selected"
    );
    Ok(optimal)
}
