use lambda_runtime::{service_fn, Error, LambdaEvent};
use power_tuning_core::contract::OptimalConfiguration;
use power_tuning_lambda::config::FinalizerConfig;
use power_tuning_lambda::handlers::finalizer::handle_finalizer_event;
use power_tuning_lambda::telemetry::init_tracing;
use serde_json::Value;

async fn handle_request(
    event: LambdaEvent<Value>,
    config: &FinalizerConfig,
) -> Result<OptimalConfiguration, Error> {
    let optimal = handle_finalizer_event(&event.payload, &config.cost_settings)?;
    Ok(optimal)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = FinalizerConfig::from_env()?;
    let config = &config;

    lambda_runtime::run(service_fn(move |event| handle_request(event, config))).await
}
