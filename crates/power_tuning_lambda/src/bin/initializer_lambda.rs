use lambda_runtime::{service_fn, Error, LambdaEvent};
use power_tuning_lambda::adapters::lambda_control_plane::AwsLambdaControlPlane;
use power_tuning_lambda::config::InitializerConfig;
use power_tuning_lambda::handlers::initializer::handle_initializer_event;
use power_tuning_lambda::telemetry::init_tracing;
use serde_json::Value;

struct RuntimeDependencies {
    config: InitializerConfig,
    control_plane: AwsLambdaControlPlane,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    deps: &RuntimeDependencies,
) -> Result<String, Error> {
    let response = handle_initializer_event(
        event.payload,
        &deps.config.power_values,
        &deps.control_plane,
    )?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let config = InitializerConfig::from_env()?;
    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let deps = RuntimeDependencies {
        config,
        control_plane: AwsLambdaControlPlane::new(aws_sdk_lambda::Client::new(&aws_config)),
    };
    let deps = &deps;

    lambda_runtime::run(service_fn(move |event| handle_request(event, deps))).await
}
