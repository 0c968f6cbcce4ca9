use power_tuning_core::contract::{InitializerEvent, ValidationError};
use power_tuning_core::provisioning::{provision, FunctionControlPlane, ProvisionError};
use serde_json::Value;

pub const INITIALIZER_OK: &str = "OK";

/// Provisions one alias per configured power value for the function named in
/// the event and returns `"OK"` once every alias is in place.
pub fn handle_initializer_event(
    event: Value,
    power_values: &[u32],
    control_plane: &dyn FunctionControlPlane,
) -> Result<String, ProvisionError> {
    let request: InitializerEvent = serde_json::from_value(event)
        .map_err(|error| ValidationError::new(format!("Malformed initializer event: {error}")))?;

    tracing::info!(
        lambda_arn = %request.lambda_arn,
        num = request.num,
        power_values = ?power_values,
        "initializing power configurations"
    );

    let summary = provision(control_plane, &request, power_values)?;

    tracing::info!(
        lambda_arn = %request.lambda_arn,
        aliases = summary.outcomes.len(),
        "power configurations ready"
    );
    Ok(INITIALIZER_OK.to_string())
}
