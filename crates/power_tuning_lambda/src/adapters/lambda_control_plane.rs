use std::future::Future;
use std::time::Duration;

use aws_sdk_lambda::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_lambda::types::LastUpdateStatus;
use power_tuning_core::provisioning::{FunctionControlPlane, ProviderError};

const UPDATE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// [`FunctionControlPlane`] backed by the Lambda API.
///
/// Must be used from within a multi-threaded tokio runtime.
pub struct AwsLambdaControlPlane {
    lambda_client: aws_sdk_lambda::Client,
}

impl AwsLambdaControlPlane {
    pub fn new(lambda_client: aws_sdk_lambda::Client) -> Self {
        Self { lambda_client }
    }

    async fn wait_for_update(&self, function_id: &str) -> Result<(), ProviderError> {
        loop {
            let configuration = self
                .lambda_client
                .get_function_configuration()
                .function_name(function_id)
                .send()
                .await
                .map_err(|error| other("failed to read function configuration", error))?;

            match configuration.last_update_status() {
                Some(LastUpdateStatus::InProgress) => {
                    tracing::debug!(function_id, "waiting for function update to complete");
                    tokio::time::sleep(UPDATE_POLL_INTERVAL).await;
                }
                Some(LastUpdateStatus::Failed) => {
                    return Err(ProviderError::Other(format!(
                        "function update failed: {}",
                        configuration
                            .last_update_status_reason()
                            .unwrap_or("no reason reported")
                    )));
                }
                _ => return Ok(()),
            }
        }
    }
}

impl FunctionControlPlane for AwsLambdaControlPlane {
    fn check_alias_exists(&self, function_id: &str, alias: &str) -> Result<(), ProviderError> {
        block_on(async {
            match self
                .lambda_client
                .get_alias()
                .function_name(function_id)
                .name(alias)
                .send()
                .await
            {
                Ok(_) => Ok(()),
                Err(error)
                    if error
                        .as_service_error()
                        .is_some_and(|service| service.is_resource_not_found_exception()) =>
                {
                    Err(ProviderError::NotFound(error_message(&error)))
                }
                Err(error) => Err(other("failed to read alias", error)),
            }
        })
    }

    fn set_power(&self, function_id: &str, power: u32) -> Result<(), ProviderError> {
        let memory_size = i32::try_from(power)
            .map_err(|_| ProviderError::Other(format!("memory size {power} is out of range")))?;
        block_on(async {
            self.lambda_client
                .update_function_configuration()
                .function_name(function_id)
                .memory_size(memory_size)
                .send()
                .await
                .map_err(|error| other("failed to update function configuration", error))?;
            self.wait_for_update(function_id).await
        })
    }

    fn publish_version(&self, function_id: &str) -> Result<String, ProviderError> {
        block_on(async {
            let output = self
                .lambda_client
                .publish_version()
                .function_name(function_id)
                .send()
                .await
                .map_err(|error| other("failed to publish version", error))?;
            output.version().map(str::to_string).ok_or_else(|| {
                ProviderError::Other("published version has no version identifier".to_string())
            })
        })
    }

    fn create_alias(
        &self,
        function_id: &str,
        alias: &str,
        version: &str,
    ) -> Result<(), ProviderError> {
        block_on(async {
            match self
                .lambda_client
                .create_alias()
                .function_name(function_id)
                .name(alias)
                .function_version(version)
                .send()
                .await
            {
                Ok(_) => Ok(()),
                Err(error) if is_alias_conflict(&error) => {
                    Err(ProviderError::AlreadyExists(error_message(&error)))
                }
                Err(error) => Err(other("failed to create alias", error)),
            }
        })
    }

    fn update_alias(
        &self,
        function_id: &str,
        alias: &str,
        version: &str,
    ) -> Result<(), ProviderError> {
        block_on(async {
            self.lambda_client
                .update_alias()
                .function_name(function_id)
                .name(alias)
                .function_version(version)
                .send()
                .await
                .map(|_| ())
                .map_err(|error| other("failed to update alias", error))
        })
    }
}

fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn is_alias_conflict(
    error: &SdkError<aws_sdk_lambda::operation::create_alias::CreateAliasError>,
) -> bool {
    error.as_service_error().is_some_and(|service| {
        service.is_resource_conflict_exception()
            && service
                .message()
                .is_some_and(|message| message.contains("already exists"))
    })
}

fn error_message<E, R>(error: &SdkError<E, R>) -> String
where
    E: ProvideErrorMetadata,
{
    error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| error.code().unwrap_or("unknown error").to_string())
}

fn other<E>(context: &str, error: E) -> ProviderError
where
    E: std::error::Error,
{
    ProviderError::Other(format!("{context}: {}", DisplayErrorContext(&error)))
}
