//! Idempotent provisioning of one `RAM<power>` alias per power value.

use thiserror::Error;

use crate::contract::{alias_name, InitializerEvent, ValidationError, MIN_MEASUREMENTS};

/// Failure reported by the provider's control plane.
///
/// `NotFound` and `AlreadyExists` are expected outcomes for some calls; the
/// adapter is responsible for classifying provider errors into these kinds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("resource already exists: {0}")]
    AlreadyExists(String),
    #[error("{0}")]
    Other(String),
}

/// Configuration and alias API of the function being tuned.
///
/// Calls mutate the same function, and the provider rejects concurrent
/// configuration updates on it. Callers must issue them one at a time.
pub trait FunctionControlPlane {
    fn check_alias_exists(&self, function_id: &str, alias: &str) -> Result<(), ProviderError>;
    fn set_power(&self, function_id: &str, power: u32) -> Result<(), ProviderError>;
    fn publish_version(&self, function_id: &str) -> Result<String, ProviderError>;
    fn create_alias(
        &self,
        function_id: &str,
        alias: &str,
        version: &str,
    ) -> Result<(), ProviderError>;
    fn update_alias(
        &self,
        function_id: &str,
        alias: &str,
        version: &str,
    ) -> Result<(), ProviderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    SetPower,
    PublishVersion,
    CreateAlias,
    UpdateAlias,
}

impl ProvisionStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SetPower => "set_power",
            Self::PublishVersion => "publish_version",
            Self::CreateAlias => "create_alias",
            Self::UpdateAlias => "update_alias",
        }
    }
}

impl std::fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("error during alias check for {alias}: {source}")]
    AliasCheck {
        alias: String,
        #[source]
        source: ProviderError,
    },
    #[error("error during initialization for value {power} ({alias}) at {step}: {source}")]
    Configuration {
        power: u32,
        alias: String,
        step: ProvisionStep,
        #[source]
        source: ProviderError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasAction {
    Created,
    Updated,
    /// Creation raced with an alias that appeared after the existence check.
    CreateSkippedAlreadyExists,
}

impl AliasAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::CreateSkippedAlreadyExists => "create_skipped_already_exists",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasOutcome {
    pub power: u32,
    pub alias: String,
    pub version: String,
    pub action: AliasAction,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionSummary {
    pub outcomes: Vec<AliasOutcome>,
}

pub fn validate_request(
    request: &InitializerEvent,
    power_values: &[u32],
) -> Result<(), ValidationError> {
    if request.lambda_arn.trim().is_empty() {
        return Err(ValidationError::new("Missing or empty lambdaARN"));
    }
    if power_values.is_empty() {
        return Err(ValidationError::new("Missing or empty power values"));
    }
    match request.num {
        Some(num) if num >= MIN_MEASUREMENTS => Ok(()),
        _ => Err(ValidationError::new(format!(
            "Missing num or num below {MIN_MEASUREMENTS}"
        ))),
    }
}

/// Points a `RAM<power>` alias at a freshly published version for every
/// power value, in order.
///
/// Values are processed strictly one after another: the alias for value `i`
/// is settled before value `i + 1` is inspected. The first fatal provider
/// error aborts the run; work already done is kept, and a rerun resumes by
/// updating the aliases that now exist.
pub fn provision(
    control_plane: &dyn FunctionControlPlane,
    request: &InitializerEvent,
    power_values: &[u32],
) -> Result<ProvisionSummary, ProvisionError> {
    validate_request(request, power_values)?;

    let function_id = request.lambda_arn.trim();
    let mut summary = ProvisionSummary {
        outcomes: Vec::with_capacity(power_values.len()),
    };

    for &power in power_values {
        let alias = alias_name(power);
        let alias_exists = alias_exists(control_plane, function_id, &alias)?;
        let outcome = configure_power(control_plane, function_id, power, alias, alias_exists)?;
        tracing::info!(
            power = outcome.power,
            alias = %outcome.alias,
            version = %outcome.version,
            action = outcome.action.as_str(),
            "power configuration provisioned"
        );
        summary.outcomes.push(outcome);
    }

    Ok(summary)
}

fn alias_exists(
    control_plane: &dyn FunctionControlPlane,
    function_id: &str,
    alias: &str,
) -> Result<bool, ProvisionError> {
    match control_plane.check_alias_exists(function_id, alias) {
        Ok(()) => Ok(true),
        Err(ProviderError::NotFound(_)) => {
            tracing::debug!(alias, "alias missing, it will be created");
            Ok(false)
        }
        Err(source) => {
            tracing::error!(alias, error = %source, "error during alias check");
            Err(ProvisionError::AliasCheck {
                alias: alias.to_string(),
                source,
            })
        }
    }
}

fn configure_power(
    control_plane: &dyn FunctionControlPlane,
    function_id: &str,
    power: u32,
    alias: String,
    alias_exists: bool,
) -> Result<AliasOutcome, ProvisionError> {
    let fail = |step: ProvisionStep, alias: &str, source: ProviderError| {
        tracing::error!(power, alias, step = step.as_str(), error = %source, "error during initialization");
        ProvisionError::Configuration {
            power,
            alias: alias.to_string(),
            step,
            source,
        }
    };

    control_plane
        .set_power(function_id, power)
        .map_err(|source| fail(ProvisionStep::SetPower, &alias, source))?;
    let version = control_plane
        .publish_version(function_id)
        .map_err(|source| fail(ProvisionStep::PublishVersion, &alias, source))?;

    let action = if alias_exists {
        control_plane
            .update_alias(function_id, &alias, &version)
            .map_err(|source| fail(ProvisionStep::UpdateAlias, &alias, source))?;
        AliasAction::Updated
    } else {
        match control_plane.create_alias(function_id, &alias, &version) {
            Ok(()) => AliasAction::Created,
            Err(ProviderError::AlreadyExists(detail)) => {
                tracing::warn!(alias = %alias, detail = %detail, "alias already exists, continuing");
                AliasAction::CreateSkippedAlreadyExists
            }
            Err(source) => return Err(fail(ProvisionStep::CreateAlias, &alias, source)),
        }
    };

    Ok(AliasOutcome {
        power,
        alias,
        version,
        action,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeState {
        memory: u32,
        versions: Vec<u32>,
        aliases: BTreeMap<String, String>,
        calls: Vec<String>,
    }

    /// In-memory function with scripted failures keyed by call label.
    #[derive(Default)]
    struct FakeControlPlane {
        state: Mutex<FakeState>,
        failures: BTreeMap<String, ProviderError>,
    }

    impl FakeControlPlane {
        fn with_aliases(aliases: &[(&str, &str)]) -> Self {
            let plane = Self::default();
            {
                let mut state = plane.state.lock().expect("poisoned mutex");
                for (alias, version) in aliases {
                    state
                        .aliases
                        .insert((*alias).to_string(), (*version).to_string());
                }
                state.versions.push(0);
            }
            plane
        }

        fn failing(mut self, call: &str, error: ProviderError) -> Self {
            self.failures.insert(call.to_string(), error);
            self
        }

        fn record(&self, call: String) -> Result<(), ProviderError> {
            self.state
                .lock()
                .expect("poisoned mutex")
                .calls
                .push(call.clone());
            match self.failures.get(&call) {
                Some(error) => Err(error.clone()),
                None => Ok(()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.state.lock().expect("poisoned mutex").calls.clone()
        }

        fn alias_target(&self, alias: &str) -> Option<u32> {
            let state = self.state.lock().expect("poisoned mutex");
            let version: usize = state.aliases.get(alias)?.parse().ok()?;
            state.versions.get(version).copied()
        }
    }

    impl FunctionControlPlane for FakeControlPlane {
        fn check_alias_exists(&self, _function_id: &str, alias: &str) -> Result<(), ProviderError> {
            self.record(format!("check:{alias}"))?;
            if self
                .state
                .lock()
                .expect("poisoned mutex")
                .aliases
                .contains_key(alias)
            {
                Ok(())
            } else {
                Err(ProviderError::NotFound(format!("Alias not found: {alias}")))
            }
        }

        fn set_power(&self, _function_id: &str, power: u32) -> Result<(), ProviderError> {
            self.record(format!("set_power:{power}"))?;
            self.state.lock().expect("poisoned mutex").memory = power;
            Ok(())
        }

        fn publish_version(&self, _function_id: &str) -> Result<String, ProviderError> {
            self.record("publish".to_string())?;
            let mut state = self.state.lock().expect("poisoned mutex");
            if state.versions.is_empty() {
                state.versions.push(0);
            }
            let memory = state.memory;
            state.versions.push(memory);
            Ok((state.versions.len() - 1).to_string())
        }

        fn create_alias(
            &self,
            _function_id: &str,
            alias: &str,
            version: &str,
        ) -> Result<(), ProviderError> {
            self.record(format!("create:{alias}"))?;
            let mut state = self.state.lock().expect("poisoned mutex");
            if state.aliases.contains_key(alias) {
                return Err(ProviderError::AlreadyExists(format!(
                    "Alias already exists: {alias}"
                )));
            }
            state.aliases.insert(alias.to_string(), version.to_string());
            Ok(())
        }

        fn update_alias(
            &self,
            _function_id: &str,
            alias: &str,
            version: &str,
        ) -> Result<(), ProviderError> {
            self.record(format!("update:{alias}"))?;
            self.state
                .lock()
                .expect("poisoned mutex")
                .aliases
                .insert(alias.to_string(), version.to_string());
            Ok(())
        }
    }

    fn request(num: Option<u64>) -> InitializerEvent {
        InitializerEvent {
            lambda_arn: "arn:aws:lambda:eu-west-1:123456789012:function:target".to_string(),
            num,
        }
    }

    #[test]
    fn creates_missing_aliases_in_order() {
        let plane = FakeControlPlane::default();

        let summary = provision(&plane, &request(Some(10)), &[128, 256]).expect("should succeed");

        assert_eq!(
            plane.calls(),
            vec![
                "check:RAM128",
                "set_power:128",
                "publish",
                "create:RAM128",
                "check:RAM256",
                "set_power:256",
                "publish",
                "create:RAM256",
            ]
        );
        assert_eq!(plane.alias_target("RAM128"), Some(128));
        assert_eq!(plane.alias_target("RAM256"), Some(256));
        assert!(summary
            .outcomes
            .iter()
            .all(|outcome| outcome.action == AliasAction::Created));
    }

    #[test]
    fn rerun_updates_existing_alias_and_creates_missing_one() {
        let plane = FakeControlPlane::with_aliases(&[("RAM128", "0")]);

        let summary = provision(&plane, &request(Some(5)), &[128, 256]).expect("should succeed");

        let calls = plane.calls();
        assert!(calls.contains(&"update:RAM128".to_string()));
        assert!(!calls.contains(&"create:RAM128".to_string()));
        assert!(calls.contains(&"create:RAM256".to_string()));
        assert_eq!(summary.outcomes[0].action, AliasAction::Updated);
        assert_eq!(summary.outcomes[1].action, AliasAction::Created);
        assert_eq!(plane.alias_target("RAM128"), Some(128));
    }

    #[test]
    fn publishes_a_fresh_version_on_every_run() {
        let plane = FakeControlPlane::default();

        let first = provision(&plane, &request(Some(5)), &[512]).expect("first run");
        let second = provision(&plane, &request(Some(5)), &[512]).expect("second run");

        assert_ne!(first.outcomes[0].version, second.outcomes[0].version);
        assert_eq!(second.outcomes[0].action, AliasAction::Updated);
        assert_eq!(plane.alias_target("RAM512"), Some(512));
    }

    #[test]
    fn validation_failures_make_no_provider_calls() {
        let plane = FakeControlPlane::default();

        let cases = [
            (
                InitializerEvent {
                    lambda_arn: " ".to_string(),
                    num: Some(10),
                },
                vec![128],
                "Missing or empty lambdaARN",
            ),
            (request(Some(10)), vec![], "Missing or empty power values"),
            (request(None), vec![128], "Missing num or num below 5"),
            (request(Some(4)), vec![128], "Missing num or num below 5"),
        ];

        for (event, power_values, expected) in cases {
            let error = provision(&plane, &event, &power_values).expect_err("should fail");
            assert_eq!(
                error,
                ProvisionError::Validation(ValidationError::new(expected))
            );
        }
        assert!(plane.calls().is_empty());
    }

    #[test]
    fn alias_check_error_stops_before_mutation() {
        let plane = FakeControlPlane::default().failing(
            "check:RAM256",
            ProviderError::Other("AccessDeniedException".to_string()),
        );

        let error = provision(&plane, &request(Some(5)), &[128, 256, 512]).expect_err("should fail");

        assert!(matches!(
            error,
            ProvisionError::AliasCheck { ref alias, .. } if alias == "RAM256"
        ));
        let calls = plane.calls();
        assert_eq!(calls.last().map(String::as_str), Some("check:RAM256"));
        assert!(!calls.iter().any(|call| call.ends_with("512")));
    }

    #[test]
    fn configuration_error_aborts_remaining_values_and_keeps_prior_work() {
        let mut plane = FakeControlPlane::default().failing(
            "set_power:256",
            ProviderError::Other("ResourceConflictException".to_string()),
        );

        let error = provision(&plane, &request(Some(5)), &[128, 256, 512]).expect_err("should fail");

        assert!(matches!(
            error,
            ProvisionError::Configuration {
                power: 256,
                step: ProvisionStep::SetPower,
                ..
            }
        ));
        assert_eq!(plane.alias_target("RAM128"), Some(128));
        assert!(!plane.calls().iter().any(|call| call.ends_with("512")));

        plane.failures.clear();
        let summary = provision(&plane, &request(Some(5)), &[128, 256, 512]).expect("resume");
        let actions: Vec<AliasAction> = summary.outcomes.iter().map(|o| o.action).collect();
        assert_eq!(
            actions,
            vec![AliasAction::Updated, AliasAction::Created, AliasAction::Created]
        );
        assert_eq!(plane.alias_target("RAM128"), Some(128));
        assert_eq!(plane.alias_target("RAM256"), Some(256));
        assert_eq!(plane.alias_target("RAM512"), Some(512));
    }

    #[test]
    fn create_race_with_existing_alias_is_tolerated() {
        let plane = FakeControlPlane::default().failing(
            "create:RAM128",
            ProviderError::AlreadyExists("Alias already exists: RAM128".to_string()),
        );

        let summary = provision(&plane, &request(Some(5)), &[128, 256]).expect("should succeed");

        assert_eq!(
            summary.outcomes[0].action,
            AliasAction::CreateSkippedAlreadyExists
        );
        assert_eq!(summary.outcomes[1].action, AliasAction::Created);
    }

    #[test]
    fn update_alias_failure_is_fatal() {
        let plane = FakeControlPlane::with_aliases(&[("RAM128", "0")]).failing(
            "update:RAM128",
            ProviderError::AlreadyExists("unexpected".to_string()),
        );

        let error = provision(&plane, &request(Some(5)), &[128]).expect_err("should fail");

        assert!(matches!(
            error,
            ProvisionError::Configuration {
                step: ProvisionStep::UpdateAlias,
                ..
            }
        ));
    }
}
