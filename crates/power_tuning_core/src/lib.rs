//! Shared power-tuning domain primitives.
//!
//! This crate owns the provisioning state machine, the optimization selector
//! and the request/response contracts. It intentionally excludes AWS SDK and
//! Lambda runtime concerns; those live in `power_tuning_lambda`.

pub mod contract;
pub mod cost;
pub mod provisioning;
pub mod selection;
