//! AWS-oriented adapters and handlers for power tuning.
//!
//! This crate owns runtime integration details (Lambda handlers, environment
//! configuration, the Lambda control-plane adapter and log setup). The
//! provisioning and selection logic itself lives in `power_tuning_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod telemetry;
