// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # twinprobe-harness
//!
//! Contract checks against the alert analytics and digital twin services.
//!
//! This crate provides:
//! - **Workflow validation**: drives a replay session through
//!   start/pause/resume/stop and checks every transition
//! - **Endpoint sweeps**: walks a fixed REST catalog and reports each call
//!
//! ## Iron Lotus Framework
//!
//! - **Jidoka** (自働化): the workflow stops at the first divergent step
//! - **Built-in Quality** (品質の作り込み): every step reports expected vs actual
//! - **Popperian Falsification**: each step tries to refute the contract
//!
//! ## Example
//!
//! ```rust,ignore
//! use twinprobe_core::{ProbeConfig, Service, ServiceClient};
//! use twinprobe_harness::{WorkflowSettings, WorkflowValidator};
//!
//! let config = ProbeConfig::default();
//! let client = ServiceClient::new(
//!     config.endpoint(Service::AlertAnalytics).clone(),
//!     config.http.request_timeout,
//! )?;
//! let mut validator = WorkflowValidator::new(client, WorkflowSettings::from(&config.replay));
//! let report = validator.run().await;
//! assert!(report.passed());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod report;
pub mod sweep;
#[cfg(test)]
pub mod tests;
pub mod workflow;

pub use error::{HarnessError, Result};
pub use report::{RunOutcome, RunReport, WORKFLOW_STEPS, print_header, print_step};
pub use sweep::{
    Catalog, EndpointProbe, EndpointSweep, ProbeOutcome, ProbeResult, SweepReport,
    curl_command, sample_alert_id,
};
pub use workflow::{Halt, StepOutcome, WorkflowSettings, WorkflowValidator};
