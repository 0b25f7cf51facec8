// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # twinprobe
//!
//! Contract probes for the alert analytics and digital twin services.
//!
//! - `twinprobe replay` walks the replay session lifecycle and stops at the
//!   first divergence
//! - `twinprobe observe` counts messages on one push channel for a bounded time
//! - `twinprobe sweep` calls every catalogued endpoint of one service
//!
//! ## Example
//!
//! ```rust,ignore
//! use twinprobe::prelude::*;
//!
//! let config = ProbeConfig::default();
//! let client = ServiceClient::new(config.alert_analytics.clone(), config.http.request_timeout)?;
//! let mut validator = WorkflowValidator::new(client, WorkflowSettings::from(&config.replay));
//! let report = validator.run().await;
//! assert!(report.passed());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;

pub use twinprobe_core as core;
pub use twinprobe_harness as harness;
pub use twinprobe_observe as observe;

/// Prelude module for common imports.
pub mod prelude {
    pub use twinprobe_core::{
        Channel, InterruptContext, InterruptHandle, ProbeConfig, ProbeError, ReplayApi, Service,
        ServiceClient, SessionId, StepResult, TimeBoundary, TimeWindow,
    };
    pub use twinprobe_harness::{
        Catalog, EndpointSweep, RunOutcome, RunReport, SweepReport, WorkflowSettings,
        WorkflowValidator,
    };
    pub use twinprobe_observe::{
        EndReason, ObservationSummary, ObserverSettings, StreamObserver, WebSocketSource,
    };
}
