// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # twinprobe-core
//!
//! Shared primitives for probing the alert analytics and digital twin
//! services.
//!
//! - [`ReplayApi`] and [`ServiceClient`] for the replay HTTP endpoints
//! - [`TimeWindow`] derived from a [`TimeBoundary`]
//! - [`SessionState`] describing the expected remote session lifecycle
//! - [`MessageTally`] for counting push-channel messages
//! - [`InterruptContext`] for operator interrupts
//! - [`ProbeConfig`] for endpoints and timing
//!
//! ## Iron Lotus Framework
//!
//! - **Genchi Genbutsu**: every observed status and body is reported as-is
//! - **Jidoka**: the first divergence stops the run, nothing is retried
//! - **Muda**: messages are counted and printed, never buffered
//!
//! ## Example
//!
//! ```rust,ignore
//! use twinprobe_core::{ProbeConfig, ReplayApi, Service, ServiceClient, TimeBoundary, TimeWindow};
//!
//! let config = ProbeConfig::default();
//! let client = ServiceClient::new(
//!     config.endpoint(Service::AlertAnalytics).clone(),
//!     config.http.request_timeout,
//! )?;
//! let response = client.time_boundaries("CONV_001").await?;
//! let boundary: TimeBoundary = response.json()?;
//! let window = TimeWindow::from_boundary(&boundary)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod tally;
pub mod types;
pub mod window;

pub use client::{
    ApiResponse, REFERENCE_SPEED_MULTIPLIER, ReplayApi, ServiceClient, replay_request_line,
};
pub use config::{HttpConfig, ObserveConfig, ProbeConfig, ReplayConfig, ServiceEndpoint};
pub use context::{InterruptContext, InterruptHandle, interrupt_on_ctrl_c};
pub use error::{ProbeError, Result};
pub use tally::{MessageTally, TallySnapshot};
pub use types::{
    Channel, ControlOp, ObservedMessage, Payload, Service, SessionId, SessionState, StepResult,
};
pub use window::{TimeBoundary, TimeWindow, format_instant};
