// Iron Lotus: Allow unwrap/expect in tests for clear failure messages
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

//! # twinprobe-observe
//!
//! Bounded observation of the services' push channels.
//!
//! - [`StreamObserver`] attaches to one channel for a fixed duration,
//!   tallies every message and tears down exactly once
//! - [`StreamSource`] / [`StreamConnection`] abstract the transport
//! - [`WebSocketSource`] implements them with `tokio-tungstenite`
//!
//! ## Iron Lotus Framework
//!
//! - **Genchi Genbutsu** (現地現物): observe the live channel directly
//! - **Jidoka** (自働化): a dropped connection ends the run, no reconnect
//! - **Heijunka** (平準化): one observer for every channel
//!
//! ## Example
//!
//! ```rust,ignore
//! use twinprobe_core::{Channel, InterruptContext, ProbeConfig};
//! use twinprobe_observe::{StreamObserver, WebSocketSource};
//!
//! let config = ProbeConfig::default();
//! let channel = Channel::AlertUpdates;
//! let observer = StreamObserver::new(WebSocketSource::new(), channel, config.channel_url(channel));
//! let summary = observer.run(config.observe.default_duration(channel), InterruptContext::detached()).await?;
//! summary.print();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod observer;
pub mod source;
#[cfg(test)]
pub mod tests;
pub mod ws;

pub use error::{ObserveError, Result};
pub use observer::{
    EndReason, ObservationSummary, ObserverSettings, StreamObserver, replay_start_hint,
};
pub use source::{CloseSignal, Frame, StreamConnection, StreamSource};
pub use ws::{WebSocketConnection, WebSocketSource};
