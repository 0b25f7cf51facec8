//! Contract tests against in-process mock services.
//!
//! # Toyota Way: Genchi Genbutsu (現地現物)
//! Exercise the real client over a real socket.

// Allow test-specific patterns that are denied in production code
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod server;
mod sweep;
mod workflow;
