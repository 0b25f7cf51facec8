//! Core types shared by the probes.
//!
//! The remote replay session is owned by the service. These types only
//! describe what the probes expect to observe: explicit state machine,
//! no implicit transitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque identifier of a remote replay session.
///
/// Assigned by the service as the plain-text body of the start call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Parses a session ID from a start-call response body.
    ///
    /// Surrounding whitespace is trimmed. Returns `None` for an empty body.
    #[must_use]
    pub fn parse(body: &str) -> Option<Self> {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Control operation issued against a replay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlOp {
    /// Create the session.
    Start,
    /// Suspend playback.
    Pause,
    /// Continue playback.
    Resume,
    /// Destroy the session.
    Stop,
}

impl ControlOp {
    /// Returns the URL path segment for this operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for ControlOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Externally observable lifecycle state of a replay session.
///
/// ```text
/// Absent ─start→ Running ─pause→ Paused ─resume→ Running ─stop→ Absent
/// ```
///
/// `stop` is accepted from `Paused` as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No session exists (never started, or stopped).
    Absent,
    /// Session exists and is playing.
    Running,
    /// Session exists and is suspended.
    Paused,
}

impl SessionState {
    /// Returns the state reached by applying `op`, or `None` if the
    /// operation is not valid from this state.
    #[must_use]
    pub const fn after(self, op: ControlOp) -> Option<Self> {
        match (self, op) {
            (Self::Absent, ControlOp::Start) | (Self::Paused, ControlOp::Resume) => {
                Some(Self::Running)
            }
            (Self::Running, ControlOp::Pause) => Some(Self::Paused),
            (Self::Running | Self::Paused, ControlOp::Stop) => Some(Self::Absent),
            _ => None,
        }
    }

    /// Returns the HTTP status the status endpoint must report in this state.
    #[must_use]
    pub const fn expected_status(self) -> u16 {
        match self {
            Self::Absent => 404,
            Self::Running | Self::Paused => 200,
        }
    }
}

/// Outcome of one step of a workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// 1-based step number.
    pub step: u32,
    /// Request line or human description of the step.
    pub description: String,
    /// Documented status code.
    pub expected_status: u16,
    /// Status actually returned; `None` if the call never completed.
    pub actual_status: Option<u16>,
    /// Whether `actual_status == expected_status`.
    pub passed: bool,
    /// Response body, if any.
    pub payload: Option<String>,
    /// Transport or decode error, if any.
    pub error: Option<String>,
}

impl StepResult {
    /// Builds a result from an observed status code.
    #[must_use]
    pub fn observed(
        step: u32,
        description: impl Into<String>,
        expected_status: u16,
        actual_status: u16,
        payload: Option<String>,
    ) -> Self {
        Self {
            step,
            description: description.into(),
            expected_status,
            actual_status: Some(actual_status),
            passed: actual_status == expected_status,
            payload,
            error: None,
        }
    }

    /// Builds a failed result for a call that produced an error.
    #[must_use]
    pub fn failed(
        step: u32,
        description: impl Into<String>,
        expected_status: u16,
        error: &crate::error::ProbeError,
    ) -> Self {
        Self {
            step,
            description: description.into(),
            expected_status,
            actual_status: error.status_code(),
            passed: false,
            payload: None,
            error: Some(error.to_string()),
        }
    }

    /// Returns the printable verdict tag.
    #[must_use]
    pub const fn verdict(&self) -> &'static str {
        if self.passed { "[PASS]" } else { "[FAIL]" }
    }
}

/// Payload of a message received on a push channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Decoded JSON document.
    Structured(serde_json::Value),
    /// Content that did not decode as JSON.
    Raw(String),
}

impl Payload {
    /// Decodes a text frame, falling back to raw content.
    #[must_use]
    pub fn decode(text: &str) -> Self {
        serde_json::from_str(text).map_or_else(|_| Self::Raw(text.to_string()), Self::Structured)
    }

    /// Returns true if the payload decoded as JSON.
    #[must_use]
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// Renders the payload for display (pretty JSON or the raw text).
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Structured(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            Self::Raw(text) => text.clone(),
        }
    }
}

/// A message received on a push channel.
///
/// Counted and printed, never retained past the current message.
#[derive(Debug, Clone)]
pub struct ObservedMessage {
    /// 1-based sequence number within the observation.
    pub sequence: u64,
    /// Receive time.
    pub received_at: DateTime<Utc>,
    /// Decoded or raw content.
    pub payload: Payload,
}

/// Remote service a probe targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Service {
    /// Alert analytics service (alerts, metrics, reports, replay).
    AlertAnalytics,
    /// Digital twin service (machine state).
    DigitalTwin,
}

impl Service {
    /// Returns the display name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AlertAnalytics => "Alert Analytics",
            Self::DigitalTwin => "Digital Twin",
        }
    }
}

/// Push channel exposed by one of the services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    /// Real-time alert updates.
    AlertUpdates,
    /// Historical replay updates.
    ReplayUpdates,
    /// Digital twin machine state updates.
    MachineUpdates,
}

impl Channel {
    /// All channels.
    pub const ALL: [Self; 3] = [Self::AlertUpdates, Self::ReplayUpdates, Self::MachineUpdates];

    /// Returns the WebSocket path of this channel.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::AlertUpdates => "/ws/alert-updates",
            Self::ReplayUpdates => "/ws/replay-updates",
            Self::MachineUpdates => "/ws/machine-updates",
        }
    }

    /// Returns the service hosting this channel.
    #[must_use]
    pub const fn service(&self) -> Service {
        match self {
            Self::AlertUpdates | Self::ReplayUpdates => Service::AlertAnalytics,
            Self::MachineUpdates => Service::DigitalTwin,
        }
    }

    /// Returns the short label used in log lines.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::AlertUpdates => "Alert",
            Self::ReplayUpdates => "Replay",
            Self::MachineUpdates => "Machine",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
