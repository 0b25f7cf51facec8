//! Bounded observation of one push channel.
//!
//! # Toyota Way: Genchi Genbutsu (現地現物)
//! Attach to the live channel and count what actually arrives.
//!
//! Two tasks cooperate per run. The receive loop owns the connection and
//! tallies frames. The supervisor waits for the duration, an operator
//! interrupt, or the loop ending on its own, then tears down exactly once:
//! request close, freeze the tally, join the loop (abort after the join
//! timeout).

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use tokio::time::Instant;

use twinprobe_core::{
    Channel, InterruptContext, MessageTally, ObserveConfig, ObservedMessage, Payload,
    REFERENCE_SPEED_MULTIPLIER, ServiceEndpoint, format_instant,
};

use crate::error::{ObserveError, Result};
use crate::source::{CloseSignal, Frame, StreamConnection, StreamSource};

/// Why an observation ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EndReason {
    /// The requested duration elapsed.
    DurationElapsed,
    /// The operator interrupted the run.
    Interrupted,
    /// The peer closed the stream.
    ConnectionClosed(Option<String>),
    /// The stream failed mid-observation.
    ConnectionLost(String),
}

impl EndReason {
    /// Returns true if the observation ran to its natural end.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        matches!(self, Self::DurationElapsed | Self::Interrupted)
    }
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DurationElapsed => f.write_str("duration elapsed"),
            Self::Interrupted => f.write_str("interrupted by operator"),
            Self::ConnectionClosed(Some(reason)) => write!(f, "connection closed by peer ({reason})"),
            Self::ConnectionClosed(None) => f.write_str("connection closed by peer"),
            Self::ConnectionLost(e) => write!(f, "connection lost: {e}"),
        }
    }
}

/// Final report of one observation.
#[derive(Debug, Clone, Serialize)]
pub struct ObservationSummary {
    /// Observed channel.
    pub channel: Channel,
    /// Connected URL.
    pub url: String,
    /// When the connection opened.
    pub started_at: DateTime<Utc>,
    /// When teardown completed.
    pub ended_at: DateTime<Utc>,
    /// Wall time between open and teardown.
    pub elapsed: Duration,
    /// Messages counted.
    pub total: u64,
    /// Messages that decoded as JSON.
    pub structured: u64,
    /// Messages kept as raw text.
    pub raw: u64,
    /// Why the observation ended.
    pub end_reason: EndReason,
    /// Close requests issued during teardown.
    pub close_calls: u64,
}

impl ObservationSummary {
    /// Prints the summary block.
    pub fn print(&self) {
        let secs = self.elapsed.as_secs();
        println!("=== Test ended at {} ===", format_instant(self.ended_at));
        println!("=== Total test duration: {} min {} sec ===", secs / 60, secs % 60);
        println!(
            "=== {} messages on {} ({} structured, {} raw); {} ===",
            self.total, self.channel, self.structured, self.raw, self.end_reason
        );
    }
}

/// How the receive loop finished.
#[derive(Debug)]
enum LoopEnd {
    CloseRequested,
    PeerClosed(Option<String>),
    Lost(String),
}

/// Supervisor timing.
#[derive(Debug, Clone, Copy)]
pub struct ObserverSettings {
    /// Supervisor wake-up interval.
    pub tick: Duration,
    /// How long teardown waits for the receive loop.
    pub join_timeout: Duration,
}

impl From<&ObserveConfig> for ObserverSettings {
    fn from(config: &ObserveConfig) -> Self {
        Self {
            tick: config.tick,
            join_timeout: config.join_timeout,
        }
    }
}

impl Default for ObserverSettings {
    fn default() -> Self {
        Self::from(&ObserveConfig::default())
    }
}

/// Observes one push channel for a bounded duration.
pub struct StreamObserver<S: StreamSource> {
    source: S,
    channel: Channel,
    url: String,
    settings: ObserverSettings,
    start_hint: Option<String>,
}

impl<S: StreamSource> StreamObserver<S> {
    /// Creates an observer for `channel` at `url`.
    #[must_use]
    pub fn new(source: S, channel: Channel, url: impl Into<String>) -> Self {
        Self {
            source,
            channel,
            url: url.into(),
            settings: ObserverSettings::default(),
            start_hint: None,
        }
    }

    /// Overrides supervisor timing.
    #[must_use]
    pub const fn with_settings(mut self, settings: ObserverSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the alert analytics endpoint used for the replay start hint.
    ///
    /// Only the replay channel prints a hint.
    #[must_use]
    pub fn with_replay_endpoint(mut self, endpoint: &ServiceEndpoint, entity: &str) -> Self {
        if self.channel == Channel::ReplayUpdates {
            self.start_hint = Some(replay_start_hint(endpoint, entity, Utc::now()));
        }
        self
    }

    /// Returns the observed channel.
    #[must_use]
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// Returns the channel URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Observes the channel for `duration`, or until interrupted or the
    /// peer goes away.
    ///
    /// # Errors
    /// Returns an error if the connection cannot be opened or the receive
    /// task panics.
    pub async fn run(
        &self,
        duration: Duration,
        mut interrupt: InterruptContext,
    ) -> Result<ObservationSummary> {
        let label = self.channel.label();
        let conn = self.source.open(&self.url).await?;

        let started_at = Utc::now();
        let start = Instant::now();
        tracing::info!(channel = %self.channel, url = %self.url, "connected");
        println!("[{}] Connected to {label} WebSocket at {}", stamp(), self.url);
        if let Some(hint) = &self.start_hint {
            println!("[{}] To produce replay traffic, start a replay with:", stamp());
            println!("[{}] {hint}", stamp());
        }
        println!(
            "[{}] Observing for {} sec. Press Ctrl+C to stop.",
            stamp(),
            duration.as_secs()
        );

        let tally = MessageTally::new();
        let close = CloseSignal::new();
        let mut recv_task = tokio::spawn(receive_loop(
            conn,
            self.channel,
            tally.clone(),
            close.clone(),
        ));

        // Supervisor. A duration past the clock's range has no deadline.
        let deadline = start.checked_add(duration);
        let mut ticker = tokio::time::interval(self.settings.tick);
        let (trigger, finished) = loop {
            tokio::select! {
                biased;
                () = interrupt.interrupted() => break (Some(EndReason::Interrupted), None),
                joined = &mut recv_task => break (None, Some(joined)),
                _ = ticker.tick() => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        break (Some(EndReason::DurationElapsed), None);
                    }
                    tracing::trace!(channel = %self.channel, count = tally.total(), "tick");
                }
            }
        };

        // Teardown, once.
        tracing::info!(channel = %self.channel, "closing connection");
        println!("[{}] Closing {label} connection...", stamp());
        close.request();
        tally.freeze();

        let joined = match finished {
            Some(joined) => Some(joined),
            None => match tokio::time::timeout(self.settings.join_timeout, &mut recv_task).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    tracing::warn!(
                        channel = %self.channel,
                        timeout = ?self.settings.join_timeout,
                        "receive loop did not acknowledge close, aborting"
                    );
                    recv_task.abort();
                    None
                }
            },
        };

        let end_reason = match (trigger, joined) {
            (_, Some(Err(e))) => return Err(ObserveError::join(e.to_string())),
            (Some(reason), _) => reason,
            (None, Some(Ok(LoopEnd::Lost(e)))) => EndReason::ConnectionLost(e),
            (None, Some(Ok(LoopEnd::PeerClosed(reason)))) => EndReason::ConnectionClosed(reason),
            (None, Some(Ok(LoopEnd::CloseRequested)) | None) => EndReason::ConnectionClosed(None),
        };

        let snapshot = tally.snapshot();
        let summary = ObservationSummary {
            channel: self.channel,
            url: self.url.clone(),
            started_at,
            ended_at: Utc::now(),
            elapsed: start.elapsed(),
            total: snapshot.total,
            structured: snapshot.structured,
            raw: snapshot.raw,
            end_reason,
            close_calls: close.request_count(),
        };
        tracing::info!(
            channel = %summary.channel,
            count = summary.total,
            structured = summary.structured,
            raw = summary.raw,
            reason = %summary.end_reason,
            elapsed = ?summary.elapsed,
            "observation finished"
        );
        Ok(summary)
    }
}

/// Receives frames until close is requested or the stream ends.
async fn receive_loop(
    mut conn: Box<dyn StreamConnection>,
    channel: Channel,
    tally: MessageTally,
    close: CloseSignal,
) -> LoopEnd {
    let label = channel.label();
    loop {
        let frame = tokio::select! {
            biased;
            () = close.requested() => {
                if let Err(e) = conn.close().await {
                    tracing::debug!(channel = %channel, error = %e, "close handshake failed");
                }
                return LoopEnd::CloseRequested;
            }
            frame = conn.recv() => frame,
        };

        match frame {
            Some(Ok(Frame::Text(text))) => record(&tally, label, Payload::decode(&text)),
            Some(Ok(Frame::Binary(data))) => {
                let payload = std::str::from_utf8(&data).map_or_else(
                    |_| Payload::Raw(String::from_utf8_lossy(&data).into_owned()),
                    Payload::decode,
                );
                record(&tally, label, payload);
            }
            Some(Ok(Frame::Ping | Frame::Pong)) => {}
            Some(Ok(Frame::Close(reason))) => {
                println!("[{}] {label} WebSocket connection closed", stamp());
                return LoopEnd::PeerClosed(reason);
            }
            None => return LoopEnd::PeerClosed(None),
            Some(Err(e)) => {
                tracing::warn!(channel = %channel, error = %e, "stream failed");
                println!("[{}] {label} WebSocket error: {e}", stamp());
                return LoopEnd::Lost(e.to_string());
            }
        }
    }
}

fn record(tally: &MessageTally, label: &str, payload: Payload) {
    let Some(sequence) = tally.record(&payload) else {
        return;
    };
    let message = ObservedMessage {
        sequence,
        received_at: Utc::now(),
        payload,
    };
    tracing::debug!(
        channel = label,
        sequence = message.sequence,
        structured = message.payload.is_structured(),
        "message received"
    );
    let at = message.received_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    match &message.payload {
        Payload::Structured(_) => println!(
            "[{at}] {label} Update #{}: {}",
            message.sequence,
            message.payload.render()
        ),
        Payload::Raw(text) => println!("[{at}] {label} Raw Message #{}: {text}", message.sequence),
    }
}

fn stamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Returns a curl command that starts a replay over the hour before `now`.
#[must_use]
pub fn replay_start_hint(endpoint: &ServiceEndpoint, entity: &str, now: DateTime<Utc>) -> String {
    let from = now - chrono::Duration::hours(1);
    format!(
        "curl -X POST \"{}?startTime={}&endTime={}&speedMultiplier={REFERENCE_SPEED_MULTIPLIER:.1}\"",
        endpoint.http_url(&format!("/api/replay/{entity}/start")),
        format_instant(from),
        format_instant(now),
    )
}
