//! Replay time window derivation.
//!
//! The probe window is biased toward the most recent recorded data, which is
//! the densest and therefore safest to replay, while still spanning a
//! non-trivial range. The fractions are fixed.

use chrono::{DateTime, Duration as TimeDelta, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};

/// Fraction of the boundary span, measured back from `maxTime`, where the
/// window starts.
pub const WINDOW_START_FRACTION: f64 = 0.5;

/// Fraction of the boundary span, measured back from `maxTime`, where the
/// window ends.
pub const WINDOW_END_FRACTION: f64 = 0.1;

/// Earliest and latest timestamps for which an entity has recorded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBoundary {
    /// Earliest recorded data point.
    pub min_time: DateTime<Utc>,
    /// Latest recorded data point.
    pub max_time: DateTime<Utc>,
}

impl TimeBoundary {
    /// Creates a boundary.
    #[must_use]
    pub const fn new(min_time: DateTime<Utc>, max_time: DateTime<Utc>) -> Self {
        Self { min_time, max_time }
    }

    /// Returns `maxTime - minTime`.
    #[must_use]
    pub fn span(&self) -> TimeDelta {
        self.max_time - self.min_time
    }
}

/// Replay input window. Invariant: `start < end`.
///
/// Computed once per run and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window.
    ///
    /// # Errors
    /// Returns an error if `start >= end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start >= end {
            return Err(ProbeError::invalid_boundary(format!(
                "window start {} is not before end {}",
                format_instant(start),
                format_instant(end)
            )));
        }
        Ok(Self { start, end })
    }

    /// Derives the probe window from a boundary.
    ///
    /// With `D = maxTime - minTime`:
    /// `start = maxTime - 0.5·D`, `end = maxTime - 0.1·D`.
    ///
    /// Arithmetic is done on whole microseconds, so any span that is a
    /// multiple of 10µs (every span between millisecond timestamps) is
    /// split exactly. Other spans truncate both offsets toward `maxTime`,
    /// which can differ from half-to-even rounding by at most 1µs.
    ///
    /// # Errors
    /// Returns an error if `maxTime <= minTime`, or the span is too short
    /// (or too long) to yield `start < end`.
    pub fn from_boundary(boundary: &TimeBoundary) -> Result<Self> {
        if boundary.max_time <= boundary.min_time {
            return Err(ProbeError::invalid_boundary(format!(
                "maxTime {} is not after minTime {}",
                format_instant(boundary.max_time),
                format_instant(boundary.min_time)
            )));
        }

        let span_us = boundary
            .span()
            .num_microseconds()
            .ok_or_else(|| ProbeError::invalid_boundary("boundary span overflows"))?;

        // 0.5·D and 0.1·D as exact integer divisions.
        let start_back = TimeDelta::microseconds(span_us / 2);
        let end_back = TimeDelta::microseconds(span_us / 10);

        Self::new(boundary.max_time - start_back, boundary.max_time - end_back)
    }

    /// Returns the window start.
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the window end.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns the `startTime` / `endTime` query parameters for the start call.
    #[must_use]
    pub fn query_params(&self) -> [(&'static str, String); 2] {
        [
            ("startTime", format_instant(self.start)),
            ("endTime", format_instant(self.end)),
        ]
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} to {}",
            format_instant(self.start),
            format_instant(self.end)
        )
    }
}

/// Formats an instant as `YYYY-MM-DDTHH:MM:SS.mmmZ` (millisecond precision).
#[must_use]
pub fn format_instant(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}
