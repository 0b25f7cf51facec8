//! Probe configuration.
//!
//! Configuration is validated at load time, with defaults matching the
//! services' local deployment (alert analytics on 8083, digital twin on 8082).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ProbeError, Result};
use crate::types::{Channel, Service};

/// Top-level probe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Alert analytics service endpoint.
    #[serde(default = "default_alert_analytics")]
    pub alert_analytics: ServiceEndpoint,

    /// Digital twin service endpoint.
    #[serde(default = "default_digital_twin")]
    pub digital_twin: ServiceEndpoint,

    /// HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,

    /// Replay workflow settings.
    #[serde(default)]
    pub replay: ReplayConfig,

    /// Stream observation settings.
    #[serde(default)]
    pub observe: ObserveConfig,
}

fn default_alert_analytics() -> ServiceEndpoint {
    ServiceEndpoint::new("http://localhost:8083")
}

fn default_digital_twin() -> ServiceEndpoint {
    ServiceEndpoint::new("http://localhost:8082")
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            alert_analytics: default_alert_analytics(),
            digital_twin: default_digital_twin(),
            http: HttpConfig::default(),
            replay: ReplayConfig::default(),
            observe: ObserveConfig::default(),
        }
    }
}

impl ProbeConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.alert_analytics.validate()?;
        self.digital_twin.validate()?;
        self.http.validate()?;
        self.replay.validate()?;
        self.observe.validate()?;
        Ok(())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ProbeError::config(format!("failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text cannot be parsed or validated.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ProbeError::config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the endpoint of a service.
    #[must_use]
    pub const fn endpoint(&self, service: Service) -> &ServiceEndpoint {
        match service {
            Service::AlertAnalytics => &self.alert_analytics,
            Service::DigitalTwin => &self.digital_twin,
        }
    }

    /// Returns a mutable reference to the endpoint of a service.
    pub fn endpoint_mut(&mut self, service: Service) -> &mut ServiceEndpoint {
        match service {
            Service::AlertAnalytics => &mut self.alert_analytics,
            Service::DigitalTwin => &mut self.digital_twin,
        }
    }

    /// Returns the WebSocket URL of a channel.
    #[must_use]
    pub fn channel_url(&self, channel: Channel) -> String {
        self.endpoint(channel.service()).ws_url(channel.path())
    }
}

/// Base URL of one remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// HTTP base URL, without trailing slash (e.g. `http://localhost:8083`).
    pub base_url: String,
}

impl ServiceEndpoint {
    /// Creates an endpoint, stripping any trailing slash.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Validates the base URL scheme.
    ///
    /// # Errors
    /// Returns an error if the URL is empty or not http(s).
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(ProbeError::config("base_url cannot be empty"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ProbeError::config(format!(
                "base_url must start with http:// or https://, got {}",
                self.base_url
            )));
        }
        Ok(())
    }

    /// Joins a path onto the HTTP base URL.
    #[must_use]
    pub fn http_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Joins a path onto the base URL with the scheme switched to ws(s).
    #[must_use]
    pub fn ws_url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{base}{path}")
    }
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Ceiling on every HTTP call. Exceeding it fails the step; no retry.
    #[serde(default = "default_request_timeout")]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
        }
    }
}

impl HttpConfig {
    /// Validates HTTP settings.
    ///
    /// # Errors
    /// Returns an error if the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            return Err(ProbeError::config("request_timeout must be greater than 0"));
        }
        Ok(())
    }
}

/// Replay workflow settings.
///
/// Settle delays give the remote state transition time to land before the
/// next call. Each check still happens exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Entity whose recorded data is replayed.
    #[serde(default = "default_entity")]
    pub entity: String,

    /// Delay before each status check.
    #[serde(default = "default_status_settle")]
    #[serde(with = "humantime_serde")]
    pub status_settle: Duration,

    /// Delay before each pause/resume/stop call.
    #[serde(default = "default_control_settle")]
    #[serde(with = "humantime_serde")]
    pub control_settle: Duration,

    /// Delay before the post-stop status check.
    #[serde(default = "default_final_settle")]
    #[serde(with = "humantime_serde")]
    pub final_settle: Duration,
}

fn default_entity() -> String {
    "CONV_001".to_string()
}

fn default_status_settle() -> Duration {
    Duration::from_secs(2)
}

fn default_control_settle() -> Duration {
    Duration::from_secs(1)
}

fn default_final_settle() -> Duration {
    Duration::from_secs(1)
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            entity: default_entity(),
            status_settle: default_status_settle(),
            control_settle: default_control_settle(),
            final_settle: default_final_settle(),
        }
    }
}

impl ReplayConfig {
    /// Validates replay settings.
    ///
    /// # Errors
    /// Returns an error if the entity is empty or not a single path segment.
    pub fn validate(&self) -> Result<()> {
        if self.entity.is_empty() {
            return Err(ProbeError::config("entity cannot be empty"));
        }
        if self.entity.contains(['/', '?', '#']) {
            return Err(ProbeError::config(
                "entity must not contain '/', '?' or '#'",
            ));
        }
        Ok(())
    }
}

/// Stream observation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObserveConfig {
    /// Supervisor wake-up interval.
    #[serde(default = "default_tick")]
    #[serde(with = "humantime_serde")]
    pub tick: Duration,

    /// How long teardown waits for the receive loop before aborting it.
    #[serde(default = "default_join_timeout")]
    #[serde(with = "humantime_serde")]
    pub join_timeout: Duration,

    /// Default observation window for `/ws/alert-updates`.
    #[serde(default = "default_long_window")]
    #[serde(with = "humantime_serde")]
    pub alert_duration: Duration,

    /// Default observation window for `/ws/replay-updates`.
    #[serde(default = "default_long_window")]
    #[serde(with = "humantime_serde")]
    pub replay_duration: Duration,

    /// Default observation window for `/ws/machine-updates`.
    #[serde(default = "default_short_window")]
    #[serde(with = "humantime_serde")]
    pub machine_duration: Duration,
}

fn default_tick() -> Duration {
    Duration::from_millis(250)
}

fn default_join_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_long_window() -> Duration {
    Duration::from_secs(60)
}

fn default_short_window() -> Duration {
    Duration::from_secs(30)
}

impl Default for ObserveConfig {
    fn default() -> Self {
        Self {
            tick: default_tick(),
            join_timeout: default_join_timeout(),
            alert_duration: default_long_window(),
            replay_duration: default_long_window(),
            machine_duration: default_short_window(),
        }
    }
}

impl ObserveConfig {
    /// Validates observation settings.
    ///
    /// # Errors
    /// Returns an error if the tick is zero.
    pub fn validate(&self) -> Result<()> {
        if self.tick.is_zero() {
            return Err(ProbeError::config("tick must be greater than 0"));
        }
        Ok(())
    }

    /// Returns the default observation window for a channel.
    #[must_use]
    pub const fn default_duration(&self, channel: Channel) -> Duration {
        match channel {
            Channel::AlertUpdates => self.alert_duration,
            Channel::ReplayUpdates => self.replay_duration,
            Channel::MachineUpdates => self.machine_duration,
        }
    }
}

/// Serde helper for humantime durations.
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    /// Serializes a duration as a human-readable string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    /// Deserializes a duration from a human-readable string.
    ///
    /// # Errors
    /// Returns an error if the string cannot be parsed.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
