//! HTTP access to the remote services.
//!
//! [`ReplayApi`] is the seam between the workflow validator and the replay
//! endpoints. Implementations return the raw status and body of every call;
//! deciding whether a status is acceptable belongs to the caller. Only
//! transport failures surface as errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::config::ServiceEndpoint;
use crate::error::{ProbeError, Result};
use crate::types::{ControlOp, SessionId};
use crate::window::TimeWindow;

/// Playback speed used for the reference replay run.
pub const REFERENCE_SPEED_MULTIPLIER: f64 = 5.0;

/// Status and body of a completed HTTP call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text (may be empty).
    pub body: String,
}

impl ApiResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Decodes the body as JSON.
    ///
    /// # Errors
    /// Returns a decode error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| ProbeError::decode(e.to_string()))
    }

    /// Returns the body for display: pretty JSON when decodable, the raw
    /// text otherwise, `None` when empty.
    #[must_use]
    pub fn display_body(&self) -> Option<String> {
        if self.body.trim().is_empty() {
            return None;
        }
        Some(
            serde_json::from_str::<serde_json::Value>(&self.body)
                .ok()
                .and_then(|v| serde_json::to_string_pretty(&v).ok())
                .unwrap_or_else(|| self.body.clone()),
        )
    }
}

/// Replay endpoints of the alert analytics service.
#[async_trait]
pub trait ReplayApi: Send + Sync {
    /// `GET /api/replay/{entity}/time-boundaries`
    async fn time_boundaries(&self, entity: &str) -> Result<ApiResponse>;

    /// `POST /api/replay/{entity}/start?startTime&endTime&speedMultiplier`
    async fn start(
        &self,
        entity: &str,
        window: &TimeWindow,
        speed_multiplier: f64,
    ) -> Result<ApiResponse>;

    /// `GET /api/replay/{session}/status`
    async fn status(&self, session: &SessionId) -> Result<ApiResponse>;

    /// `POST /api/replay/{session}/{pause|resume|stop}`
    async fn control(&self, session: &SessionId, op: ControlOp) -> Result<ApiResponse>;
}

/// Returns the request line for a replay call, as printed in reports.
#[must_use]
pub fn replay_request_line(method: &str, target: &str, suffix: &str) -> String {
    format!("{method} /api/replay/{target}/{suffix}")
}

/// HTTP client bound to one service base URL.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    endpoint: ServiceEndpoint,
    timeout: Duration,
}

impl ServiceClient {
    /// Creates a client with a fixed per-request timeout.
    ///
    /// # Errors
    /// Returns a configuration error if the endpoint is invalid or the
    /// HTTP client cannot be built.
    pub fn new(endpoint: ServiceEndpoint, timeout: Duration) -> Result<Self> {
        endpoint.validate()?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    /// Returns the service endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &ServiceEndpoint {
        &self.endpoint
    }

    /// Returns the full URL of a path on this service.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        self.endpoint.http_url(path)
    }

    /// Sends one request and returns its status and body.
    ///
    /// # Errors
    /// Returns a connection or timeout error if no response was received.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiResponse> {
        let url = self.url(path);
        tracing::debug!(%method, %url, "sending request");

        let mut request = self.http.request(method, &url);
        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(&url, &e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&url, &e))?;

        tracing::debug!(%url, status, bytes = body.len(), "response received");
        Ok(ApiResponse::new(status, body))
    }

    fn transport_error(&self, url: &str, err: &reqwest::Error) -> ProbeError {
        if err.is_timeout() {
            ProbeError::Timeout(self.timeout)
        } else {
            ProbeError::connection(format!("{url}: {err}"))
        }
    }
}

#[async_trait]
impl ReplayApi for ServiceClient {
    async fn time_boundaries(&self, entity: &str) -> Result<ApiResponse> {
        self.send(
            Method::GET,
            &format!("/api/replay/{entity}/time-boundaries"),
            &[],
        )
        .await
    }

    async fn start(
        &self,
        entity: &str,
        window: &TimeWindow,
        speed_multiplier: f64,
    ) -> Result<ApiResponse> {
        let [start, end] = window.query_params();
        let query = [
            start,
            end,
            ("speedMultiplier", format!("{speed_multiplier:.1}")),
        ];
        self.send(Method::POST, &format!("/api/replay/{entity}/start"), &query)
            .await
    }

    async fn status(&self, session: &SessionId) -> Result<ApiResponse> {
        self.send(Method::GET, &format!("/api/replay/{session}/status"), &[])
            .await
    }

    async fn control(&self, session: &SessionId, op: ControlOp) -> Result<ApiResponse> {
        self.send(Method::POST, &format!("/api/replay/{session}/{op}"), &[])
            .await
    }
}
