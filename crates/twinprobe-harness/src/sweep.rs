//! Endpoint sweeps.
//!
//! A sweep walks a fixed catalog of REST endpoints for one service and
//! reports what each returned. It is informational: a non-2xx status is
//! recorded, never fatal. Only a transport failure on the very first call
//! (the service is not there at all) aborts the sweep.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Serialize;

use twinprobe_core::{ApiResponse, Service, ServiceClient, ServiceEndpoint};

use crate::error::{HarnessError, Result};
use crate::report::print_header;

/// Placeholder filled from the alert list.
pub const ALERT_ID_PLACEHOLDER: &str = "{alertId}";

/// One endpoint to call.
#[derive(Debug, Clone)]
pub struct EndpointProbe {
    /// HTTP method.
    pub method: Method,
    /// Path relative to the catalog base path. May contain `{alertId}`.
    pub path: String,
    /// Query parameters.
    pub query: Vec<(&'static str, String)>,
    /// What the call checks.
    pub description: String,
    /// Whether the response supplies the sample alert ID.
    pub captures_alert_id: bool,
}

impl EndpointProbe {
    /// Creates a probe.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            description: description.into(),
            captures_alert_id: false,
        }
    }

    /// Creates a GET probe.
    #[must_use]
    pub fn get(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Method::GET, path, description)
    }

    /// Creates a POST probe.
    #[must_use]
    pub fn post(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Method::POST, path, description)
    }

    /// Creates a DELETE probe.
    #[must_use]
    pub fn delete(path: impl Into<String>, description: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path, description)
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn param(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Marks this probe as the source of the sample alert ID.
    #[must_use]
    pub const fn capturing_alert_id(mut self) -> Self {
        self.captures_alert_id = true;
        self
    }

    /// Returns true if the path needs the sample alert ID.
    #[must_use]
    pub fn needs_alert_id(&self) -> bool {
        self.path.contains(ALERT_ID_PLACEHOLDER)
    }

    /// Returns the path with placeholders filled, or `None` if one is
    /// unresolved.
    #[must_use]
    pub fn resolve_path(&self, alert_id: Option<&str>) -> Option<String> {
        if !self.needs_alert_id() {
            return Some(self.path.clone());
        }
        alert_id.map(|id| self.path.replace(ALERT_ID_PLACEHOLDER, id))
    }
}

/// Ordered endpoint list for one service.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Target service.
    pub service: Service,
    /// Prefix joined before every probe path.
    pub base_path: &'static str,
    /// Probes in call order.
    pub probes: Vec<EndpointProbe>,
}

impl Catalog {
    /// Alert analytics endpoints under `/api`.
    ///
    /// The historical metrics probe spans the hour before `now`.
    #[must_use]
    pub fn alert_analytics(now: DateTime<Utc>) -> Self {
        let to = now.timestamp();
        let from = to - 3600;
        let probes = vec![
            EndpointProbe::get("/alerts", "Retrieve all alerts"),
            EndpointProbe::get("/alerts", "Retrieve alerts filtered by CRITICAL severity")
                .param("severity", "CRITICAL"),
            EndpointProbe::get("/alerts", "Retrieve alerts filtered by NEW status")
                .param("status", "NEW"),
            EndpointProbe::get("/alerts", "Retrieve alerts for specific machine")
                .param("machineId", "CONV_001"),
            EndpointProbe::get("/alerts", "Retrieve alerts with multiple filters")
                .param("severity", "CRITICAL")
                .param("status", "NEW"),
            EndpointProbe::get(
                "/alerts/machine/CONV_001",
                "Retrieve alerts by machine ID path parameter",
            ),
            EndpointProbe::get("/alerts", "Retrieve alerts to get a sample ID for testing")
                .capturing_alert_id(),
            EndpointProbe::get("/alerts/{alertId}", "Retrieve specific alert by ID"),
            EndpointProbe::post("/alerts/acknowledge/{alertId}", "Acknowledge an alert"),
            EndpointProbe::post("/alerts/resolve/{alertId}", "Resolve an alert"),
            EndpointProbe::delete("/alerts/{alertId}", "Delete an alert"),
            EndpointProbe::get("/analytics/metrics", "Retrieve all performance metrics"),
            EndpointProbe::get(
                "/analytics/metrics/CONV_001",
                "Retrieve performance metrics for specific machine",
            ),
            EndpointProbe::get(
                "/analytics/metrics/CONV_001/historical",
                "Retrieve historical performance metrics",
            )
            .param("fromTime", from.to_string())
            .param("toTime", to.to_string()),
            EndpointProbe::get("/analytics/trends", "Retrieve all trends"),
            EndpointProbe::get("/analytics/trends/CONV_001", "Retrieve trends for specific machine"),
            EndpointProbe::get("/reports", "Retrieve all maintenance reports"),
            EndpointProbe::get("/reports/type/PERFORMANCE", "Retrieve reports by type"),
            EndpointProbe::post("/reports/generate", "Generate a maintenance report")
                .param("machineId", "CONV_001")
                .param("reportType", "PERFORMANCE"),
            EndpointProbe::post("/config/reload", "Reload configuration"),
        ];
        Self {
            service: Service::AlertAnalytics,
            base_path: "/api",
            probes,
        }
    }

    /// Digital twin endpoints, including the delete-then-read sequence and
    /// a non-existent machine.
    #[must_use]
    pub fn digital_twin() -> Self {
        let probes = vec![
            EndpointProbe::get("/actuator/health", "Health endpoint"),
            EndpointProbe::get("/actuator/info", "Info endpoint"),
            EndpointProbe::get("/actuator/metrics", "Metrics endpoint"),
            EndpointProbe::get("/api/digital-twin/states", "All machine states"),
            EndpointProbe::get("/api/digital-twin/state/RECP_001", "Single machine state"),
            EndpointProbe::delete("/api/digital-twin/state/RECP_001", "Delete machine state"),
            EndpointProbe::get(
                "/api/digital-twin/state/RECP_001",
                "Single machine state after deletion",
            ),
            EndpointProbe::get(
                "/api/digital-twin/state/NONEXISTENT_001",
                "Non-existent machine state",
            ),
            EndpointProbe::delete(
                "/api/digital-twin/state/NONEXISTENT_001",
                "Delete non-existent machine state",
            ),
        ];
        Self {
            service: Service::DigitalTwin,
            base_path: "",
            probes,
        }
    }

    /// Returns the built-in catalog for `service`.
    #[must_use]
    pub fn for_service(service: Service, now: DateTime<Utc>) -> Self {
        match service {
            Service::AlertAnalytics => Self::alert_analytics(now),
            Service::DigitalTwin => Self::digital_twin(),
        }
    }
}

/// What happened to one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeResult {
    /// The service answered.
    Responded {
        /// HTTP status.
        status: u16,
        /// Body for display, if any.
        body: Option<String>,
    },
    /// The call never completed.
    Failed {
        /// Transport error.
        error: String,
    },
    /// The probe needed a value that was never resolved.
    Skipped {
        /// Why it was skipped.
        reason: String,
    },
}

/// Record of one probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeOutcome {
    /// What the call checks.
    pub description: String,
    /// HTTP method.
    pub method: String,
    /// Full URL (unresolved path for skipped probes).
    pub url: String,
    /// Equivalent curl command.
    pub curl: String,
    /// Result.
    pub result: ProbeResult,
}

/// Result of a sweep.
#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    /// Swept service.
    pub service: Service,
    /// One entry per catalog probe, in order.
    pub outcomes: Vec<ProbeOutcome>,
}

impl SweepReport {
    /// Number of probes that got a 2xx answer.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.count(|r| matches!(r, ProbeResult::Responded { status, .. } if (200..300).contains(status)))
    }

    /// Number of probes that got a non-2xx answer.
    #[must_use]
    pub fn non_success(&self) -> usize {
        self.count(|r| matches!(r, ProbeResult::Responded { status, .. } if !(200..300).contains(status)))
    }

    /// Number of probes that failed below HTTP.
    #[must_use]
    pub fn failures(&self) -> usize {
        self.count(|r| matches!(r, ProbeResult::Failed { .. }))
    }

    /// Number of skipped probes.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|r| matches!(r, ProbeResult::Skipped { .. }))
    }

    /// Returns true if every probe completed at the HTTP level.
    #[must_use]
    pub fn reachable(&self) -> bool {
        self.failures() == 0
    }

    /// Prints the closing summary.
    pub fn print_summary(&self) {
        print_header(&format!(
            "{} ENDPOINT TESTING COMPLETED",
            self.service.name().to_uppercase()
        ));
        println!(
            "{} probes: {} 2xx, {} non-2xx, {} failed, {} skipped",
            self.outcomes.len(),
            self.successes(),
            self.non_success(),
            self.failures(),
            self.skipped()
        );
    }

    fn count(&self, pred: impl Fn(&ProbeResult) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.result)).count()
    }
}

/// Walks a catalog against one service.
pub struct EndpointSweep {
    client: ServiceClient,
    catalog: Catalog,
}

impl EndpointSweep {
    /// Creates a sweep.
    #[must_use]
    pub const fn new(client: ServiceClient, catalog: Catalog) -> Self {
        Self { client, catalog }
    }

    /// Builds the HTTP client for `endpoint` and creates a sweep.
    ///
    /// # Errors
    /// Returns [`HarnessError::Core`] if the endpoint is invalid or the
    /// client cannot be built.
    pub fn connect(endpoint: ServiceEndpoint, timeout: Duration, catalog: Catalog) -> Result<Self> {
        let client = ServiceClient::new(endpoint, timeout)?;
        Ok(Self::new(client, catalog))
    }

    /// Calls every probe in order.
    ///
    /// # Errors
    /// Returns [`HarnessError::Abort`] if the first call fails below HTTP.
    pub async fn run(&self) -> Result<SweepReport> {
        let service = self.catalog.service;
        print_header(&format!(
            "{} SERVICE - ENDPOINT TESTING",
            service.name().to_uppercase()
        ));
        println!("Base URL: {}", self.client.endpoint().base_url);
        tracing::info!(service = service.name(), probes = self.catalog.probes.len(), "sweep started");

        let mut alert_id: Option<String> = None;
        let mut outcomes = Vec::with_capacity(self.catalog.probes.len());

        for (index, probe) in self.catalog.probes.iter().enumerate() {
            let Some(path) = probe.resolve_path(alert_id.as_deref()) else {
                let outcome = self.skip(probe);
                print_outcome(&outcome);
                outcomes.push(outcome);
                continue;
            };

            let full_path = format!("{}{path}", self.catalog.base_path);
            let url = self.client.url(&full_path);
            let curl = curl_command(&probe.method, &url, &probe.query);
            print_header(&format!("Testing: {}", display_target(&path, &probe.query)));
            println!("Description: {}", probe.description);

            let result = match self
                .client
                .send(probe.method.clone(), &full_path, &probe.query)
                .await
            {
                Ok(response) => {
                    if probe.captures_alert_id {
                        alert_id = sample_alert_id(&response);
                        tracing::debug!(alert_id = ?alert_id, "sample alert id");
                    }
                    ProbeResult::Responded {
                        status: response.status,
                        body: response.display_body(),
                    }
                }
                Err(e) if index == 0 && e.is_transport() => {
                    println!("ERROR: {e}. Is the {} service running?", service.name());
                    tracing::error!(service = service.name(), url = %url, error = %e, "service unreachable");
                    return Err(HarnessError::abort(format!(
                        "{} unreachable at {}: {e}",
                        service.name(),
                        self.client.endpoint().base_url
                    )));
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "probe failed");
                    ProbeResult::Failed {
                        error: e.to_string(),
                    }
                }
            };

            let outcome = ProbeOutcome {
                description: probe.description.clone(),
                method: probe.method.to_string(),
                url,
                curl,
                result,
            };
            print_outcome(&outcome);
            outcomes.push(outcome);
        }

        let report = SweepReport { service, outcomes };
        tracing::info!(
            service = service.name(),
            ok = report.successes(),
            non_success = report.non_success(),
            failed = report.failures(),
            skipped = report.skipped(),
            "sweep finished"
        );
        Ok(report)
    }

    fn skip(&self, probe: &EndpointProbe) -> ProbeOutcome {
        let full_path = format!("{}{}", self.catalog.base_path, probe.path);
        let url = self.client.url(&full_path);
        ProbeOutcome {
            description: probe.description.clone(),
            method: probe.method.to_string(),
            curl: curl_command(&probe.method, &url, &probe.query),
            url,
            result: ProbeResult::Skipped {
                reason: "no sample alert ID available".into(),
            },
        }
    }
}

/// Returns the `alertId` of the first element of a JSON array body.
#[must_use]
pub fn sample_alert_id(response: &ApiResponse) -> Option<String> {
    if !response.is_success() {
        return None;
    }
    let alerts: serde_json::Value = response.json().ok()?;
    match alerts.as_array()?.first()?.get("alertId")? {
        serde_json::Value::String(id) => Some(id.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Renders the equivalent curl command.
#[must_use]
pub fn curl_command(method: &Method, url: &str, query: &[(&'static str, String)]) -> String {
    let mut cmd = format!("curl -X {method} '{url}'");
    if !query.is_empty() {
        cmd.push_str(" -G");
        for (key, value) in query {
            cmd.push_str(&format!(" --data-urlencode '{key}={value}'"));
        }
    }
    cmd
}

fn display_target(path: &str, query: &[(&'static str, String)]) -> String {
    if query.is_empty() {
        return path.to_string();
    }
    let params: Vec<String> = query.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{path}?{}", params.join("&"))
}

fn print_outcome(outcome: &ProbeOutcome) {
    match &outcome.result {
        ProbeResult::Responded { status, body } => {
            println!("Curl Command: {}", outcome.curl);
            println!("HTTP Status Code: {status}");
            println!("Response: {}", body.as_deref().unwrap_or(""));
        }
        ProbeResult::Failed { error } => {
            println!("Curl Command: {}", outcome.curl);
            println!("ERROR: {error}");
        }
        ProbeResult::Skipped { reason } => {
            println!("Skipped: {} ({reason})", outcome.description);
        }
    }
    println!("{}", "-".repeat(80));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-09-26T13:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_alert_catalog_order_and_size() {
        let catalog = Catalog::alert_analytics(now());
        assert_eq!(catalog.service, Service::AlertAnalytics);
        assert_eq!(catalog.base_path, "/api");
        assert_eq!(catalog.probes.len(), 20);
        assert_eq!(catalog.probes[0].path, "/alerts");
        assert!(catalog.probes[6].captures_alert_id);
        assert_eq!(
            catalog.probes.iter().filter(|p| p.needs_alert_id()).count(),
            4
        );
        assert_eq!(catalog.probes[19].path, "/config/reload");
        assert_eq!(catalog.probes[19].method, Method::POST);
    }

    #[test]
    fn test_historical_metrics_span_last_hour() {
        let catalog = Catalog::alert_analytics(now());
        let probe = catalog
            .probes
            .iter()
            .find(|p| p.path.ends_with("/historical"))
            .unwrap();
        let to = now().timestamp();
        assert_eq!(probe.query[0], ("fromTime", (to - 3600).to_string()));
        assert_eq!(probe.query[1], ("toTime", to.to_string()));
    }

    #[test]
    fn test_digital_twin_catalog() {
        let catalog = Catalog::digital_twin();
        assert_eq!(catalog.service, Service::DigitalTwin);
        assert_eq!(catalog.base_path, "");
        assert_eq!(catalog.probes.len(), 9);
        assert_eq!(catalog.probes[0].path, "/actuator/health");
        assert_eq!(catalog.probes[5].method, Method::DELETE);
        assert!(catalog.probes.iter().all(|p| !p.needs_alert_id()));
    }

    #[test]
    fn test_for_service() {
        assert_eq!(
            Catalog::for_service(Service::DigitalTwin, now()).service,
            Service::DigitalTwin
        );
        assert_eq!(
            Catalog::for_service(Service::AlertAnalytics, now()).base_path,
            "/api"
        );
    }

    #[test]
    fn test_resolve_path() {
        let probe = EndpointProbe::get("/alerts/{alertId}", "by id");
        assert!(probe.needs_alert_id());
        assert_eq!(probe.resolve_path(None), None);
        assert_eq!(
            probe.resolve_path(Some("ALT-7")).as_deref(),
            Some("/alerts/ALT-7")
        );
        let plain = EndpointProbe::get("/alerts", "all");
        assert_eq!(plain.resolve_path(None).as_deref(), Some("/alerts"));
    }

    #[test]
    fn test_sample_alert_id() {
        let ok = ApiResponse::new(200, r#"[{"alertId":"ALT-1"},{"alertId":"ALT-2"}]"#);
        assert_eq!(sample_alert_id(&ok).as_deref(), Some("ALT-1"));

        let numeric = ApiResponse::new(200, r#"[{"alertId":42}]"#);
        assert_eq!(sample_alert_id(&numeric).as_deref(), Some("42"));

        assert_eq!(sample_alert_id(&ApiResponse::new(200, "[]")), None);
        assert_eq!(sample_alert_id(&ApiResponse::new(200, "{}")), None);
        assert_eq!(sample_alert_id(&ApiResponse::new(200, "oops")), None);
        assert_eq!(
            sample_alert_id(&ApiResponse::new(500, r#"[{"alertId":"ALT-1"}]"#)),
            None
        );
    }

    #[test]
    fn test_curl_command() {
        assert_eq!(
            curl_command(&Method::GET, "http://localhost:8083/api/alerts", &[]),
            "curl -X GET 'http://localhost:8083/api/alerts'"
        );
        assert_eq!(
            curl_command(
                &Method::POST,
                "http://localhost:8083/api/reports/generate",
                &[("machineId", "CONV_001".into()), ("reportType", "PERFORMANCE".into())]
            ),
            "curl -X POST 'http://localhost:8083/api/reports/generate' -G \
             --data-urlencode 'machineId=CONV_001' --data-urlencode 'reportType=PERFORMANCE'"
        );
    }

    #[test]
    fn test_display_target() {
        assert_eq!(display_target("/alerts", &[]), "/alerts");
        assert_eq!(
            display_target(
                "/alerts",
                &[("severity", "CRITICAL".into()), ("status", "NEW".into())]
            ),
            "/alerts?severity=CRITICAL&status=NEW"
        );
    }

    #[test]
    fn test_report_counts() {
        let outcome = |result| ProbeOutcome {
            description: "d".into(),
            method: "GET".into(),
            url: "u".into(),
            curl: "c".into(),
            result,
        };
        let report = SweepReport {
            service: Service::DigitalTwin,
            outcomes: vec![
                outcome(ProbeResult::Responded { status: 200, body: None }),
                outcome(ProbeResult::Responded { status: 404, body: None }),
                outcome(ProbeResult::Failed { error: "x".into() }),
                outcome(ProbeResult::Skipped { reason: "y".into() }),
            ],
        };
        assert_eq!(report.successes(), 1);
        assert_eq!(report.non_success(), 1);
        assert_eq!(report.failures(), 1);
        assert_eq!(report.skipped(), 1);
        assert!(!report.reachable());
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_resolved_paths_have_no_placeholder(id in "[A-Za-z0-9-]{1,16}") {
                for probe in Catalog::alert_analytics(now()).probes {
                    let path = probe.resolve_path(Some(&id)).unwrap();
                    prop_assert!(!path.contains(ALERT_ID_PLACEHOLDER));
                    if probe.needs_alert_id() {
                        prop_assert!(path.contains(&id));
                    }
                }
            }
        }
    }
}
