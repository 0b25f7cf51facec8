//! Endpoint sweeps against the mock services.

use std::time::Duration;

use chrono::Utc;
use twinprobe_core::{Service, ServiceClient, ServiceEndpoint};
use twinprobe_harness::{Catalog, EndpointSweep, HarnessError, ProbeResult};

use super::server::{AlertBehavior, alert_analytics, dead_url, digital_twin};

fn client(url: &str) -> ServiceClient {
    ServiceClient::new(ServiceEndpoint::new(url), Duration::from_secs(5)).unwrap()
}

fn status(result: &ProbeResult) -> Option<u16> {
    match result {
        ProbeResult::Responded { status, .. } => Some(*status),
        _ => None,
    }
}

/// Claim: every alert analytics probe gets an answer and the sample alert
/// ID flows into the per-alert probes.
#[tokio::test]
async fn test_alert_analytics_sweep() {
    let server = alert_analytics(AlertBehavior::default()).await;
    let sweep = EndpointSweep::new(client(&server.url), Catalog::alert_analytics(Utc::now()));

    let report = sweep.run().await.unwrap();

    assert_eq!(report.service, Service::AlertAnalytics);
    assert_eq!(report.outcomes.len(), 20);
    assert!(report.reachable());
    assert_eq!(report.skipped(), 0);
    assert_eq!(report.successes(), 20, "{report:#?}");
    assert_eq!(
        server.state.lock().alert_calls,
        vec!["get ALT-1", "acknowledge ALT-1", "resolve ALT-1", "delete ALT-1"]
    );
    assert!(report.outcomes[7].url.ends_with("/api/alerts/ALT-1"));
    assert!(report.outcomes[1].curl.contains("--data-urlencode 'severity=CRITICAL'"));
}

/// Claim: without a sample alert the per-alert probes are skipped, not sent.
#[tokio::test]
async fn test_alert_probes_skipped_without_sample_id() {
    let server = alert_analytics(AlertBehavior {
        no_alerts: true,
        ..AlertBehavior::default()
    })
    .await;
    let sweep = EndpointSweep::new(client(&server.url), Catalog::alert_analytics(Utc::now()));

    let report = sweep.run().await.unwrap();

    assert_eq!(report.skipped(), 4);
    assert_eq!(report.outcomes.len(), 20);
    assert!(server.state.lock().alert_calls.is_empty());
}

/// Claim: the digital twin sweep observes delete-then-read as 404.
#[tokio::test]
async fn test_digital_twin_sweep() {
    let url = digital_twin().await;
    let sweep = EndpointSweep::new(client(&url), Catalog::digital_twin());

    let report = sweep.run().await.unwrap();

    let statuses: Vec<Option<u16>> = report.outcomes.iter().map(|o| status(&o.result)).collect();
    assert_eq!(
        statuses,
        vec![
            Some(200),
            Some(200),
            Some(200),
            Some(200),
            Some(200),
            Some(200),
            Some(404),
            Some(404),
            Some(404),
        ]
    );
    assert_eq!(report.non_success(), 3);
    assert!(report.reachable());
}

/// Claim: an unreachable service aborts the sweep at the first probe.
#[tokio::test]
async fn test_unreachable_service_aborts_sweep() {
    let url = dead_url().await;
    let sweep = EndpointSweep::new(client(&url), Catalog::digital_twin());

    let err = sweep.run().await.unwrap_err();
    assert!(matches!(err, HarnessError::Abort(_)));
    assert!(err.is_unreachable());
    assert!(err.to_string().contains("Digital Twin"));
}

/// Claim: an invalid base URL is a setup error, not an unreachable service.
#[test]
fn test_connect_rejects_invalid_endpoint() {
    let result = EndpointSweep::connect(
        ServiceEndpoint::new("localhost:8082"),
        Duration::from_secs(5),
        Catalog::digital_twin(),
    );
    let Err(err) = result else {
        panic!("invalid endpoint accepted");
    };
    assert!(matches!(err, HarnessError::Core(_)));
    assert!(!err.is_unreachable());
}
