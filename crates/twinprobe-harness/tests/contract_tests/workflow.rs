//! Replay workflow against the alert analytics mock.
//!
//! # Toyota Way: Jidoka (自働化)
//! The run must stop at the first divergent step.

use std::time::Duration;

use twinprobe_core::{ProbeError, ServiceClient, ServiceEndpoint};
use twinprobe_harness::{RunOutcome, WORKFLOW_STEPS, WorkflowSettings, WorkflowValidator};

use super::server::{AlertBehavior, alert_analytics, dead_url};

fn settings(entity: &str) -> WorkflowSettings {
    WorkflowSettings {
        entity: entity.to_string(),
        status_settle: Duration::from_millis(10),
        control_settle: Duration::ZERO,
        final_settle: Duration::ZERO,
        ..WorkflowSettings::default()
    }
}

fn client(url: &str, timeout: Duration) -> ServiceClient {
    ServiceClient::new(ServiceEndpoint::new(url), timeout).unwrap()
}

/// Claim: a healthy service passes all nine steps.
#[tokio::test]
async fn test_healthy_service_passes_all_steps() {
    let server = alert_analytics(AlertBehavior::default()).await;
    let mut validator = WorkflowValidator::new(
        client(&server.url, Duration::from_secs(5)),
        settings("CONV_001"),
    );

    let report = validator.run().await;

    assert!(report.passed(), "{report:#?}");
    assert_eq!(report.steps.len(), WORKFLOW_STEPS);
    assert_eq!(report.session.as_ref().unwrap().as_str(), "replay-1");
    assert_eq!(server.state.lock().requests, 9);
    assert!(server.state.lock().sessions.is_empty());
}

/// Claim: the start call carries the derived window and the reference speed.
#[tokio::test]
async fn test_start_query_matches_window() {
    let server = alert_analytics(AlertBehavior::default()).await;
    let mut validator = WorkflowValidator::new(
        client(&server.url, Duration::from_secs(5)),
        settings("CONV_001"),
    );
    validator.run().await;

    let state = server.state.lock();
    let query = &state.start_queries[0];
    assert_eq!(query["startTime"], "2025-01-01T05:00:00.000Z");
    assert_eq!(query["endTime"], "2025-01-01T09:00:00.000Z");
    assert_eq!(query["speedMultiplier"], "5.0");
}

/// Claim: an entity without data aborts at step 1.
#[tokio::test]
async fn test_unknown_entity_aborts_at_boundaries() {
    let server = alert_analytics(AlertBehavior::default()).await;
    let mut validator = WorkflowValidator::new(
        client(&server.url, Duration::from_secs(5)),
        settings("CONV_404"),
    );

    let report = validator.run().await;

    assert!(!report.passed());
    assert_eq!(report.outcome, RunOutcome::Aborted { step: 1 });
    assert_eq!(report.steps[0].actual_status, Some(404));
    assert_eq!(server.state.lock().requests, 1);
}

/// Claim: a session that survives stop fails the final check.
#[tokio::test]
async fn test_session_surviving_stop_fails_final_check() {
    let server = alert_analytics(AlertBehavior {
        stop_keeps_session: true,
        ..AlertBehavior::default()
    })
    .await;
    let mut validator = WorkflowValidator::new(
        client(&server.url, Duration::from_secs(5)),
        settings("CONV_001"),
    );

    let report = validator.run().await;

    assert!(!report.passed());
    assert_eq!(report.outcome, RunOutcome::Aborted { step: 9 });
    let last = report.steps.last().unwrap();
    assert_eq!(last.expected_status, 404);
    assert_eq!(last.actual_status, Some(200));
}

/// Claim: an unreachable service fails step 1 at the transport level.
#[tokio::test]
async fn test_unreachable_service_fails_first_step() {
    let url = dead_url().await;
    let mut validator =
        WorkflowValidator::new(client(&url, Duration::from_secs(2)), settings("CONV_001"));

    let report = validator.run().await;

    assert_eq!(report.outcome, RunOutcome::Aborted { step: 1 });
    assert_eq!(report.steps[0].actual_status, None);
    assert!(report.steps[0].error.is_some());
}

/// Claim: a call slower than the request ceiling fails its step, no retry.
#[tokio::test]
async fn test_slow_status_times_out() {
    let server = alert_analytics(AlertBehavior {
        status_delay: Some(Duration::from_secs(3)),
        ..AlertBehavior::default()
    })
    .await;
    let timeout = Duration::from_millis(300);
    let mut validator =
        WorkflowValidator::new(client(&server.url, timeout), settings("CONV_001"));

    let report = validator.run().await;

    assert_eq!(report.outcome, RunOutcome::Aborted { step: 3 });
    let step = &report.steps[2];
    assert_eq!(step.actual_status, None);
    assert_eq!(
        step.error.as_deref(),
        Some(ProbeError::Timeout(timeout).to_string().as_str())
    );
    assert_eq!(server.state.lock().requests, 3);
}
