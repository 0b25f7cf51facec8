//! In-process mock services built on axum.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use parking_lot::Mutex;
use serde_json::json;

/// Binds `router` to an ephemeral loopback port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Returns a loopback URL nothing is listening on.
pub async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

// ============================================================================
// Alert analytics
// ============================================================================

/// Knobs for misbehaving alert analytics servers.
#[derive(Debug, Clone, Default)]
pub struct AlertBehavior {
    /// Stop answers 200 but leaves the session in place.
    pub stop_keeps_session: bool,
    /// Status calls take this long to answer.
    pub status_delay: Option<Duration>,
    /// GET /alerts returns an empty list.
    pub no_alerts: bool,
}

/// Shared state of the alert analytics mock.
#[derive(Debug, Default)]
pub struct AlertState {
    pub behavior: AlertBehavior,
    pub sessions: HashMap<String, &'static str>,
    pub next_session: u32,
    pub start_queries: Vec<HashMap<String, String>>,
    pub alert_calls: Vec<String>,
    pub requests: u32,
}

/// Handle to a running alert analytics mock.
pub struct AlertServer {
    pub url: String,
    pub state: Arc<Mutex<AlertState>>,
}

type Shared = Arc<Mutex<AlertState>>;

/// Starts an alert analytics mock with data for `CONV_001`.
pub async fn alert_analytics(behavior: AlertBehavior) -> AlertServer {
    let state: Shared = Arc::new(Mutex::new(AlertState {
        behavior,
        next_session: 1,
        ..AlertState::default()
    }));

    let router = Router::new()
        .route("/api/replay/:id/:op", get(replay_get).post(replay_post))
        .route("/api/alerts", get(list_alerts))
        .route("/api/alerts/machine/:id", get(list_alerts_by_machine))
        .route("/api/alerts/:id", get(alert_by_id).delete(delete_alert))
        .route("/api/alerts/acknowledge/:id", post(acknowledge_alert))
        .route("/api/alerts/resolve/:id", post(resolve_alert))
        .route("/api/analytics/metrics", get(metrics))
        .route("/api/analytics/metrics/:id", get(metrics))
        .route("/api/analytics/metrics/:id/historical", get(historical))
        .route("/api/analytics/trends", get(trends))
        .route("/api/analytics/trends/:id", get(trends))
        .route("/api/reports", get(reports))
        .route("/api/reports/type/:id", get(reports))
        .route("/api/reports/generate", post(generate_report))
        .route("/api/config/reload", post(reload))
        .with_state(Arc::clone(&state));

    let addr = serve(router).await;
    AlertServer {
        url: format!("http://{addr}"),
        state,
    }
}

async fn replay_get(State(state): State<Shared>, Path((id, op)): Path<(String, String)>) -> Response {
    let delay = {
        let mut s = state.lock();
        s.requests += 1;
        s.behavior.status_delay
    };
    match op.as_str() {
        "time-boundaries" if id == "CONV_001" => Json(json!({
            "minTime": "2025-01-01T00:00:00Z",
            "maxTime": "2025-01-01T10:00:00Z",
        }))
        .into_response(),
        "time-boundaries" => (StatusCode::NOT_FOUND, "no data").into_response(),
        "status" => {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let s = state.lock();
            match s.sessions.get(&id) {
                Some(st) => Json(json!({ "sessionId": id, "state": st })).into_response(),
                None => StatusCode::NOT_FOUND.into_response(),
            }
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn replay_post(
    State(state): State<Shared>,
    Path((id, op)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut s = state.lock();
    s.requests += 1;
    if op == "start" {
        if id != "CONV_001" {
            return StatusCode::NOT_FOUND.into_response();
        }
        s.start_queries.push(query);
        let session = format!("replay-{}", s.next_session);
        s.next_session += 1;
        s.sessions.insert(session.clone(), "RUNNING");
        return (StatusCode::OK, format!("{session}\n")).into_response();
    }

    let stop_keeps_session = s.behavior.stop_keeps_session;
    let Some(current) = s.sessions.get(&id).copied() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    match (op.as_str(), current) {
        ("pause", "RUNNING") => {
            s.sessions.insert(id, "PAUSED");
        }
        ("resume", "PAUSED") => {
            s.sessions.insert(id, "RUNNING");
        }
        ("stop", _) => {
            if !stop_keeps_session {
                s.sessions.remove(&id);
            }
        }
        _ => return StatusCode::CONFLICT.into_response(),
    }
    StatusCode::OK.into_response()
}

async fn list_alerts(State(state): State<Shared>) -> Response {
    let mut s = state.lock();
    s.requests += 1;
    if s.behavior.no_alerts {
        return Json(json!([])).into_response();
    }
    Json(json!([
        { "alertId": "ALT-1", "machineId": "CONV_001", "severity": "CRITICAL", "status": "NEW" },
        { "alertId": "ALT-2", "machineId": "CONV_001", "severity": "LOW", "status": "NEW" },
    ]))
    .into_response()
}

async fn list_alerts_by_machine(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    state.lock().requests += 1;
    Json(json!([{ "alertId": "ALT-1", "machineId": id }])).into_response()
}

fn alert_action(state: &Shared, action: &str, id: &str) -> Response {
    let mut s = state.lock();
    s.requests += 1;
    s.alert_calls.push(format!("{action} {id}"));
    if id == "ALT-1" {
        Json(json!({ "alertId": id, "action": action })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn alert_by_id(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    alert_action(&state, "get", &id)
}

async fn delete_alert(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    alert_action(&state, "delete", &id)
}

async fn acknowledge_alert(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    alert_action(&state, "acknowledge", &id)
}

async fn resolve_alert(State(state): State<Shared>, Path(id): Path<String>) -> Response {
    alert_action(&state, "resolve", &id)
}

async fn metrics(State(state): State<Shared>) -> Response {
    state.lock().requests += 1;
    Json(json!([{ "machineId": "CONV_001", "oee": 0.87 }])).into_response()
}

async fn historical(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.lock().requests += 1;
    if query.contains_key("fromTime") && query.contains_key("toTime") {
        Json(json!([])).into_response()
    } else {
        StatusCode::BAD_REQUEST.into_response()
    }
}

async fn trends(State(state): State<Shared>) -> Response {
    state.lock().requests += 1;
    Json(json!({ "trend": "STABLE" })).into_response()
}

async fn reports(State(state): State<Shared>) -> Response {
    state.lock().requests += 1;
    Json(json!([])).into_response()
}

async fn generate_report(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.lock().requests += 1;
    match (query.get("machineId"), query.get("reportType")) {
        (Some(machine), Some(kind)) => {
            Json(json!({ "machineId": machine, "reportType": kind })).into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn reload(State(state): State<Shared>) -> Response {
    state.lock().requests += 1;
    (StatusCode::OK, "Configuration reloaded").into_response()
}

// ============================================================================
// Digital twin
// ============================================================================

type Twins = Arc<Mutex<HashMap<String, serde_json::Value>>>;

/// Starts a digital twin mock holding state for `RECP_001`.
pub async fn digital_twin() -> String {
    let twins: Twins = Arc::new(Mutex::new(HashMap::from([(
        "RECP_001".to_string(),
        json!({ "machineId": "RECP_001", "status": "RUNNING", "temperature": 71.5 }),
    )])));

    let router = Router::new()
        .route("/actuator/health", get(|| async { Json(json!({ "status": "UP" })) }))
        .route("/actuator/info", get(|| async { Json(json!({})) }))
        .route(
            "/actuator/metrics",
            get(|| async { Json(json!({ "names": ["jvm.memory.used"] })) }),
        )
        .route("/api/digital-twin/states", get(all_states))
        .route("/api/digital-twin/state/:id", get(one_state).delete(delete_state))
        .with_state(twins);

    format!("http://{}", serve(router).await)
}

async fn all_states(State(twins): State<Twins>) -> Response {
    let twins = twins.lock();
    Json(json!(twins.values().cloned().collect::<Vec<_>>())).into_response()
}

async fn one_state(State(twins): State<Twins>, Path(id): Path<String>) -> Response {
    match twins.lock().get(&id) {
        Some(state) => Json(state.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_state(State(twins): State<Twins>, Path(id): Path<String>) -> Response {
    match twins.lock().remove(&id) {
        Some(_) => StatusCode::OK.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
