use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::anomaly::{detect, AnomalyAlert, ExpectedRanges};
use crate::context::format_context;
use crate::history::{RunLog, RunSummary, SnapshotHistory};
use crate::insight::AiInsights;
use crate::momentum::{self, MomentumScore};
use crate::policy::PolicyHandle;
use crate::snapshot::{MetricSnapshot, ProjectConfig};
use crate::synth::Synthesizer;

fn default_time_window() -> u32 {
    48
}
fn default_update_interval() -> u32 {
    60
}

#[derive(Clone)]
pub struct AppState {
    pub policy: PolicyHandle,
    pub ranges: Arc<ExpectedRanges>,
    pub history: Arc<SnapshotHistory>,
    pub runs: Arc<RunLog>,
    pub synthesizer: Arc<Synthesizer>,
}

impl AppState {
    pub fn new(
        policy: PolicyHandle,
        ranges: ExpectedRanges,
        synthesizer: Synthesizer,
    ) -> Self {
        Self {
            policy,
            ranges: Arc::new(ranges),
            history: Arc::new(SnapshotHistory::with_capacity(2_000)),
            runs: Arc::new(RunLog::with_capacity(2_000)),
            synthesizer: Arc::new(synthesizer),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/agent/run", post(run_agent))
        .route("/debug/history", get(debug_history))
        .route("/debug/last-run", get(debug_last_run))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// One analysis cycle: snapshot + project + run parameters in, score +
/// alerts + insight out.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunRequest {
    #[serde(default)]
    pub project: Option<ProjectConfig>,
    pub snapshot: MetricSnapshot,
    /// Hours of history to consider.
    #[serde(default = "default_time_window")]
    pub time_window: u32,
    /// Minutes between cycles. Informational; scheduling lives with the caller.
    #[serde(default = "default_update_interval")]
    pub update_interval: u32,
    /// Sensitivity passed to the detector; falls back to the policy default.
    #[serde(default)]
    pub anomaly_threshold: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<MomentumScore>,
    pub alerts: Vec<AnomalyAlert>,
    /// `null` is the explicit "insight unavailable" state.
    pub insights: Option<AiInsights>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_error: Option<String>,
}

impl AgentRunResponse {
    fn error(message: String) -> Self {
        Self {
            status: "error",
            error: Some(message),
            score: None,
            alerts: Vec::new(),
            insights: None,
            insight_error: None,
        }
    }
}

async fn run_agent(
    State(state): State<AppState>,
    Json(req): Json<AgentRunRequest>,
) -> (StatusCode, Json<AgentRunResponse>) {
    // Fail fast on malformed input; nothing is recorded.
    if let Err(e) = req.snapshot.validate() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(AgentRunResponse::error(e.to_string())),
        );
    }

    let policy = state.policy.current();
    let threshold = req
        .anomaly_threshold
        .filter(|t| t.is_finite() && *t > 0.0)
        .unwrap_or(policy.default_anomaly_threshold);
    tracing::debug!(
        time_window = req.time_window,
        update_interval = req.update_interval,
        threshold,
        "agent run"
    );

    // Detector and scorer are independent consumers of the same snapshot.
    let alerts = detect(&req.snapshot, &state.ranges, threshold, &policy);

    state.history.record(req.snapshot.clone(), req.time_window);
    let series = state.history.series();
    let score = match momentum::score(&series, &policy) {
        Ok(s) => s,
        Err(e) => {
            // Unreachable after a record(), but never panic on it.
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(AgentRunResponse::error(e.to_string())),
            );
        }
    };

    // Synthesis failure must not block score/alerts delivery.
    let context = format_context(req.project.as_ref(), &req.snapshot, &alerts);
    let (insights, insight_error) = match state.synthesizer.synthesize(&context).await {
        Ok(i) => (Some(i), None),
        Err(e) => {
            tracing::warn!(provider = state.synthesizer.provider_name(), "{e}");
            (None, Some(e.to_string()))
        }
    };

    state.runs.push(RunSummary {
        ts: Utc::now(),
        snapshot_timestamp: req.snapshot.timestamp,
        overall: score.overall,
        trend: score.trend,
        confidence: score.confidence,
        alert_count: alerts.len(),
        insight_available: insights.is_some(),
    });
    crate::metrics::record_run(&score, alerts.len());

    (
        StatusCode::OK,
        Json(AgentRunResponse {
            status: "ok",
            error: None,
            score: Some(score),
            alerts,
            insights,
            insight_error,
        }),
    )
}

async fn debug_history(State(state): State<AppState>) -> Json<Vec<RunSummary>> {
    Json(state.runs.snapshot_last_n(10))
}

async fn debug_last_run(State(state): State<AppState>) -> Json<Option<RunSummary>> {
    Json(state.runs.snapshot_last_n(1).pop())
}
