//! Momentum Tracker Agent — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.

use std::path::PathBuf;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use momentum_tracker::anomaly::ExpectedRanges;
use momentum_tracker::api::{self, AppState};
use momentum_tracker::config::model::ModelConfig;
use momentum_tracker::metrics::Metrics;
use momentum_tracker::policy::{
    start_hot_reload_thread, PolicyHandle, ScoringPolicy, DEFAULT_POLICY_CONFIG_PATH,
    ENV_POLICY_CONFIG_PATH,
};
use momentum_tracker::synth::{build_provider, Synthesizer};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - MOMENTUM_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("MOMENTUM_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("momentum=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments. This enables
    // POLICY_CONFIG_PATH / GROQ_API_KEY from .env before config loads.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    // --- Scoring/detection policy, with optional dev hot reload ---
    let policy = ScoringPolicy::from_toml().expect("Failed to load scoring policy");
    let handle = PolicyHandle::new(policy);

    let path = std::env::var(ENV_POLICY_CONFIG_PATH)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_POLICY_CONFIG_PATH));
    start_hot_reload_thread(handle.clone(), path);

    // --- Expected ranges + model client ---
    let ranges = ExpectedRanges::load_from_file("config/expected_ranges.json");
    let model_cfg = ModelConfig::load_or_default("config/model.json");
    let provider = build_provider(&model_cfg);
    let synthesizer = Synthesizer::new(provider, &model_cfg);

    // Optional one-off smoke test of the model client.
    if std::env::var("MODEL_QUICK_PROBE").ok().as_deref() == Some("1") {
        if let Err(e) = momentum_tracker::run_model_quick_probe().await {
            tracing::warn!(error = ?e, "model quick probe didn't run");
        }
    }

    // Build AppState and pass it into the router; merge the Prometheus route.
    let metrics = Metrics::init();
    let state = AppState::new(handle, ranges, synthesizer);
    let router = api::create_router(state).merge(metrics.router());

    Ok(router.into())
}
