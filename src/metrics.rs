use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::momentum::MomentumScore;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize Prometheus recorder and zero the per-run gauges.
    pub fn init() -> Self {
        // Use default buckets to avoid API differences across crate versions.
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("momentum_overall").set(0.0);
        gauge!("momentum_confidence").set(0.0);
        gauge!("anomaly_alerts_last_run").set(0.0);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// Publish the outcome of one analysis run. No-op when no recorder is
/// installed (unit tests).
pub fn record_run(score: &MomentumScore, alert_count: usize) {
    gauge!("momentum_overall").set(score.overall);
    gauge!("momentum_confidence").set(score.confidence);
    gauge!("anomaly_alerts_last_run").set(alert_count as f64);
}
