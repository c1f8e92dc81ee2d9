//! Prometheus wiring and the metric names used across the crate.

use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Incremented when zero-shot classification lands on the keyword path.
pub const CLASSIFY_FALLBACK_TOTAL: &str = "classify_fallback_total";
/// Incremented when reply generation lands on the template path.
pub const REPLY_FALLBACK_TOTAL: &str = "reply_fallback_total";
/// Incremented once per successfully processed comment.
pub const COMMENTS_PROCESSED_TOTAL: &str = "comments_processed_total";

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and expose a static gauge with the
    /// number of configured categories (sanity signal for config loads).
    pub fn init(category_count: usize) -> Self {
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        gauge!("profile_categories").set(category_count as f64);

        Self { handle }
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
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
