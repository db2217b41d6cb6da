//! Prometheus metrics for composition runs.
use prometheus::{
    Histogram, IntCounter, IntCounterVec, Registry, register_histogram_with_registry,
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
};
use std::sync::Arc;

use crate::pipeline::quality::RejectReason;

#[derive(Debug, Clone)]
pub struct Metrics {
    pub runs_completed: IntCounter,
    pub runs_failed: IntCounter,
    pub window_expansions: IntCounter,
    pub stale_fallbacks: IntCounter,
    pub history_ignored: IntCounter,
    pub quality_rejections: IntCounterVec,
    pub insights_selected: IntCounter,
    pub supplemental_insights: IntCounter,

    pub compose_duration: Histogram,
}

impl Metrics {
    /// Register every collector against `registry`.
    ///
    /// # Errors
    /// Fails when a collector with the same name is already registered.
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            runs_completed: register_int_counter_with_registry!(
                "digest_runs_completed_total",
                "Total number of digest compositions completed",
                registry
            )?,
            runs_failed: register_int_counter_with_registry!(
                "digest_runs_failed_total",
                "Total number of digest compositions failed",
                registry
            )?,
            window_expansions: register_int_counter_with_registry!(
                "digest_window_expansions_total",
                "Number of lookback window expansion steps",
                registry
            )?,
            stale_fallbacks: register_int_counter_with_registry!(
                "digest_stale_fallbacks_total",
                "Runs that abandoned the window and took the most recent updates",
                registry
            )?,
            history_ignored: register_int_counter_with_registry!(
                "digest_history_ignored_total",
                "Runs rebuilt with the sent history ignored",
                registry
            )?,
            quality_rejections: register_int_counter_vec_with_registry!(
                "digest_quality_rejections_total",
                "Updates rejected by the quality screen",
                &["reason"],
                registry
            )?,
            insights_selected: register_int_counter_with_registry!(
                "digest_insights_selected_total",
                "Insights included in composed digests",
                registry
            )?,
            supplemental_insights: register_int_counter_with_registry!(
                "digest_supplemental_insights_total",
                "Insights added by the domestic gap-fill",
                registry
            )?,
            compose_duration: register_histogram_with_registry!(
                "digest_compose_duration_seconds",
                "Duration of one digest composition",
                registry
            )?,
        })
    }

    pub fn record_rejections(&self, reason: RejectReason, count: usize) {
        self.quality_rejections
            .with_label_values(&[reason.as_str()])
            .inc_by(u64::try_from(count).unwrap_or(u64::MAX));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_are_labelled_by_reason() {
        let registry = Arc::new(Registry::new());
        let metrics = Metrics::new(Arc::clone(&registry)).expect("metrics");

        metrics.record_rejections(RejectReason::Junk, 3);
        metrics.record_rejections(RejectReason::Junk, 1);

        let value = metrics
            .quality_rejections
            .with_label_values(&["junk"])
            .get();
        assert_eq!(value, 4);
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = Arc::new(Registry::new());
        Metrics::new(Arc::clone(&registry)).expect("first registration");
        assert!(Metrics::new(registry).is_err());
    }
}
