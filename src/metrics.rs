//! Request metrics and observability.
//!
//! Counters for translation requests, passthroughs, detection fallbacks and
//! failures. A single instance lives in the application state and is
//! reported by `GET /metrics`.

use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct GatewayMetrics {
    /// Number of `POST /translate` requests received
    requests: AtomicUsize,

    /// Number of requests answered by echoing the input
    passthroughs: AtomicUsize,

    /// Number of times detection failed and English was assumed
    detection_fallbacks: AtomicUsize,

    /// Number of model invocations that produced a translation
    translations: AtomicUsize,

    /// Number of model invocations (or loads) that failed
    translation_failures: AtomicUsize,

    /// Number of requests naming an unsupported model
    unknown_models: AtomicUsize,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_passthrough(&self) {
        self.passthroughs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_detection_fallback(&self) {
        self.detection_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translation(&self) {
        self.translations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_translation_failure(&self) {
        self.translation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unknown_model(&self) {
        self.unknown_models.fetch_add(1, Ordering::Relaxed);
    }

    /// Generate a metrics report.
    pub fn report(&self) -> MetricsReport {
        let requests = self.requests.load(Ordering::Relaxed);
        let passthroughs = self.passthroughs.load(Ordering::Relaxed);
        let translations = self.translations.load(Ordering::Relaxed);
        let failures = self.translation_failures.load(Ordering::Relaxed);

        let passthrough_rate = if requests > 0 {
            (passthroughs as f64 / requests as f64) * 100.0
        } else {
            0.0
        };

        let attempts = translations + failures;
        let translation_success_rate = if attempts > 0 {
            (translations as f64 / attempts as f64) * 100.0
        } else {
            0.0
        };

        MetricsReport {
            requests,
            passthroughs,
            passthrough_rate,
            detection_fallbacks: self.detection_fallbacks.load(Ordering::Relaxed),
            translations,
            translation_failures: failures,
            translation_success_rate,
            unknown_models: self.unknown_models.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of the gateway counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub requests: usize,
    pub passthroughs: usize,

    /// Passthroughs as a percentage of requests (0-100)
    pub passthrough_rate: f64,

    pub detection_fallbacks: usize,
    pub translations: usize,
    pub translation_failures: usize,

    /// Successful invocations as a percentage of attempted ones (0-100)
    pub translation_success_rate: f64,

    pub unknown_models: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_metrics_are_zero() {
        let report = GatewayMetrics::new().report();
        assert_eq!(report.requests, 0);
        assert_eq!(report.passthrough_rate, 0.0);
        assert_eq!(report.translation_success_rate, 0.0);
    }

    #[test]
    fn test_rates() {
        let metrics = GatewayMetrics::new();
        for _ in 0..4 {
            metrics.record_request();
        }
        metrics.record_passthrough();
        metrics.record_translation();
        metrics.record_translation();
        metrics.record_translation();
        metrics.record_translation_failure();

        let report = metrics.report();
        assert_eq!(report.passthrough_rate, 25.0);
        assert_eq!(report.translation_success_rate, 75.0);
    }

    #[test]
    fn test_counters() {
        let metrics = GatewayMetrics::new();
        metrics.record_detection_fallback();
        metrics.record_unknown_model();
        metrics.record_unknown_model();

        let report = metrics.report();
        assert_eq!(report.detection_fallbacks, 1);
        assert_eq!(report.unknown_models, 2);
    }

    #[test]
    fn test_report_serialization() {
        let metrics = GatewayMetrics::new();
        metrics.record_request();
        let json = serde_json::to_value(metrics.report()).expect("Should serialize");

        assert_eq!(json["requests"], 1);
        assert!(json.get("translation_success_rate").is_some());
    }
}
