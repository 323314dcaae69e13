//! Prometheus metrics for the grading service.
//!
//! Exposed via GET /metrics.

use algolab_common::types::TestReport;
use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use tracing::warn;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Requests accepted per endpoint (`execute`, `execute_args`, `grade`).
    pub static ref SUBMISSIONS: IntCounterVec = IntCounterVec::new(
        Opts::new("algolab_submissions_total", "Submissions received by endpoint"),
        &["endpoint"]
    )
    .unwrap();

    /// Graded test cases by outcome (`passed`, `failed`, `error`).
    pub static ref TEST_CASES: IntCounterVec = IntCounterVec::new(
        Opts::new("algolab_test_cases_total", "Graded test cases by outcome"),
        &["outcome"]
    )
    .unwrap();

    pub static ref GRADING_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("algolab_grading_duration_seconds", "Wall-clock time of one grading request")
            .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    )
    .unwrap();

    pub static ref TIMEOUTS: IntCounter = IntCounter::new(
        "algolab_request_timeouts_total",
        "Requests that exceeded the request timeout"
    )
    .unwrap();
}

/// Register all metrics with [`REGISTRY`]. Safe to call more than once.
pub fn register_metrics() {
    let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
        Box::new(SUBMISSIONS.clone()),
        Box::new(TEST_CASES.clone()),
        Box::new(GRADING_DURATION.clone()),
        Box::new(TIMEOUTS.clone()),
    ];

    for collector in collectors {
        if let Err(e) = REGISTRY.register(collector) {
            if !matches!(e, prometheus::Error::AlreadyReg) {
                warn!(error = %e, "Failed to register metric");
            }
        }
    }
}

pub fn record_report(report: &TestReport) {
    for result in &report.results {
        let outcome = match (result.passed, result.error.is_some()) {
            (true, _) => "passed",
            (false, true) => "error",
            (false, false) => "failed",
        };
        TEST_CASES.with_label_values(&[outcome]).inc();
    }
}

/// Render metrics in Prometheus text format.
pub fn render_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use algolab_common::types::{ErrorInfo, TestCaseResult};

    fn result(passed: bool, error: bool) -> TestCaseResult {
        TestCaseResult {
            input: "1".to_string(),
            expected_output: "1".to_string(),
            actual_output: None,
            passed,
            error: error.then(|| ErrorInfo::new("x")),
            execution_time: 0.0,
            is_hidden: false,
            logs: vec![],
        }
    }

    #[test]
    fn test_record_report_by_outcome() {
        register_metrics();
        register_metrics();

        let before_error = TEST_CASES.with_label_values(&["error"]).get();
        let before_passed = TEST_CASES.with_label_values(&["passed"]).get();

        record_report(&TestReport {
            results: vec![result(true, false), result(false, true), result(false, false)],
            passed_count: 1,
            total_count: 3,
            all_passed: false,
        });

        assert!(TEST_CASES.with_label_values(&["error"]).get() >= before_error + 1);
        assert!(TEST_CASES.with_label_values(&["passed"]).get() >= before_passed + 1);
        assert!(render_metrics().contains("algolab_test_cases_total"));
    }
}
