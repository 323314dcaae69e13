//! Test Evaluator - Verdicts and Reports
//!
//! **Core Responsibility:**
//! Judge one execution result against its test case and fold per-case
//! verdicts into a report.
//!
//! **Critical Properties:**
//! - Knows nothing about the interpreter
//! - Knows nothing about argument shapes
//! - Pure functions: (test case, execution result) → verdict
//!
//! **Verdict Rules:**
//! - A failed execution never passes
//! - Otherwise outputs are compared under the configured `ComparisonMode`
//! - Hidden cases report `[Hidden]` for input and expected value, always
//!
//! **Report Rules:**
//! - passed_count = number of passed results
//! - all_passed = passed_count == total_count (true for an empty run)

use algolab_common::types::{
    ComparisonMode, ExecutionResult, TestCase, TestCaseResult, TestReport, HIDDEN_PLACEHOLDER,
};
use tracing::debug;

use crate::canonical;

/// Text shown for an expectation that is absent from the test case.
const UNDEFINED_TEXT: &str = "undefined";

/// Evaluate a single test case execution result
///
/// ## Arguments
/// * `test_case` - Test case definition (input, expectation, visibility)
/// * `result` - Execution result of the user function for this case
/// * `mode` - How outputs are compared
pub fn evaluate_case(test_case: &TestCase, result: ExecutionResult, mode: ComparisonMode) -> TestCaseResult {
    let expected = test_case.expected_value();

    let passed = result.success && canonical::outputs_match(result.output.as_ref(), expected, mode);

    let (input, expected_output) = if test_case.is_hidden {
        (HIDDEN_PLACEHOLDER.to_string(), HIDDEN_PLACEHOLDER.to_string())
    } else {
        (
            canonical::to_canonical_string(&test_case.input),
            canonical::serialize(expected).unwrap_or_else(|| UNDEFINED_TEXT.to_string()),
        )
    };

    let actual_output = if result.success {
        canonical::serialize(result.output.as_ref())
    } else {
        None
    };

    TestCaseResult {
        input,
        expected_output,
        actual_output,
        passed,
        error: result.error,
        execution_time: result.execution_time,
        is_hidden: test_case.is_hidden,
        logs: result.logs,
    }
}

/// Aggregate per-case results into the final report, preserving order.
pub fn aggregate(results: Vec<TestCaseResult>) -> TestReport {
    let total_count = results.len();
    let passed_count = results.iter().filter(|r| r.passed).count();

    for (idx, result) in results.iter().enumerate() {
        debug!(
            case = idx + 1,
            passed = result.passed,
            hidden = result.is_hidden,
            execution_ms = result.execution_time,
            "Test case verdict"
        );
    }

    TestReport {
        results,
        passed_count,
        total_count,
        all_passed: passed_count == total_count,
    }
}
