// HTTP route handlers for the AlgoLab API

use algolab_common::types::{
    CallConvention, ComparisonMode, ExecutionResult, TestCase, TestReport,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, instrument, warn, Span};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    #[serde(default)]
    pub source_code: String,
    pub function_name: Option<String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub pass_as_is: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteArgsRequest {
    #[serde(default)]
    pub source_code: String,
    pub function_name: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    #[serde(default)]
    pub source_code: String,
    pub function_name: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    pub call_convention: Option<CallConvention>,
    pub comparison: Option<ComparisonMode>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResponse {
    pub submission_id: Uuid,
    pub graded_at: DateTime<Utc>,
    pub report: TestReport,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

fn require_source(source: &str) -> Result<(), Response> {
    if source.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "sourceCode cannot be empty"));
    }
    Ok(())
}

/// Run interpreter work off the async runtime under the request timeout.
///
/// A blocking task cannot be cancelled: after a timeout it keeps running
/// until it returns or an interpreter limit (`EngineConfig::limits`) aborts it.
async fn run_blocking<T, F>(state: &AppState, work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let timeout = state.request_timeout;
    match tokio::time::timeout(timeout, tokio::task::spawn_blocking(work)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_err)) => {
            error!(error = %join_err, "Execution task failed");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Execution task failed: {}", join_err),
            ))
        }
        Err(_) => {
            metrics::TIMEOUTS.inc();
            warn!(timeout_ms = timeout.as_millis() as u64, "Request timed out");
            Err(error_response(
                StatusCode::GATEWAY_TIMEOUT,
                format!("Execution exceeded {} ms", timeout.as_millis()),
            ))
        }
    }
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn prometheus_metrics() -> impl IntoResponse {
    metrics::render_metrics()
}

/// POST /api/v1/execute - Run one function with a single input
#[instrument(skip_all, fields(submission_id = tracing::field::Empty, function = tracing::field::Empty))]
pub async fn execute(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteRequest>,
) -> Response {
    metrics::SUBMISSIONS.with_label_values(&["execute"]).inc();
    Span::current().record("submission_id", tracing::field::display(Uuid::new_v4()));

    if let Err(response) = require_source(&payload.source_code) {
        return response;
    }

    let name = state
        .grader
        .resolve_function_name(&payload.source_code, payload.function_name.as_deref());
    Span::current().record("function", name.as_str());

    let worker = Arc::clone(&state);
    let outcome = run_blocking(&state, move || {
        worker
            .grader
            .engine()
            .execute(&payload.source_code, &name, &payload.input, payload.pass_as_is)
    })
    .await;

    respond_with_execution(outcome)
}

/// POST /api/v1/execute/args - Run one function with positional arguments
#[instrument(skip_all, fields(submission_id = tracing::field::Empty, function = tracing::field::Empty))]
pub async fn execute_args(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteArgsRequest>,
) -> Response {
    metrics::SUBMISSIONS.with_label_values(&["execute_args"]).inc();
    Span::current().record("submission_id", tracing::field::display(Uuid::new_v4()));

    if let Err(response) = require_source(&payload.source_code) {
        return response;
    }

    let name = state
        .grader
        .resolve_function_name(&payload.source_code, payload.function_name.as_deref());
    Span::current().record("function", name.as_str());

    let worker = Arc::clone(&state);
    let outcome = run_blocking(&state, move || {
        worker
            .grader
            .engine()
            .execute_with_args(&payload.source_code, &name, &payload.args)
    })
    .await;

    respond_with_execution(outcome)
}

fn respond_with_execution(outcome: Result<ExecutionResult, Response>) -> Response {
    match outcome {
        Ok(result) => {
            info!(
                success = result.success,
                execution_ms = result.execution_time,
                "Execution finished"
            );
            (StatusCode::OK, Json(result)).into_response()
        }
        Err(response) => response,
    }
}

/// POST /api/v1/grade - Grade a submission against test cases
#[instrument(skip_all, fields(submission_id = tracing::field::Empty))]
pub async fn grade(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GradeRequest>,
) -> Response {
    metrics::SUBMISSIONS.with_label_values(&["grade"]).inc();

    let submission_id = Uuid::new_v4();
    Span::current().record("submission_id", tracing::field::display(submission_id));

    if let Err(response) = require_source(&payload.source_code) {
        return response;
    }

    let name = state
        .grader
        .resolve_function_name(&payload.source_code, payload.function_name.as_deref());
    let comparison = payload.comparison.unwrap_or(state.grader.comparison());

    info!(
        function = %name,
        test_cases = payload.test_cases.len(),
        comparison = %comparison,
        "Grading submission"
    );

    let timer = metrics::GRADING_DURATION.start_timer();
    let worker = Arc::clone(&state);
    let outcome = run_blocking(&state, move || {
        worker.grader.grade_with(
            &payload.source_code,
            &name,
            &payload.test_cases,
            payload.call_convention.as_ref(),
            comparison,
        )
    })
    .await;
    timer.observe_duration();

    match outcome {
        Ok(report) => {
            metrics::record_report(&report);
            info!(
                passed = report.passed_count,
                total = report.total_count,
                "Submission graded"
            );
            (
                StatusCode::OK,
                Json(GradeResponse {
                    submission_id,
                    graded_at: Utc::now(),
                    report,
                }),
            )
                .into_response()
        }
        Err(response) => response,
    }
}
