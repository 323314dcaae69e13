use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Shown instead of the input and expected value of hidden test cases.
pub const HIDDEN_PLACEHOLDER: &str = "[Hidden]";

/// Function invoked when neither the caller nor the source names one.
pub const DEFAULT_FUNCTION_NAME: &str = "solution";

/// How actual and expected outputs are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Equal iff the canonical JSON texts are identical (key order matters).
    #[default]
    Serialized,
    /// Key order ignored, numbers compared by value.
    Structural,
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ComparisonMode::Serialized => write!(f, "serialized"),
            ComparisonMode::Structural => write!(f, "structural"),
        }
    }
}

impl std::str::FromStr for ComparisonMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serialized" => Ok(ComparisonMode::Serialized),
            "structural" => Ok(ComparisonMode::Structural),
            other => Err(format!("unknown comparison mode: {}", other)),
        }
    }
}

/// Calling convention declared by an exercise author.
///
/// When present it replaces the shape heuristic for the test case input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CallConvention {
    /// `fn(input)`
    Single,
    /// `fn(...input)`
    Spread,
    /// `fn(input[k1], input[k2], ...)`; an empty list means JavaScript key order.
    Named {
        #[serde(default)]
        keys: Vec<String>,
    },
}

/// Deserializes a field that is present in the document, including `null`.
///
/// Combined with `#[serde(default)]` this keeps "absent" (undefined) apart
/// from an explicit `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// A single exercise test case as stored in lesson content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: Value,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<Value>,
    /// Legacy name of `expectedOutput`.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallConvention>,
}

impl TestCase {
    pub fn new(input: Value, expected_output: Value) -> Self {
        Self {
            input,
            expected_output: Some(expected_output),
            expected: None,
            is_hidden: false,
            call: None,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    pub fn with_call(mut self, call: CallConvention) -> Self {
        self.call = Some(call);
        self
    }

    /// Expected value, preferring `expectedOutput` over the legacy `expected`.
    /// `None` means the case defines no expectation at all (undefined).
    pub fn expected_value(&self) -> Option<&Value> {
        self.expected_output.as_ref().or(self.expected.as_ref())
    }
}

/// Exercise record consumed from the lesson store. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub starter_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_convention: Option<CallConvention>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub message: String,
    pub line_number: Option<u32>,
    pub stack: String,
}

impl ErrorInfo {
    /// Error raised by the engine itself rather than by user code.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            stack: format!("Error: {}", message),
            message,
            line_number: None,
        }
    }
}

/// Outcome of one invocation of a user function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    /// `None` when execution failed or the function returned `undefined`.
    #[serde(default)]
    pub output: Option<Value>,
    pub logs: Vec<String>,
    /// Wall-clock milliseconds.
    pub execution_time: f64,
    pub error: Option<ErrorInfo>,
}

impl ExecutionResult {
    pub fn succeeded(output: Option<Value>, logs: Vec<String>, execution_time: f64) -> Self {
        Self {
            success: true,
            output,
            logs,
            execution_time,
            error: None,
        }
    }

    pub fn failed(error: ErrorInfo, logs: Vec<String>, execution_time: f64) -> Self {
        Self {
            success: false,
            output: None,
            logs,
            execution_time,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    /// Serialized input, or [`HIDDEN_PLACEHOLDER`].
    pub input: String,
    /// Serialized expected value, or [`HIDDEN_PLACEHOLDER`].
    pub expected_output: String,
    pub actual_output: Option<String>,
    pub passed: bool,
    pub error: Option<ErrorInfo>,
    pub execution_time: f64,
    pub is_hidden: bool,
    #[serde(default)]
    pub logs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub results: Vec<TestCaseResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub all_passed: bool,
}
