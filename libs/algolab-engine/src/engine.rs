//! Script Engine - Execution Primitives for User Functions
//!
//! **Core Responsibility:**
//! Compile user-submitted JavaScript, call one named function with a given
//! argument list, and capture output, console logs, errors and timing.
//!
//! **Critical Architectural Boundary:**
//! - Engine knows HOW to call (interpreter, harness, limits)
//! - Engine does NOT decide argument shapes beyond the object rule
//! - Engine does NOT compare outputs
//!
//! **Execution Rules:**
//! 1. Every call gets a fresh interpreter context (no shared globals)
//! 2. Source is compiled with the `Function` constructor, `console` injected
//! 3. Arguments cross into the context as JSON text (callers' values are never touched)
//! 4. Loop, recursion and stack limits are installed before evaluation
//! 5. Every failure, including an engine panic, becomes a failed `ExecutionResult`
//! 6. Console output survives an interpreter abort (runtime limits)

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use algolab_common::config::{EngineConfig, ExecutionLimits};
use algolab_common::types::{ErrorInfo, ExecutionResult, DEFAULT_FUNCTION_NAME};
use boa_engine::{Context, Source};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::canonical::js_key_order;
use crate::error::EngineError;

/// Keys that mark an object as a tree/list node rather than a named-argument bag.
pub const DATA_STRUCTURE_KEYS: [&str; 11] = [
    "val", "value", "left", "right", "next", "prev", "children", "child", "parent", "head", "tail",
];

/// Lines the interpreter's `Function` constructor adds above the user source.
const WRAPPER_LINE_OFFSET: u32 = 1;

/// Reads the console buffer back after the interpreter aborted the harness.
const LOG_RECOVERY: &str = "JSON.stringify(globalThis.__algolabLogs || [])";

lazy_static! {
    static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").unwrap();
    static ref FUNCTION_DECLARATION: Regex =
        Regex::new(r"function\s+([A-Za-z_$][A-Za-z0-9_$]*)").unwrap();
    static ref MESSAGE_LINE: Regex = Regex::new(r"\bline (\d+)").unwrap();
}

/// Harness evaluated around every call. Receives the user source, the
/// function name and the JSON-encoded argument list, and always returns a
/// JSON envelope string unless the interpreter aborts (runtime limits).
const HARNESS: &str = r#"(function (__source, __name, __argsJson) {
    var __logs = globalThis.__algolabLogs = [];
    function __format(args) {
        var parts = [];
        for (var i = 0; i < args.length; i++) {
            var arg = args[i];
            if (typeof arg === 'object' && arg !== null) {
                try { parts.push(JSON.stringify(arg)); } catch (e) { parts.push(String(arg)); }
            } else {
                parts.push(String(arg));
            }
        }
        return parts.join(' ');
    }
    var __console = {
        log: function () { __logs.push(__format(arguments)); },
        info: function () { __logs.push(__format(arguments)); },
        warn: function () { __logs.push('WARN: ' + __format(arguments)); },
        error: function () { __logs.push('ERROR: ' + __format(arguments)); }
    };
    function __describe(thrown) {
        var message = 'Unknown error';
        try {
            if (thrown instanceof Error) {
                message = String(thrown.message);
            } else if (typeof thrown === 'string') {
                message = thrown;
            } else {
                var json = JSON.stringify(thrown);
                message = json === undefined ? String(thrown) : json;
            }
        } catch (e) {
            try { message = String(thrown); } catch (ignored) {}
        }
        var stack = '';
        try {
            if (thrown && thrown.stack) { stack = String(thrown.stack); }
        } catch (ignored) {}
        if (!stack) {
            var name = 'Error';
            try { if (thrown instanceof Error) { name = String(thrown.name); } } catch (ignored) {}
            stack = name + ': ' + message;
        }
        return { message: message, stack: stack };
    }
    try {
        var __factory = new Function('console',
            __source + '\nreturn typeof ' + __name + ' !== "undefined" ? ' + __name + ' : undefined;');
        var __fn = __factory(__console);
        if (typeof __fn !== 'function') {
            throw new Error('Function "' + __name + '" is not defined');
        }
        var __result = __fn.apply(null, JSON.parse(__argsJson));
        var __outputJson = JSON.stringify(__result);
        return JSON.stringify({ ok: true, outputJson: __outputJson, logs: __logs });
    } catch (e) {
        return JSON.stringify({ ok: false, error: __describe(e), logs: __logs });
    }
})"#;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    ok: bool,
    #[serde(default)]
    output_json: Option<String>,
    #[serde(default)]
    logs: Vec<String>,
    #[serde(default)]
    error: Option<ThrownError>,
}

#[derive(Debug, Deserialize)]
struct ThrownError {
    message: String,
    stack: String,
}

/// What the harness reported for one call.
struct Invocation {
    output: Option<Value>,
    logs: Vec<String>,
    error: Option<ErrorInfo>,
}

/// JavaScript execution engine backed by an embedded interpreter.
#[derive(Debug, Clone)]
pub struct ScriptEngine {
    limits: ExecutionLimits,
    max_source_bytes: usize,
    max_input_bytes: usize,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl ScriptEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            limits: config.limits.clone(),
            max_source_bytes: config.max_source_bytes,
            max_input_bytes: config.max_input_bytes,
        }
    }

    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Call `function_name` with `input` as described by [`call_arguments`].
    pub fn execute(
        &self,
        source: &str,
        function_name: &str,
        input: &Value,
        pass_as_is: bool,
    ) -> ExecutionResult {
        let args = call_arguments(input, pass_as_is);
        self.run(source, function_name, &args)
    }

    /// Call `function_name(args[0], args[1], ...)`.
    pub fn execute_with_args(
        &self,
        source: &str,
        function_name: &str,
        args: &[Value],
    ) -> ExecutionResult {
        self.run(source, function_name, args)
    }

    fn run(&self, source: &str, function_name: &str, args: &[Value]) -> ExecutionResult {
        debug!(function = function_name, arg_count = args.len(), "Executing user function");

        let start = Instant::now();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.invoke(source, function_name, args)
        }));
        let execution_time = start.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(Ok(Invocation { output, logs, error: None })) => {
                ExecutionResult::succeeded(output, logs, execution_time)
            }
            Ok(Ok(Invocation { logs, error: Some(error), .. })) => {
                debug!(function = function_name, error = %error.message, "User function failed");
                ExecutionResult::failed(error, logs, execution_time)
            }
            Ok(Err(e)) => {
                warn!(function = function_name, error = %e, "Execution aborted");
                ExecutionResult::failed(e.to_error_info(), Vec::new(), execution_time)
            }
            Err(payload) => {
                let message = format!("Execution engine panicked: {}", panic_message(payload.as_ref()));
                warn!(function = function_name, "{}", message);
                ExecutionResult::failed(ErrorInfo::new(message), Vec::new(), execution_time)
            }
        }
    }

    fn invoke(
        &self,
        source: &str,
        function_name: &str,
        args: &[Value],
    ) -> Result<Invocation, EngineError> {
        if source.len() > self.max_source_bytes {
            return Err(EngineError::SourceTooLarge {
                max: self.max_source_bytes,
                actual: source.len(),
            });
        }

        if !IDENTIFIER.is_match(function_name) {
            return Err(EngineError::MissingFunction(function_name.to_string()));
        }

        let args_json = serde_json::to_string(args)?;
        if args_json.len() > self.max_input_bytes {
            return Err(EngineError::InputTooLarge {
                max: self.max_input_bytes,
                actual: args_json.len(),
            });
        }

        let script = format!(
            "{}({}, {}, {})",
            HARNESS,
            serde_json::to_string(source)?,
            serde_json::to_string(function_name)?,
            serde_json::to_string(&args_json)?,
        );

        let mut context = Context::default();
        self.install_limits(&mut context);

        let value = match context.eval(Source::from_bytes(&script)) {
            Ok(value) => value,
            Err(e) => {
                let error = EngineError::Script(e.to_string());
                warn!(function = function_name, error = %error, "Execution aborted by the interpreter");
                return Ok(Invocation {
                    output: None,
                    logs: recover_logs(&mut context),
                    error: Some(error.to_error_info()),
                });
            }
        };

        let text = value
            .as_string()
            .map(|s| s.to_std_string_escaped())
            .ok_or_else(|| EngineError::MalformedEnvelope("harness returned a non-string value".to_string()))?;

        let envelope: Envelope = serde_json::from_str(&text)
            .map_err(|e| EngineError::MalformedEnvelope(e.to_string()))?;

        if envelope.ok {
            let output = envelope
                .output_json
                .map(|json| serde_json::from_str::<Value>(&json))
                .transpose()
                .map_err(|e| EngineError::MalformedEnvelope(e.to_string()))?;

            return Ok(Invocation {
                output,
                logs: envelope.logs,
                error: None,
            });
        }

        let error = match envelope.error {
            Some(thrown) => ErrorInfo {
                line_number: parse_line_number(&thrown.stack)
                    .or_else(|| parse_line_number(&thrown.message)),
                message: thrown.message,
                stack: thrown.stack,
            },
            None => ErrorInfo::new("Unknown error"),
        };

        Ok(Invocation {
            output: None,
            logs: envelope.logs,
            error: Some(error),
        })
    }

    fn install_limits(&self, context: &mut Context) {
        let limits = context.runtime_limits_mut();
        limits.set_loop_iteration_limit(self.limits.loop_iteration_limit.unwrap_or(u64::MAX));
        limits.set_recursion_limit(self.limits.recursion_limit.unwrap_or(usize::MAX));
        limits.set_stack_size_limit(self.limits.stack_size_limit.unwrap_or(usize::MAX));
    }
}

/// Console lines the harness recorded before the interpreter aborted it.
fn recover_logs(context: &mut Context) -> Vec<String> {
    context
        .eval(Source::from_bytes(LOG_RECOVERY))
        .ok()
        .and_then(|value| value.as_string().map(|s| s.to_std_string_escaped()))
        .and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

/// Argument list for a single-input call.
///
/// Plain objects are destructured into one argument per key in JavaScript
/// own-key order (array indices first) unless `pass_as_is` is set or the object looks like a tree/list node.
/// Everything else is passed as the only argument.
pub fn call_arguments(input: &Value, pass_as_is: bool) -> Vec<Value> {
    match input {
        Value::Object(map) if !pass_as_is && !is_data_structure(map) => {
            js_key_order(map).into_iter().map(|(_, value)| value.clone()).collect()
        }
        _ => vec![input.clone()],
    }
}

pub fn is_data_structure(map: &Map<String, Value>) -> bool {
    map.keys().any(|key| DATA_STRUCTURE_KEYS.contains(&key.as_str()))
}

/// Best-effort source line of an error, relative to the user's source.
///
/// Only parse errors carry a position (`... at line N, col M`); runtime
/// errors have none and yield `None`.
pub fn parse_line_number(text: &str) -> Option<u32> {
    let captures = MESSAGE_LINE.captures(text)?;
    let line: u32 = captures.get(1)?.as_str().parse().ok()?;
    line.checked_sub(WRAPPER_LINE_OFFSET).filter(|line| *line >= 1)
}

/// Name of the first `function <name>` declaration in `source`.
pub fn find_function_name(source: &str) -> Option<String> {
    FUNCTION_DECLARATION
        .captures(source)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str().to_string())
}

/// [`find_function_name`], defaulting to `"solution"`.
pub fn detect_function_name(source: &str) -> String {
    find_function_name(source).unwrap_or_else(|| DEFAULT_FUNCTION_NAME.to_string())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
