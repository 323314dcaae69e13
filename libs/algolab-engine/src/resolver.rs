//! Argument-shape resolution.
//!
//! Test cases carry a single JSON `input` with no arity or type schema, so the
//! calling convention is inferred from its shape:
//!
//! | input                                   | call                         |
//! |-----------------------------------------|------------------------------|
//! | object                                  | object rule of the engine    |
//! | `[x]`                                   | `fn(x)`                      |
//! | `[[..], ..]`                            | `fn(...input)`               |
//! | `[s1, s2, ..]` same-typed scalars       | `fn(input)`                  |
//! | `[s, ..]` mixed types                   | `fn(...input)`               |
//! | anything else                           | `fn(input)`                  |
//!
//! The inference is ambiguous by nature (`[2, 3]` always means `fn([2, 3])`,
//! never `fn(2, 3)`). Exercises that need a different call declare a
//! [`CallConvention`] instead.

use std::borrow::Cow;

use algolab_common::types::{CallConvention, ExecutionResult, TestCase};
use serde_json::{Map, Value};
use tracing::trace;

use crate::canonical::js_key_order;
use crate::engine::{is_data_structure, ScriptEngine};

/// The InputValue variants an input can take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputShape<'a> {
    Scalar(&'a Value),
    DataStructure(&'a Map<String, Value>),
    NamedArgs(&'a Map<String, Value>),
    ArgumentList(&'a [Value]),
}

pub fn classify(input: &Value) -> InputShape<'_> {
    match input {
        Value::Object(map) if is_data_structure(map) => InputShape::DataStructure(map),
        Value::Object(map) => InputShape::NamedArgs(map),
        Value::Array(items) => InputShape::ArgumentList(items),
        scalar => InputShape::Scalar(scalar),
    }
}

/// Which primitive to call and with what.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Single-input primitive.
    Direct { value: &'a Value, pass_as_is: bool },
    /// Multi-argument primitive.
    Spread(Cow<'a, [Value]>),
}

/// JavaScript `typeof` of a JSON value.
fn js_typeof(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Null | Value::Array(_) | Value::Object(_) => "object",
    }
}

/// Infer the call from the input shape alone.
pub fn resolve(input: &Value) -> Resolution<'_> {
    match input {
        Value::Object(_) => Resolution::Direct {
            value: input,
            pass_as_is: false,
        },
        Value::Array(items) => resolve_list(input, items),
        _ => Resolution::Direct {
            value: input,
            pass_as_is: true,
        },
    }
}

fn resolve_list<'a>(input: &'a Value, items: &'a [Value]) -> Resolution<'a> {
    let whole = Resolution::Direct {
        value: input,
        pass_as_is: true,
    };

    let first = match items {
        [only] => {
            return Resolution::Direct {
                value: only,
                pass_as_is: true,
            }
        }
        [first, _, ..] => first,
        [] => return whole,
    };

    if first.is_array() {
        return Resolution::Spread(Cow::Borrowed(items));
    }

    let first_type = js_typeof(first);
    if first_type == "object" {
        return whole;
    }

    let homogeneous = items.iter().all(|item| js_typeof(item) == first_type);
    if homogeneous {
        whole
    } else {
        Resolution::Spread(Cow::Borrowed(items))
    }
}

/// Apply a convention declared by the exercise author.
pub fn resolve_declared<'a>(convention: &CallConvention, input: &'a Value) -> Resolution<'a> {
    let single = Resolution::Direct {
        value: input,
        pass_as_is: true,
    };

    match (convention, input) {
        (CallConvention::Single, _) => single,
        (CallConvention::Spread, Value::Array(items)) => Resolution::Spread(Cow::Borrowed(items)),
        (CallConvention::Named { keys }, Value::Object(map)) if keys.is_empty() => {
            Resolution::Spread(Cow::Owned(
                js_key_order(map).into_iter().map(|(_, value)| value.clone()).collect(),
            ))
        }
        (CallConvention::Named { keys }, Value::Object(map)) => Resolution::Spread(Cow::Owned(
            keys.iter()
                .map(|key| map.get(key).cloned().unwrap_or(Value::Null))
                .collect(),
        )),
        _ => single,
    }
}

/// Resolve the call for `test_case` and run it.
///
/// A convention on the test case wins over `declared` (the exercise-level
/// one); with neither, the shape heuristic decides.
pub fn resolve_and_execute(
    engine: &ScriptEngine,
    source: &str,
    function_name: &str,
    test_case: &TestCase,
    declared: Option<&CallConvention>,
) -> ExecutionResult {
    let resolution = match test_case.call.as_ref().or(declared) {
        Some(convention) => resolve_declared(convention, &test_case.input),
        None => resolve(&test_case.input),
    };

    trace!(function = function_name, ?resolution, "Resolved call shape");

    match resolution {
        Resolution::Direct { value, pass_as_is } => {
            engine.execute(source, function_name, value, pass_as_is)
        }
        Resolution::Spread(args) => engine.execute_with_args(source, function_name, &args),
    }
}
