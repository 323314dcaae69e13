//! Canonical JSON text and output comparison.
//!
//! Text is produced the way JavaScript's `JSON.stringify` produces it, so a
//! value coming back from user code and a value written in lesson content
//! serialize identically when they are the same JavaScript value
//! (`2.0` and `2` both print as `2`).

use algolab_common::types::ComparisonMode;
use serde_json::{Map, Number, Value};

/// Largest integer JavaScript represents exactly (2^53).
const MAX_SAFE_MAGNITUDE: u64 = 1 << 53;

/// `None` stands for `undefined`, which has no JSON text.
pub fn serialize(value: Option<&Value>) -> Option<String> {
    value.map(to_canonical_string)
}

pub fn to_canonical_string(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&js_number(n)),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (idx, (key, item)) in js_key_order(map).into_iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    // serde_json escapes exactly the characters JSON.stringify escapes
    out.push_str(&Value::String(s.to_string()).to_string());
}

/// Object entries in the order JavaScript enumerates own string keys:
/// array indices ascending, then every other key in insertion order.
pub fn js_key_order(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut indices = Vec::new();
    let mut named = Vec::new();

    for (key, value) in map {
        match array_index(key) {
            Some(idx) => indices.push((idx, key, value)),
            None => named.push((key, value)),
        }
    }

    indices.sort_by_key(|(idx, _, _)| *idx);
    indices
        .into_iter()
        .map(|(_, key, value)| (key, value))
        .chain(named)
        .collect()
}

/// Canonical `u32` text below 2^32 - 1 (no sign, no leading zeros).
fn array_index(key: &str) -> Option<u32> {
    let idx: u32 = key.parse().ok()?;
    (idx != u32::MAX && idx.to_string() == key).then_some(idx)
}

/// Number text as JavaScript prints it.
pub fn js_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        if i.unsigned_abs() <= MAX_SAFE_MAGNITUDE {
            return i.to_string();
        }
    } else if let Some(u) = n.as_u64() {
        if u <= MAX_SAFE_MAGNITUDE {
            return u.to_string();
        }
    }
    format_f64(n.as_f64().unwrap_or(f64::NAN))
}

fn format_f64(f: f64) -> String {
    if !f.is_finite() {
        return "null".to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }

    let abs = f.abs();
    if abs >= 1e21 || abs < 1e-6 {
        let text = format!("{:e}", f);
        return match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        };
    }

    // shortest round-trip digits, zero padded, like Number.prototype.toString
    format!("{}", f)
}

/// Key-order-insensitive equality with numbers compared by value.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(p), Some(q)) => p == q,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| structurally_equal(x, y))
        }
        (Value::Object(xm), Value::Object(ym)) => {
            xm.len() == ym.len()
                && xm
                    .iter()
                    .all(|(key, x)| ym.get(key).map_or(false, |y| structurally_equal(x, y)))
        }
        _ => a == b,
    }
}

/// Whether an actual output satisfies the expectation under `mode`.
pub fn outputs_match(actual: Option<&Value>, expected: Option<&Value>, mode: ComparisonMode) -> bool {
    match mode {
        ComparisonMode::Serialized => serialize(actual) == serialize(expected),
        ComparisonMode::Structural => match (actual, expected) {
            (None, None) => true,
            (Some(a), Some(e)) => structurally_equal(a, e),
            _ => false,
        },
    }
}
