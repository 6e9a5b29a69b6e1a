//! Caller-supplied options
//!
//! Options arrive as a JSON-shaped mapping: each key holds a scalar, an
//! ordered sequence or a nested mapping. Components take `Options` by
//! value, consume the keys they recognize and hand back what is left, so
//! the caller can see which options were never processed.

use serde_json::Value;

/// RawOptions: key to scalar, sequence or nested mapping
pub type Options = serde_json::Map<String, Value>;

/// Build an `Options` map from a JSON value
///
/// Anything but an object yields an empty map.
///
/// ```
/// use cloudinary::options::from_value;
/// use serde_json::json;
///
/// let options = from_value(json!({"width": 100, "crop": "fill"}));
/// assert_eq!(options.len(), 2);
/// ```
pub fn from_value(value: Value) -> Options {
    match value {
        Value::Object(map) => map,
        _ => Options::new(),
    }
}

/// True for values that carry information: not null, not an empty
/// string and not an empty sequence or mapping.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        _ => true,
    }
}

/// Remove `key`, returning its value only when it is present
pub fn take(options: &mut Options, key: &str) -> Option<Value> {
    options.remove(key).filter(is_present)
}

/// Remove `key` and render it as a wire string
pub fn take_string(options: &mut Options, key: &str) -> Option<String> {
    take(options, key).and_then(|v| scalar_string(&v))
}

/// Remove `key` and interpret it as a boolean flag
pub fn take_bool(options: &mut Options, key: &str) -> Option<bool> {
    take(options, key).map(|v| truthy(&v))
}

/// Render a scalar as the exact string sent on the wire
///
/// Numbers keep their JSON representation (`0.4`, `2048`), booleans
/// render as `true`/`false`. Sequences and mappings have no scalar form.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Render a scalar or a sequence of scalars, joining items with `sep`
pub fn joined_string(value: &Value, sep: &str) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter(|v| is_present(v))
                .filter_map(scalar_string)
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(sep))
            }
        }
        other => scalar_string(other),
    }
}

/// Interpret a value as a flag: `true`, non-zero numbers and the strings
/// `"true"`/`"1"` are set, everything else is unset.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "true" | "1"),
        _ => false,
    }
}
