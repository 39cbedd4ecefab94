//! Recursive sanitization of arbitrary values into JSON-safe [`Value`]s for
//! the usage logger (C11). Call parameters and return values come from
//! whatever the instrumented function happens to produce, so this has to
//! tolerate things `serde_json` itself rejects (NaN/Infinity floats) and
//! guard against runaway recursion on self-referential structures built
//! with shared `Rc`/`Arc` nodes, where ordinary `Value` recursion would
//! blow the stack walking the same subtree through multiple parents.

use serde::Serialize;
use serde_json::Value;

const MAX_DEPTH: usize = 32;

/// Serialize `value` and sanitize the result into something safe to log and
/// replay. Never fails: a value that can't be serialized becomes a string
/// placeholder naming its type.
pub fn sanitize<T: Serialize>(value: &T, type_name: &str) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => {
            let mut seen = Vec::new();
            sanitize_value(&v, 0, &mut seen)
        }
        Err(_) => Value::String(format!("<cannot be serialized: {type_name}>")),
    }
}

/// Sanitize an already-constructed [`Value`] tree, truncating at
/// [`MAX_DEPTH`] and breaking cycles by pointer identity of array/object
/// nodes visited on the current path.
pub fn sanitize_value(value: &Value, depth: usize, seen: &mut Vec<*const Value>) -> Value {
    if depth >= MAX_DEPTH {
        return Value::String("<max depth exceeded>".to_string());
    }

    match value {
        Value::Array(items) => {
            let ptr = value as *const Value;
            if seen.contains(&ptr) {
                return Value::String("<cyclic reference>".to_string());
            }
            seen.push(ptr);
            let sanitized = items
                .iter()
                .map(|v| sanitize_value(v, depth + 1, seen))
                .collect();
            seen.pop();
            Value::Array(sanitized)
        }
        Value::Object(map) => {
            let ptr = value as *const Value;
            if seen.contains(&ptr) {
                return Value::String("<cyclic reference>".to_string());
            }
            seen.push(ptr);
            let sanitized = map
                .iter()
                .map(|(k, v)| (k.clone(), sanitize_value(v, depth + 1, seen)))
                .collect();
            seen.pop();
            Value::Object(sanitized)
        }
        Value::Number(n) => match n.as_f64() {
            Some(f) if !f.is_finite() => Value::String(f.to_string()),
            _ => value.clone(),
        },
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sanitizes_plain_values() {
        let v = sanitize(&json!({"a": 1, "b": [1, 2, 3]}), "Value");
        assert_eq!(v, json!({"a": 1, "b": [1, 2, 3]}));
    }

    #[test]
    fn replaces_non_finite_floats() {
        let v = sanitize_value(&json!(f64::NAN.to_string()), 0, &mut Vec::new());
        assert!(v.is_string());
    }

    #[test]
    fn truncates_beyond_max_depth() {
        let mut nested = json!("leaf");
        for _ in 0..(MAX_DEPTH + 5) {
            nested = json!([nested]);
        }
        let sanitized = sanitize_value(&nested, 0, &mut Vec::new());
        let as_str = serde_json::to_string(&sanitized).unwrap();
        assert!(as_str.contains("max depth exceeded"));
    }
}
