//! Total field extraction from untyped payloads
//!
//! Charge points are loose about optional fields and occasionally about
//! types (numbers sent as strings). Reads never fail: a missing or
//! mistyped field yields the documented default and the caller decides
//! whether that field is load-bearing.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::time::parse_wire_time;

/// Read-only view over a JSON object payload.
///
/// A payload that is not an object behaves like an empty object.
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    pub fn of(payload: &'a Value) -> Self {
        Self {
            map: payload.as_object(),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map
            .and_then(|m| m.get(key))
            .filter(|v| !v.is_null())
    }

    /// String field, `""` when absent or not a string.
    pub fn str(&self, key: &str) -> String {
        self.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    }

    /// String field, `None` when absent, not a string, or empty.
    pub fn opt_str(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(String::from)
    }

    /// Integer field. Accepts JSON integers, floats with no fractional
    /// part, and numeric strings.
    pub fn int(&self, key: &str) -> Option<i64> {
        match self.get(key)? {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.is_finite())
                    .map(|f| f as i64)
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Finite floating point field. Accepts JSON numbers and numeric
    /// strings; `"NaN"` and `"inf"` read as absent.
    pub fn float(&self, key: &str) -> Option<f64> {
        let value = match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        value.filter(|f| f.is_finite())
    }

    /// RFC 3339 timestamp field, `None` when absent or unparseable.
    pub fn time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.get(key).and_then(Value::as_str).and_then(parse_wire_time)
    }

    /// Array field, empty when absent or not an array.
    pub fn array(&self, key: &str) -> &'a [Value] {
        self.get(key)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
