//! KQL literal formatting.
//!
//! Pure functions mapping typed values to the dialect's literal syntax.
//! Datetime, guid and decimal literals round-trip exactly through their
//! constructor functions.

use chrono::SecondsFormat;

use crate::plan::Value;

/// Render a value as a KQL literal.
pub fn format_literal(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        Value::Long(n) => n.to_string(),
        Value::Real(f) => format_real(*f),
        Value::Decimal(d) => format!("decimal({})", d),
        Value::String(s) => format!("\"{}\"", escape_string(s)),
        Value::DateTime(dt) => format!(
            "datetime({})",
            dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
        ),
        Value::Guid(u) => format!("guid({})", u),
        Value::Dynamic(v) => format!("dynamic({})", v),
    }
}

fn format_real(f: f64) -> String {
    if f.is_nan() {
        return "real(null)".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 {
            "real(+inf)".to_string()
        } else {
            "real(-inf)".to_string()
        };
    }
    // {:?} is the shortest representation that re-parses to the same bits
    format!("{:?}", f)
}

/// Escape a string for a double-quoted KQL literal.
pub fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// The KQL scalar type name for a value, used in
/// `declare query_parameters(name:type, ...)`.
pub fn kql_type(value: &Value) -> &'static str {
    match value {
        Value::Null | Value::String(_) => "string",
        Value::Bool(_) => "bool",
        Value::Long(_) => "long",
        Value::Real(_) => "real",
        Value::Decimal(_) => "decimal",
        Value::DateTime(_) => "datetime",
        Value::Guid(_) => "guid",
        Value::Dynamic(_) => "dynamic",
    }
}

/// Convert a value into its JSON form for inline ingest payloads.
///
/// Collections are serialized as JSON-encoded strings rather than nested
/// JSON, matching the flat-row expectation of the ingest format. Decimals
/// go through text to avoid binary-float truncation.
pub fn json_value(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Long(n) => serde_json::Value::from(*n),
        Value::Real(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Decimal(d) => serde_json::Value::String(d.to_string()),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::DateTime(dt) => {
            serde_json::Value::String(dt.to_rfc3339_opts(SecondsFormat::Nanos, true))
        }
        Value::Guid(u) => serde_json::Value::String(u.to_string()),
        Value::Dynamic(v) => serde_json::Value::String(v.to_string()),
    }
}
