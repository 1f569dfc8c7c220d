//! Portable encoding of result sets.
//!
//! Timestamps become ISO-8601 strings; everything else keeps its shape.
//! Encoding is pure and deterministic.

use chrono::{NaiveDateTime, Timelike};
use serde_json::{Number, Value};

use crate::value::{ResultSet, Scalar};

pub type PortableRows = Vec<Vec<Value>>;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedResult {
    pub columns: Vec<String>,
    pub rows: PortableRows,
}

/// Encode a result set. `None` (no result shape) encodes to empty columns
/// and rows.
pub fn encode(result: Option<&ResultSet>) -> EncodedResult {
    let Some(result) = result else {
        return EncodedResult::default();
    };
    EncodedResult {
        columns: result.columns().to_vec(),
        rows: result
            .rows()
            .iter()
            .map(|row| row.iter().map(encode_scalar).collect())
            .collect(),
    }
}

pub fn encode_scalar(value: &Scalar) -> Value {
    match value {
        Scalar::Null => Value::Null,
        Scalar::Integer(i) => Value::from(*i),
        Scalar::Float(x) => Number::from_f64(*x).map_or(Value::Null, Value::Number),
        Scalar::Text(s) => Value::String(s.clone()),
        Scalar::Boolean(b) => Value::Bool(*b),
        Scalar::Timestamp(ts) => Value::String(iso8601(ts)),
        Scalar::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
    }
}

/// `YYYY-MM-DDTHH:MM:SS`, with a microsecond fraction only when non-zero.
pub fn iso8601(ts: &NaiveDateTime) -> String {
    if ts.nanosecond() == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}
