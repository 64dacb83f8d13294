//! Driver value normalization
//!
//! Drivers hand back rows of [`NativeValue`]s. Before a row is serialized,
//! every value is reduced to a JSON primitive: strings, numbers, booleans and
//! nulls pass through, everything else becomes its display string.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Number, Value};
use std::fmt;

use crate::schema::JsonRow;

/// A column value as decoded by a database driver
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Decimal(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Timestamp(DateTime<Utc>),
    Json(Value),
    Bytes(Vec<u8>),
}

impl fmt::Display for NativeValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeValue::Null => formatter.write_str("NULL"),
            NativeValue::Bool(value) => write!(formatter, "{}", value),
            NativeValue::Int(value) => write!(formatter, "{}", value),
            NativeValue::UInt(value) => write!(formatter, "{}", value),
            NativeValue::Float(value) => write!(formatter, "{}", value),
            NativeValue::Text(value) => formatter.write_str(value),
            NativeValue::Decimal(value) => write!(formatter, "{}", value),
            NativeValue::Date(value) => write!(formatter, "{}", value),
            NativeValue::Time(value) => write!(formatter, "{}", value),
            NativeValue::DateTime(value) => write!(formatter, "{}", value),
            NativeValue::Timestamp(value) => write!(formatter, "{}", value),
            NativeValue::Json(value) => write!(formatter, "{}", value),
            NativeValue::Bytes(value) => formatter.write_str(&String::from_utf8_lossy(value)),
        }
    }
}

/// One result row in column order
pub type NativeRow = Vec<(String, NativeValue)>;

/// Reduce a single value to a JSON primitive
pub fn normalize_value(value: NativeValue) -> Value {
    match value {
        NativeValue::Null => Value::Null,
        NativeValue::Bool(value) => Value::Bool(value),
        NativeValue::Int(value) => Value::Number(value.into()),
        NativeValue::UInt(value) => Value::Number(value.into()),
        NativeValue::Float(value) => Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string())),
        NativeValue::Text(value) => Value::String(value),
        other => Value::String(other.to_string()),
    }
}

pub fn normalize_row(row: NativeRow) -> JsonRow {
    row.into_iter()
        .map(|(column, value)| (column, normalize_value(value)))
        .collect()
}

pub fn normalize_rows(rows: Vec<NativeRow>) -> Vec<JsonRow> {
    rows.into_iter().map(normalize_row).collect()
}

/// The first column of a row as plain text, as used for `SHOW TABLES`
pub fn first_column_text(row: &NativeRow) -> Option<String> {
    row.first().and_then(|(_, value)| value_text(value))
}

/// A named column of a row as plain text, as used for `DESCRIBE`
pub fn column_text(row: &NativeRow, column: &str) -> Option<String> {
    row.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(column))
        .and_then(|(_, value)| value_text(value))
}

fn value_text(value: &NativeValue) -> Option<String> {
    match value {
        NativeValue::Null => None,
        other => Some(other.to_string()),
    }
}
