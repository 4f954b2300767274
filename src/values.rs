// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Argument and Header Values
//!
//! Declaration arguments and message headers cross the abstraction boundary as a
//! [`Table`]: string keys mapped to a small closed set of [`Value`] variants. This
//! keeps callers independent from the broker client's own field table types.

use lapin::types::{AMQPValue, ByteArray, FieldArray, FieldTable, LongString, ShortString};
use std::collections::BTreeMap;

/// Mapping of string keys to values, used for extra arguments and message headers.
pub type Table = BTreeMap<String, Value>;

/// A single argument or header value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    /// Seconds since the Unix epoch
    Timestamp(u64),
    Array(Vec<Value>),
    Table(Table),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&AMQPValue> for Value {
    fn from(value: &AMQPValue) -> Self {
        match value {
            AMQPValue::Void => Value::Void,
            AMQPValue::Boolean(v) => Value::Bool(*v),
            AMQPValue::ShortShortInt(v) => Value::Int(i64::from(*v)),
            AMQPValue::ShortShortUInt(v) => Value::Int(i64::from(*v)),
            AMQPValue::ShortInt(v) => Value::Int(i64::from(*v)),
            AMQPValue::ShortUInt(v) => Value::Int(i64::from(*v)),
            AMQPValue::LongInt(v) => Value::Int(i64::from(*v)),
            AMQPValue::LongUInt(v) => Value::Int(i64::from(*v)),
            AMQPValue::LongLongInt(v) => Value::Int(*v),
            AMQPValue::Float(v) => Value::Float(f64::from(*v)),
            AMQPValue::Double(v) => Value::Float(*v),
            AMQPValue::DecimalValue(d) => {
                Value::Float(f64::from(d.value) / 10f64.powi(i32::from(d.scale)))
            }
            AMQPValue::ShortString(v) => Value::Text(v.as_str().to_owned()),
            // long strings are not required to be UTF-8
            AMQPValue::LongString(v) => match std::str::from_utf8(v.as_bytes()) {
                Ok(text) => Value::Text(text.to_owned()),
                Err(_) => Value::Bytes(v.as_bytes().to_vec()),
            },
            AMQPValue::ByteArray(v) => Value::Bytes(v.as_slice().to_vec()),
            AMQPValue::Timestamp(v) => Value::Timestamp(*v),
            AMQPValue::FieldArray(v) => Value::Array(v.as_slice().iter().map(Value::from).collect()),
            AMQPValue::FieldTable(v) => Value::Table(table_from_field_table(v)),
        }
    }
}

impl From<&Value> for AMQPValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Void => AMQPValue::Void,
            Value::Bool(v) => AMQPValue::Boolean(*v),
            Value::Int(v) => AMQPValue::LongLongInt(*v),
            Value::Float(v) => AMQPValue::Double(*v),
            Value::Text(v) => AMQPValue::LongString(LongString::from(v.clone())),
            Value::Bytes(v) => AMQPValue::ByteArray(ByteArray::from(v.clone())),
            Value::Timestamp(v) => AMQPValue::Timestamp(*v),
            Value::Array(v) => AMQPValue::FieldArray(FieldArray::from(
                v.iter().map(AMQPValue::from).collect::<Vec<_>>(),
            )),
            Value::Table(v) => AMQPValue::FieldTable(field_table_from_table(v)),
        }
    }
}

/// Converts a broker field table into a [`Table`].
pub fn table_from_field_table(table: &FieldTable) -> Table {
    table
        .inner()
        .iter()
        .map(|(key, value)| (key.as_str().to_owned(), Value::from(value)))
        .collect()
}

/// Converts a [`Table`] into the broker's field table representation.
pub fn field_table_from_table(table: &Table) -> FieldTable {
    let mut fields = FieldTable::default();
    for (key, value) in table {
        fields.insert(ShortString::from(key.clone()), AMQPValue::from(value));
    }
    fields
}
