//! Per-kind deep copy of values.
//!
//! A snapshot is a structurally independent duplicate: mutating the live
//! value never shows through a previously taken copy. Leaves (including
//! dates) are copied by value; collections are rebuilt by recursively
//! cloning every member into a freshly constructed collection. Values are
//! owned trees, so there are no cycles to guard against.

use crate::Value;

pub(crate) fn clone_value(value: &Value) -> Value {
    match value {
        Value::Null => Value::Null,
        Value::Bool(v) => Value::Bool(*v),
        Value::Int(v) => Value::Int(*v),
        Value::Float(v) => Value::Float(*v),
        Value::Text(v) => Value::Text(v.clone()),
        Value::Date(v) => Value::Date(*v),
        Value::Seq(items) => Value::Seq(items.iter().map(clone_value).collect()),
        Value::Map(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), clone_value(v)))
                .collect(),
        ),
        Value::Set(items) => {
            // rebuild through the deduplicating path
            let mut out: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                let copy = clone_value(item);
                if !out.contains(&copy) {
                    out.push(copy);
                }
            }
            Value::Set(out)
        }
        Value::Record(entries) => Value::Record(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), clone_value(v)))
                .collect(),
        ),
    }
}
