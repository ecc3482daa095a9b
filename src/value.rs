use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::time::SystemTime;

use crate::{Error, Result};

/// Dynamic value stored in a [`Target`](crate::Target) property.
///
/// Values form owned trees: collections contain their members by value, so a
/// value can never reference itself and deep copies terminate by
/// construction.
///
/// Object-typed kinds ([`Seq`](Value::Seq), [`Map`](Value::Map),
/// [`Set`](Value::Set), [`Record`](Value::Record)) are the ones the engine
/// wraps for mutation interception; everything else is a leaf that is
/// semantically safe to copy and share.
///
/// # Examples
///
/// ```rust
/// use kanshi::Value;
///
/// let limits = Value::record([("retries", 3), ("backoff_ms", 250)]);
/// assert!(limits.is_object());
/// assert_eq!(Value::from("text").kind().to_string(), "text");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(SystemTime),
    Seq(Vec<Value>),
    /// Associative map with text keys.
    Map(BTreeMap<String, Value>),
    /// Insertion-ordered set, deduplicated by structural equality.
    Set(Vec<Value>),
    /// Struct-like record of named fields.
    Record(BTreeMap<String, Value>),
}

/// Discriminant of a [`Value`], used in error reporting and dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Text,
    Date,
    Seq,
    Map,
    Set,
    Record,
}

impl ValueKind {
    pub fn is_object(self) -> bool {
        matches!(
            self,
            ValueKind::Seq | ValueKind::Map | ValueKind::Set | ValueKind::Record
        )
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "boolean",
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Text => "text",
            ValueKind::Date => "date",
            ValueKind::Seq => "sequence",
            ValueKind::Map => "map",
            ValueKind::Set => "set",
            ValueKind::Record => "record",
        };
        write!(f, "{name}")
    }
}

impl Value {
    /// Build a [`Value::Record`] from `(name, value)` pairs.
    pub fn record<K, V, I>(entries: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Record(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a [`Value::Map`] from `(key, value)` pairs.
    pub fn map<K, V, I>(entries: I) -> Value
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a [`Value::Seq`] from items.
    pub fn seq<V, I>(items: I) -> Value
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }

    /// Build a [`Value::Set`] from items, dropping structural duplicates and
    /// keeping first-occurrence order.
    pub fn set<V, I>(items: I) -> Value
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            let item = item.into();
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Value::Set(out)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::Text(_) => ValueKind::Text,
            Value::Date(_) => ValueKind::Date,
            Value::Seq(_) => ValueKind::Seq,
            Value::Map(_) => ValueKind::Map,
            Value::Set(_) => ValueKind::Set,
            Value::Record(_) => ValueKind::Record,
        }
    }

    pub fn is_object(&self) -> bool {
        self.kind().is_object()
    }

    /// Number of members for collection kinds, `None` for leaves.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Seq(items) | Value::Set(items) => Some(items.len()),
            Value::Map(entries) | Value::Record(entries) => Some(entries.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|n| n == 0)
    }

    /// Keyed member lookup. Sequences are addressed by decimal index.
    pub(crate) fn get_key(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Record(entries) | Value::Map(entries) => entries.get(key),
            Value::Seq(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    pub(crate) fn get_key_mut(&mut self, key: &str) -> Option<&mut Value> {
        match self {
            Value::Record(entries) | Value::Map(entries) => entries.get_mut(key),
            Value::Seq(items) => key.parse::<usize>().ok().and_then(|i| items.get_mut(i)),
            _ => None,
        }
    }

    /// Keyed member write. Records and maps create missing keys; sequences
    /// accept indexes up to and including the current length (writing at the
    /// length appends).
    pub(crate) fn set_key(&mut self, key: &str, value: Value) -> Result<()> {
        match self {
            Value::Record(entries) | Value::Map(entries) => {
                entries.insert(key.to_string(), value);
                Ok(())
            }
            Value::Seq(items) => {
                let index: usize = key
                    .parse()
                    .map_err(|_| Error::InvalidIndex(key.to_string()))?;
                match index.cmp(&items.len()) {
                    Ordering::Less => {
                        items[index] = value;
                        Ok(())
                    }
                    Ordering::Equal => {
                        items.push(value);
                        Ok(())
                    }
                    Ordering::Greater => Err(Error::IndexOutOfBounds {
                        index,
                        len: items.len(),
                    }),
                }
            }
            other => Err(Error::NotKeyed(other.kind())),
        }
    }

    /// Own enumerable members, as `(key, value)` pairs. Sequences enumerate
    /// with decimal-index keys; sets and leaves have none.
    pub(crate) fn entries(&self) -> Vec<(String, &Value)> {
        match self {
            Value::Record(entries) | Value::Map(entries) => {
                entries.iter().map(|(k, v)| (k.clone(), v)).collect()
            }
            Value::Seq(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Dispatch one of the closed set of mutating methods and return its
    /// natural result. Validation happens before any mutation, so an `Err`
    /// means the value is untouched.
    pub(crate) fn apply_method(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        match self {
            Value::Seq(items) => match method {
                "push" => {
                    if args.is_empty() {
                        return Err(Error::MethodArguments {
                            method: "push",
                            expected: "at least one value",
                        });
                    }
                    items.extend_from_slice(args);
                    Ok(Value::Int(items.len() as i64))
                }
                "pop" => Ok(items.pop().unwrap_or(Value::Null)),
                "shift" => {
                    if items.is_empty() {
                        Ok(Value::Null)
                    } else {
                        Ok(items.remove(0))
                    }
                }
                "unshift" => {
                    if args.is_empty() {
                        return Err(Error::MethodArguments {
                            method: "unshift",
                            expected: "at least one value",
                        });
                    }
                    for (i, value) in args.iter().enumerate() {
                        items.insert(i, value.clone());
                    }
                    Ok(Value::Int(items.len() as i64))
                }
                "insert" => {
                    let index = index_arg("insert", args, 0)?;
                    let value = value_arg("insert", args, 1)?;
                    if index > items.len() {
                        return Err(Error::IndexOutOfBounds {
                            index,
                            len: items.len(),
                        });
                    }
                    items.insert(index, value);
                    Ok(Value::Null)
                }
                "remove" => {
                    let index = index_arg("remove", args, 0)?;
                    if index >= items.len() {
                        return Err(Error::IndexOutOfBounds {
                            index,
                            len: items.len(),
                        });
                    }
                    Ok(items.remove(index))
                }
                "clear" => {
                    items.clear();
                    Ok(Value::Null)
                }
                "reverse" => {
                    items.reverse();
                    Ok(Value::Null)
                }
                _ => Err(Error::UnknownMethod {
                    kind: ValueKind::Seq,
                    method: method.to_string(),
                }),
            },
            Value::Map(entries) => keyed_method(entries, ValueKind::Map, method, args),
            Value::Record(entries) => keyed_method(entries, ValueKind::Record, method, args),
            Value::Set(items) => match method {
                "insert" => {
                    let value = value_arg("insert", args, 0)?;
                    if items.contains(&value) {
                        Ok(Value::Bool(false))
                    } else {
                        items.push(value);
                        Ok(Value::Bool(true))
                    }
                }
                "remove" => {
                    let value = value_arg("remove", args, 0)?;
                    match items.iter().position(|v| v == &value) {
                        Some(i) => {
                            items.remove(i);
                            Ok(Value::Bool(true))
                        }
                        None => Ok(Value::Bool(false)),
                    }
                }
                "clear" => {
                    items.clear();
                    Ok(Value::Null)
                }
                _ => Err(Error::UnknownMethod {
                    kind: ValueKind::Set,
                    method: method.to_string(),
                }),
            },
            other => Err(Error::UnknownMethod {
                kind: other.kind(),
                method: method.to_string(),
            }),
        }
    }
}

fn keyed_method(
    entries: &mut BTreeMap<String, Value>,
    kind: ValueKind,
    method: &str,
    args: &[Value],
) -> Result<Value> {
    match method {
        "insert" => {
            let key = text_arg("insert", args, 0)?.to_string();
            let value = value_arg("insert", args, 1)?;
            Ok(entries.insert(key, value).unwrap_or(Value::Null))
        }
        "remove" => {
            let key = text_arg("remove", args, 0)?;
            Ok(entries.remove(key).unwrap_or(Value::Null))
        }
        "clear" => {
            entries.clear();
            Ok(Value::Null)
        }
        _ => Err(Error::UnknownMethod {
            kind,
            method: method.to_string(),
        }),
    }
}

fn value_arg(method: &'static str, args: &[Value], index: usize) -> Result<Value> {
    args.get(index).cloned().ok_or(Error::MethodArguments {
        method,
        expected: "a value argument",
    })
}

fn text_arg<'a>(method: &'static str, args: &'a [Value], index: usize) -> Result<&'a str> {
    match args.get(index) {
        Some(Value::Text(key)) => Ok(key),
        _ => Err(Error::MethodArguments {
            method,
            expected: "a text key",
        }),
    }
}

fn index_arg(method: &'static str, args: &[Value], index: usize) -> Result<usize> {
    match args.get(index) {
        Some(Value::Int(i)) if *i >= 0 => Ok(*i as usize),
        _ => Err(Error::MethodArguments {
            method,
            expected: "a non-negative index",
        }),
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<SystemTime> for Value {
    fn from(v: SystemTime) -> Self {
        Value::Date(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Seq(v)
    }
}
