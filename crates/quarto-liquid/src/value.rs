/*
 * value.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Runtime values.
//!
//! [`Value`] is the closed set of types that flow through expression
//! evaluation. Every coercion the engine performs (truthiness, equality,
//! ordering, indexing, string conversion) is an explicit match here.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

/// An insertion-ordered map of values.
pub type Map = IndexMap<String, Value>;

/// An opaque value owned by the host application.
///
/// Host objects are read-only from the template's point of view: properties
/// are looked up by name and the object decides its own output form.
pub trait HostObject: fmt::Debug + Send + Sync {
    /// Look up a property. Missing properties render as nil.
    fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    /// The string form used when the object is output.
    fn to_output(&self) -> String;
}

/// A value that can be used in template evaluation.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// A null/missing value.
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// An ordered sequence of values.
    List(Vec<Value>),
    /// A map of string keys to values, in insertion order.
    Map(Map),
    /// A host-provided object.
    Object(Arc<dyn HostObject>),
}

/// A numeric view of a value, used by comparisons and math filters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        }
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Self {
        match number {
            Number::Int(i) => Value::Int(i),
            Number::Float(f) => Value::Float(f),
        }
    }
}

impl Value {
    /// Truthiness: only nil and `false` are falsy.
    ///
    /// Zero, the empty string and empty collections are all truthy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Whether the value equals the `empty` literal.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Whether the value equals the `blank` literal.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Nil | Value::Bool(false) => true,
            Value::String(s) => s.trim().is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Name of the value's type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
        }
    }

    /// Numeric view of the value. Strings are parsed; nothing else converts.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int(i) => Some(Number::Int(*i)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::String(s) => parse_number(s.trim()),
            _ => None,
        }
    }

    /// Integer view of the value; floats are truncated.
    pub fn as_integer(&self) -> Option<i64> {
        match self.as_number()? {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Number::Float(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Render this value as a string for output.
    ///
    /// - Nil: ""
    /// - Bool: "true" / "false"
    /// - Float: always carries a fractional part ("1.0")
    /// - List: concatenation of rendered elements
    /// - Map: JSON
    pub fn to_output(&self) -> String {
        match self {
            Value::Nil => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::String(s) => s.clone(),
            Value::List(items) => items.iter().map(Value::to_output).collect(),
            Value::Map(_) => serde_json::to_string(self).unwrap_or_default(),
            Value::Object(object) => object.to_output(),
        }
    }

    /// Look up a named property (the `.name` path component).
    ///
    /// Maps resolve keys first; lists and strings expose `size`, lists also
    /// `first` and `last`. Anything else resolves to nil.
    pub fn property(&self, name: &str) -> Value {
        match self {
            Value::Map(map) => match map.get(name) {
                Some(value) => value.clone(),
                None if name == "size" => Value::Int(map.len() as i64),
                None => Value::Nil,
            },
            Value::List(items) => match name {
                "size" => Value::Int(items.len() as i64),
                "first" => items.first().cloned().unwrap_or_default(),
                "last" => items.last().cloned().unwrap_or_default(),
                _ => Value::Nil,
            },
            Value::String(s) if name == "size" => Value::Int(s.chars().count() as i64),
            Value::Object(object) => object.get(name).unwrap_or_default(),
            _ => Value::Nil,
        }
    }

    /// Index with a computed key (the `[expr]` path component).
    ///
    /// Negative list indices count from the end. Out-of-range indices,
    /// absent keys and non-indexable values all yield nil.
    pub fn index(&self, key: &Value) -> Value {
        match self {
            Value::List(items) => match key.as_integer() {
                Some(i) => {
                    let len = items.len() as i64;
                    let idx = if i < 0 { len + i } else { i };
                    if (0..len).contains(&idx) {
                        items[idx as usize].clone()
                    } else {
                        Value::Nil
                    }
                }
                None => match key.as_str() {
                    Some(name) => self.property(name),
                    None => Value::Nil,
                },
            },
            Value::Map(map) => map.get(&key.to_output()).cloned().unwrap_or_default(),
            Value::Object(object) => object.get(&key.to_output()).unwrap_or_default(),
            _ => Value::Nil,
        }
    }

    /// The `contains` operator.
    pub fn contains(&self, needle: &Value) -> bool {
        match self {
            Value::String(s) => s.contains(needle.to_output().as_str()),
            Value::List(items) => items.iter().any(|item| item == needle),
            Value::Map(map) => map.contains_key(&needle.to_output()),
            _ => false,
        }
    }

    /// Ordering between compatible values: numbers with numbers, strings
    /// with strings. Incompatible types have no ordering.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.as_number()?.compare(other.as_number()?)
            }
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Value equality with integer/float normalization. Comparing
    /// incompatible types is always unequal.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                self.compare(other) == Some(Ordering::Equal)
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_output())
    }
}

fn parse_number(s: &str) -> Option<Number> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Number::Int(i));
    }
    // reject "inf"/"nan" spellings that f64::from_str accepts
    if s.chars().any(|c| c.is_ascii_digit()) {
        if let Ok(f) = s.parse::<f64>() {
            return Some(Number::Float(f));
        }
    }
    None
}

pub(crate) fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Nil => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
            Value::Object(object) => serializer.serialize_str(&object.to_output()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(object) => Value::Map(
                object
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        i64::try_from(i).map_or(Value::Float(i as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Nil, Into::into)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Point;

    impl HostObject for Point {
        fn get(&self, key: &str) -> Option<Value> {
            match key {
                "x" => Some(Value::Int(3)),
                _ => None,
            }
        }

        fn to_output(&self) -> String {
            "(3, 4)".to_string()
        }
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Bool(true).is_truthy());
        assert!(Value::Int(0).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::List(vec![]).is_truthy());
        assert!(Value::Map(Map::new()).is_truthy());
    }

    #[test]
    fn test_numeric_equality_normalized() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.5));
        assert_ne!(Value::Int(1), Value::from("1"));
        assert_ne!(Value::from("a"), Value::Map(Map::new()));
    }

    #[test]
    fn test_compare_incompatible() {
        assert_eq!(Value::Int(1).compare(&Value::Float(2.5)), Some(Ordering::Less));
        assert_eq!(Value::from("b").compare(&Value::from("a")), Some(Ordering::Greater));
        assert_eq!(Value::from("1").compare(&Value::Int(1)), None);
    }

    #[test]
    fn test_output_forms() {
        assert_eq!(Value::Nil.to_output(), "");
        assert_eq!(Value::Bool(false).to_output(), "false");
        assert_eq!(Value::Int(-4).to_output(), "-4");
        assert_eq!(Value::Float(2.0).to_output(), "2.0");
        assert_eq!(Value::Float(2.5).to_output(), "2.5");
        assert_eq!(Value::from(vec!["a", "b"]).to_output(), "ab");
        let map = Value::from(json!({"b": 1, "a": [true, null]}));
        assert_eq!(map.to_output(), r#"{"b":1,"a":[true,null]}"#);
    }

    #[test]
    fn test_index_and_property() {
        let list = Value::from(vec![1, 2, 3]);
        assert_eq!(list.index(&Value::Int(0)), Value::Int(1));
        assert_eq!(list.index(&Value::Int(-1)), Value::Int(3));
        assert_eq!(list.index(&Value::Int(3)), Value::Nil);
        assert_eq!(list.property("size"), Value::Int(3));
        assert_eq!(list.property("first"), Value::Int(1));
        assert_eq!(list.property("last"), Value::Int(3));

        let map = Value::from(json!({"name": "x", "size": 10}));
        assert_eq!(map.property("name"), Value::from("x"));
        assert_eq!(map.property("size"), Value::Int(10));
        assert_eq!(map.property("missing"), Value::Nil);
        assert_eq!(map.index(&Value::from("name")), Value::from("x"));

        assert_eq!(Value::Int(5).index(&Value::Int(0)), Value::Nil);
        assert_eq!(Value::from("héllo").property("size"), Value::Int(5));
    }

    #[test]
    fn test_contains() {
        assert!(Value::from("hello").contains(&Value::from("ell")));
        assert!(Value::from(vec![1, 2]).contains(&Value::Float(2.0)));
        assert!(Value::from(json!({"k": 1})).contains(&Value::from("k")));
        assert!(!Value::Int(12).contains(&Value::Int(1)));
    }

    #[test]
    fn test_empty_and_blank() {
        assert!(Value::from("").is_empty());
        assert!(!Value::from(" ").is_empty());
        assert!(Value::from(" \n").is_blank());
        assert!(Value::Nil.is_blank());
        assert!(!Value::Nil.is_empty());
        assert!(!Value::Int(0).is_blank());
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::from(" 42 ").as_number(), Some(Number::Int(42)));
        assert_eq!(Value::from("2.5").as_number(), Some(Number::Float(2.5)));
        assert_eq!(Value::from("inf").as_number(), None);
        assert_eq!(Value::Bool(true).as_number(), None);
        assert_eq!(Value::Float(3.9).as_integer(), Some(3));
    }

    #[test]
    fn test_host_object() {
        let point = Value::Object(Arc::new(Point));
        assert_eq!(point.property("x"), Value::Int(3));
        assert_eq!(point.property("y"), Value::Nil);
        assert_eq!(point.to_output(), "(3, 4)");
        assert_eq!(point, point.clone());
    }
}
