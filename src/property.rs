//! Closed property value type.
//!
//! The original framework keeps a free-form dict of properties per object.
//! Here the set of representable values is closed to four variants so that
//! `set_prop`/`get_prop` stay statically checkable at call sites instead of
//! passing `Any` around.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    Float(f64),
    Bool(bool),
    Str(String),
    Int(i64),
}

impl PropertyValue {
    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            PropertyValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(v) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coerces_to_float() {
        let v = PropertyValue::Int(3);
        assert_eq!(v.as_float(), Some(3.0));
        assert_eq!(v.as_int(), Some(3));
    }

    #[test]
    fn wrong_accessor_returns_none() {
        let v = PropertyValue::Bool(true);
        assert_eq!(v.as_str(), None);
        assert_eq!(v.as_float(), None);
    }
}
