//! Schema-less product attributes (color, size, material, ...).

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::value_object::ValueObject;

/// Tagged attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeValue {
    Text(String),
    Number(Decimal),
    Flag(bool),
}

impl ValueObject for AttributeValue {}

impl AttributeValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Value-level equality that ignores decimal scale (`1.50 == 1.5`).
    pub fn same_value(&self, other: &AttributeValue) -> bool {
        match (self, other) {
            (AttributeValue::Number(a), AttributeValue::Number(b)) => a.normalize() == b.normalize(),
            (a, b) => a == b,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

impl From<Decimal> for AttributeValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

/// Attribute name → value.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_ignoring_scale() {
        let a = AttributeValue::Number(Decimal::new(150, 2));
        let b = AttributeValue::Number(Decimal::new(15, 1));
        assert!(a.same_value(&b));
        assert!(!a.same_value(&AttributeValue::text("1.5")));
    }

    #[test]
    fn serializes_as_tagged_variant() {
        let json = serde_json::to_value(AttributeValue::from("red")).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "red" }));
    }
}
