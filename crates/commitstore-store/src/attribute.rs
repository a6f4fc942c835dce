//! Typed attribute values as held by the storage substrate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A stored record: attribute name to typed value.
pub type Item = BTreeMap<String, AttributeValue>;

/// Attribute type tag used in key schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    /// String.
    S,
    /// Number, carried as a decimal string.
    N,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeType::S => f.write_str("S"),
            AttributeType::N => f.write_str("N"),
        }
    }
}

/// A typed attribute value.
///
/// Numbers travel as decimal strings so large integers and millisecond
/// timestamps are never rounded through a float.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// String value.
    S(String),
    /// Decimal number.
    N(String),
}

impl AttributeValue {
    /// Creates a string attribute.
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::S(value.into())
    }

    /// Creates a numeric attribute from anything that renders as a decimal.
    pub fn number(value: impl fmt::Display) -> Self {
        AttributeValue::N(value.to_string())
    }

    /// Returns the type tag of this value.
    pub fn attribute_type(&self) -> AttributeType {
        match self {
            AttributeValue::S(_) => AttributeType::S,
            AttributeValue::N(_) => AttributeType::N,
        }
    }

    /// Returns the string payload of an `S` value.
    pub fn as_string(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            AttributeValue::N(_) => None,
        }
    }

    /// Returns the decimal text of an `N` value.
    pub fn as_number(&self) -> Option<&str> {
        match self {
            AttributeValue::N(n) => Some(n),
            AttributeValue::S(_) => None,
        }
    }

    /// Approximate stored size in bytes.
    pub fn size(&self) -> usize {
        match self {
            AttributeValue::S(s) | AttributeValue::N(s) => s.len(),
        }
    }
}

/// Returns true if `text` is a plain decimal number (`-12`, `3.50`).
pub fn is_decimal(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    let (whole, fraction) = match digits.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (digits, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.map_or(true, all_digits)
}

/// Approximate stored size of an item: attribute names plus values.
pub fn item_size(item: &Item) -> usize {
    item.iter().map(|(name, value)| name.len() + value.size()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals() {
        for ok in ["0", "42", "-7", "3.25", "18446744073709551616"] {
            assert!(is_decimal(ok), "{ok}");
        }
        for bad in ["", "-", "1.", ".5", "1e3", "NaN", " 1", "0x10"] {
            assert!(!is_decimal(bad), "{bad}");
        }
    }

    #[test]
    fn serializes_as_tagged_object() {
        let value = AttributeValue::number(12u64);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"N":"12"}"#);
        let back: AttributeValue = serde_json::from_str(r#"{"S":"t"}"#).unwrap();
        assert_eq!(back, AttributeValue::string("t"));
    }
}
