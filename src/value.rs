//! Raw values held by fact-store records.
//!
//! A fact record maps predicate keys to these values. They are still raw:
//! turning a value into a typed attribute happens later, on access.

use serde::{Deserialize, Serialize};

/// A raw value attached to a fact-store predicate.
///
/// # Examples
///
/// ```
/// use reality::Value;
///
/// let code = Value::from("AR");
/// let area = Value::quantity(2_780_400.0, "km²");
///
/// assert_eq!(code.as_string(), Some("AR"));
/// assert!(area.is_quantity());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    /// A magnitude with the unit the source declared for it.
    Quantity {
        amount: f64,
        unit: String,
    },
    /// Decimal-degree coordinates.
    Coordinate {
        latitude: f64,
        longitude: f64,
    },
    /// A link to another record in the same fact store.
    Item {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Structured(serde_json::Value),
    Null,
}

impl Value {
    /// Creates a quantity value.
    #[must_use]
    pub fn quantity(amount: f64, unit: impl Into<String>) -> Self {
        Self::Quantity {
            amount,
            unit: unit.into(),
        }
    }

    /// Creates a link to another record, optionally carrying its label.
    #[must_use]
    pub fn item(id: impl Into<String>, label: Option<&str>) -> Self {
        Self::Item {
            id: id.into(),
            label: label.map(str::to_string),
        }
    }

    pub const fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    pub const fn is_quantity(&self) -> bool {
        matches!(self, Self::Quantity { .. })
    }

    pub const fn is_coordinate(&self) -> bool {
        matches!(self, Self::Coordinate { .. })
    }

    pub const fn is_item(&self) -> bool {
        matches!(self, Self::Item { .. })
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the value as a number; quantities yield their amount.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            Self::Quantity { amount, .. } => Some(*amount),
            _ => None,
        }
    }

    /// Returns the text a human would read for this value.
    ///
    /// Strings are returned as-is and items yield their label.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            Self::Item { label, .. } => label.as_deref(),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Quantity { .. } => "quantity",
            Self::Coordinate { .. } => "coordinate",
            Self::Item { .. } => "item",
            Self::Structured(_) => "structured",
            Self::Null => "null",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(v) => write!(f, "{v:?}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Quantity { amount, unit } => write!(f, "{amount} {unit}"),
            Self::Coordinate { latitude, longitude } => write!(f, "({latitude}, {longitude})"),
            Self::Item { id, label: Some(label) } => write!(f, "{id} ({label})"),
            Self::Item { id, label: None } => write!(f, "{id}"),
            Self::Structured(v) => write!(f, "{v}"),
            Self::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Self::Structured(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_quantity() {
        let val = Value::quantity(2_780_400.0, "km²");
        assert!(val.is_quantity());
        assert_eq!(val.as_float(), Some(2_780_400.0));
        assert_eq!(val.type_name(), "quantity");
        assert!(val.as_string().is_none());
    }

    #[test]
    fn test_value_item_text_is_label() {
        let val = Value::item("Q414", Some("Argentina"));
        assert!(val.is_item());
        assert_eq!(val.as_text(), Some("Argentina"));

        let bare = Value::item("Q414", None);
        assert_eq!(bare.as_text(), None);
    }

    #[test]
    fn test_value_int_reads_as_float() {
        assert_eq!(Value::Int(54).as_float(), Some(54.0));
        assert_eq!(Value::from("54").as_float(), None);
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", Value::from("AR")), "\"AR\"");
        assert_eq!(format!("{}", Value::quantity(5.0, "km²")), "5 km²");
        assert_eq!(format!("{}", Value::item("Q414", Some("Argentina"))), "Q414 (Argentina)");
        assert_eq!(format!("{}", Value::Null), "null");
    }

    #[test]
    fn test_value_serialization_is_tagged() {
        let val = Value::quantity(1.5, "$");
        let json = serde_json::to_value(&val).unwrap();
        assert_eq!(json["type"], "quantity");
        assert_eq!(json["value"]["unit"], "$");

        let back: Value = serde_json::from_value(json).unwrap();
        assert_eq!(back, val);
    }
}
