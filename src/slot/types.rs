/// Core slot type definitions
///
/// A slot is a named, typed value stored in its own row and attached to host
/// records through a reference table. Values are kept as JSON so any type tag
/// can round-trip through the same column.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A persisted slot row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Primary key of the slot row
    pub id: i64,
    /// Slot name, unique within one host record
    pub name: String,
    /// Type tag (e.g. "Text", "Boolean")
    pub slot_type: SlotType,
    /// Current value, `Value::Null` when unset
    pub value: Value,
}

/// A slot that has not been saved yet
#[derive(Debug, Clone, PartialEq)]
pub struct NewSlot {
    pub name: String,
    pub slot_type: SlotType,
    pub value: Value,
}

/// Slot type tag
///
/// Known tags validate values written through the record filter; anything else
/// is kept verbatim and accepts any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SlotType {
    /// Single line string
    #[default]
    Text,
    /// Multi line string
    Textarea,
    /// JSON integer
    Integer,
    /// JSON boolean
    Boolean,
    /// "YYYY-MM-DD" string
    Date,
    /// Any JSON document
    Json,
    /// Application specific tag
    Other(String),
}

impl SlotType {
    pub fn as_str(&self) -> &str {
        match self {
            SlotType::Text => "Text",
            SlotType::Textarea => "Textarea",
            SlotType::Integer => "Integer",
            SlotType::Boolean => "Boolean",
            SlotType::Date => "Date",
            SlotType::Json => "Json",
            SlotType::Other(tag) => tag,
        }
    }

    /// Whether `value` is acceptable for this type; null always is
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return true;
        }

        match self {
            SlotType::Text | SlotType::Textarea => value.is_string(),
            SlotType::Integer => value.is_i64() || value.is_u64(),
            SlotType::Boolean => value.is_boolean(),
            SlotType::Date => value
                .as_str()
                .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
                .unwrap_or(false),
            SlotType::Json | SlotType::Other(_) => true,
        }
    }
}

impl From<&str> for SlotType {
    fn from(tag: &str) -> Self {
        match tag {
            "Text" => SlotType::Text,
            "Textarea" => SlotType::Textarea,
            "Integer" => SlotType::Integer,
            "Boolean" => SlotType::Boolean,
            "Date" => SlotType::Date,
            "Json" => SlotType::Json,
            other => SlotType::Other(other.to_string()),
        }
    }
}

impl From<String> for SlotType {
    fn from(tag: String) -> Self {
        SlotType::from(tag.as_str())
    }
}

impl From<SlotType> for String {
    fn from(slot_type: SlotType) -> Self {
        slot_type.as_str().to_string()
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A slot given either by name or as a loaded row
///
/// `remove_slot` takes both forms.
#[derive(Debug, Clone, Copy)]
pub enum SlotRef<'a> {
    Name(&'a str),
    Slot(&'a Slot),
}

impl<'a> SlotRef<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            SlotRef::Name(name) => name,
            SlotRef::Slot(slot) => &slot.name,
        }
    }
}

impl<'a> From<&'a str> for SlotRef<'a> {
    fn from(name: &'a str) -> Self {
        SlotRef::Name(name)
    }
}

impl<'a> From<&'a String> for SlotRef<'a> {
    fn from(name: &'a String) -> Self {
        SlotRef::Name(name)
    }
}

impl<'a> From<&'a Slot> for SlotRef<'a> {
    fn from(slot: &'a Slot) -> Self {
        SlotRef::Slot(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_tags_are_kept() {
        assert_eq!(SlotType::from("Boolean"), SlotType::Boolean);
        assert_eq!(SlotType::from("Markdown"), SlotType::Other("Markdown".to_string()));
        assert_eq!(SlotType::from("Markdown").to_string(), "Markdown");
    }

    #[test]
    fn typed_values() {
        assert!(SlotType::Integer.accepts(&json!(42)));
        assert!(!SlotType::Integer.accepts(&json!("42")));
        assert!(SlotType::Boolean.accepts(&json!(false)));
        assert!(SlotType::Date.accepts(&json!("2024-02-29")));
        assert!(!SlotType::Date.accepts(&json!("2023-02-29")));
        assert!(!SlotType::Text.accepts(&json!(["a"])));
        assert!(SlotType::Other("Widget".to_string()).accepts(&json!({"a": 1})));
        assert!(SlotType::Integer.accepts(&Value::Null));
    }

    #[test]
    fn serializes_as_plain_tag() {
        let slot = Slot {
            id: 1,
            name: "subtitle".to_string(),
            slot_type: SlotType::Textarea,
            value: json!("hello"),
        };
        let encoded = serde_json::to_value(&slot).unwrap();
        assert_eq!(encoded["slot_type"], json!("Textarea"));
    }
}
