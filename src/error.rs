/// Slot domain errors
///
/// Raised through `anyhow` by the library; callers that need to branch on the
/// failure use `err.downcast_ref::<SlotError>()`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("Slot cannot be created for field \"{0}\" - a field of that name already exists.")]
    FieldExists(String),

    #[error("The root alias \"{root}\" cannot match the Slots alias \"{slots}\"")]
    AliasCollision { root: String, slots: String },

    #[error("Query selects from \"{table}\", which has no Slots relation (installed for \"{host}\")")]
    HostMismatch { table: String, host: String },

    #[error("The Slots alias \"{0}\" is already joined in this query")]
    DuplicateAlias(String),

    #[error("No slot relation installed for table \"{0}\"")]
    NotInstalled(String),

    #[error("Unknown record property / related component \"{0}\"")]
    UnknownProperty(String),

    #[error("Value {value} is not valid for slot \"{name}\" of type {slot_type}")]
    InvalidValue {
        name: String,
        slot_type: String,
        value: String,
    },

    #[error("\"{0}\" is not a valid SQL identifier")]
    InvalidIdentifier(String),

    #[error("Slot name cannot be empty")]
    EmptyName,
}

/// Reject anything that cannot be interpolated into SQL as a bare identifier
pub fn ensure_identifier(name: &str) -> Result<(), SlotError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(SlotError::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers() {
        assert!(ensure_identifier("post").is_ok());
        assert!(ensure_identifier("_blog_post2").is_ok());
        assert!(ensure_identifier("").is_err());
        assert!(ensure_identifier("2post").is_err());
        assert_eq!(
            ensure_identifier("post; DROP TABLE slot"),
            Err(SlotError::InvalidIdentifier("post; DROP TABLE slot".to_string()))
        );
    }
}
