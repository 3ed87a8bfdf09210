// ⚠️ Error taxonomy for the registry core
//
// ValidationError -> caller input rejected before any write
// StorageError    -> persistence fault, surfaced with the original description
// RegistryError   -> umbrella returned by create and the Session facade

use crate::session::Mode;
use thiserror::Error;

/// A required field was missing or blank.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn required(field: &str) -> Self {
        ValidationError {
            field: field.to_string(),
            message: "Required field is empty".to_string(),
        }
    }
}

/// Underlying storage fault during a read or write.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("{operation} is not available while {mode}")]
    WrongMode { operation: &'static str, mode: Mode },
}

impl RegistryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, RegistryError::Validation(_))
    }

    pub fn is_storage(&self) -> bool {
        matches!(self, RegistryError::Storage(_))
    }
}
