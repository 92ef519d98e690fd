//! Error types for value and array operations

use crate::value::Type;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ValueError>;

/// Failure of a value or array operation.
///
/// Every failure is local and synchronous. Absence of a key is never an
/// error: lookups report it through `bool`/`Option` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The operation needs a specific kind of value (e.g. array-shaped)
    #[error("type mismatch: expected {expected}, got {found}")]
    TypeMismatch { expected: Type, found: Type },

    /// Array, object or unresolved reference used as an array key
    #[error("illegal offset type: {found}")]
    IllegalKeyType { found: Type },

    /// Next-index insert collided with an existing slot, or the integer
    /// key space is exhausted
    #[error("cannot add element to the array as the next element is already occupied")]
    SlotOccupied,

    /// Reference chain longer than the configured limit (usually a cycle)
    #[error("reference chain exceeds {limit} levels")]
    ReferenceDepth { limit: usize },
}

impl ValueError {
    pub fn type_mismatch(expected: Type, found: Type) -> Self {
        Self::TypeMismatch { expected, found }
    }

    pub fn illegal_key(found: Type) -> Self {
        Self::IllegalKeyType { found }
    }

    pub fn reference_depth(limit: usize) -> Self {
        Self::ReferenceDepth { limit }
    }

    /// Short, stable name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::IllegalKeyType { .. } => "IllegalKeyType",
            Self::SlotOccupied => "SlotOccupied",
            Self::ReferenceDepth { .. } => "ReferenceDepth",
        }
    }
}

/// Configuration loading error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }
}
