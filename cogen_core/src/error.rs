//! Error types and result definitions for the value layer.
//!
//! These cover the failures that can happen without any execution context:
//! reading a value as the wrong type and looking up a missing dictionary key.
//! Execution faults live in `cogen_vm::error`.

use crate::value::TypeTag;
use std::sync::Arc;
use thiserror::Error;

/// The result type used by the value layer.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by value conversions and container access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A value was read as a type it does not hold.
    #[error("TypeError: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the caller asked for.
        expected: TypeTag,
        /// The type actually stored.
        found: TypeTag,
    },

    /// Key not found in a dictionary.
    #[error("KeyError: '{key}'")]
    KeyError {
        /// The missing key.
        key: Arc<str>,
    },

    /// A container had no length.
    #[error("TypeError: object of type '{found}' has no len()")]
    NoLength {
        /// The type that was asked for a length.
        found: TypeTag,
    },
}

impl CoreError {
    /// Create a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: TypeTag, found: TypeTag) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Create a key error.
    #[must_use]
    pub fn key(key: impl Into<Arc<str>>) -> Self {
        Self::KeyError { key: key.into() }
    }

    /// Get the exception type name reported to running code.
    #[must_use]
    pub fn exception_type(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } | Self::NoLength { .. } => "TypeError",
            Self::KeyError { .. } => "KeyError",
        }
    }
}
