//! Runtime error types for the host.
//!
//! This module defines every fault a context can raise while executing, plus
//! the failures of the context pool itself. A fault carries a traceback of the
//! procedures that were on the context's frame stack when it was raised.

use cogen_core::CoreError;
use std::fmt;
use std::sync::Arc;

/// Runtime error raised by a context or by the pool.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    /// Error kind
    pub kind: RuntimeErrorKind,
    /// Traceback frames, innermost first
    pub traceback: Vec<TracebackEntry>,
}

/// Specific runtime error types.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeErrorKind {
    // =========================================================================
    // Type Errors
    // =========================================================================
    /// Operation not supported for the given value
    TypeError { message: Arc<str> },
    /// Unsupported operand types for binary operation
    UnsupportedOperandTypes {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    // =========================================================================
    // Lookup Errors
    // =========================================================================
    /// Native function not registered with the engine
    NameError { name: Arc<str> },
    /// Key not found in dict
    KeyError { key: Arc<str> },
    /// Procedure called with the wrong number of arguments
    ArityMismatch {
        procedure: Arc<str>,
        expected: u8,
        given: usize,
    },

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// `yield` called from a context that does not belong to a generator
    InvalidSuspension,
    /// Exception raised by running code
    Exception { message: Arc<str> },

    // =========================================================================
    // System Errors
    // =========================================================================
    /// Call depth limit exceeded
    RecursionError { depth: usize },
    /// Instruction budget for one execution exhausted
    ExecutionLimit { budget: u64 },
    /// No context available in the pool
    ContextPoolExhausted { capacity: usize },
    /// Context asked to do something its state does not allow
    InvalidContextState {
        operation: &'static str,
        state: &'static str,
    },
    /// Invalid opcode
    InvalidOpcode { opcode: u8 },
    /// Internal host error (should not happen)
    InternalError { message: Arc<str> },
}

/// A single entry in the traceback.
#[derive(Debug, Clone, PartialEq)]
pub struct TracebackEntry {
    /// Procedure name
    pub procedure: Arc<str>,
    /// Instruction index that was executing
    pub ip: u32,
}

impl RuntimeError {
    /// Create a new runtime error.
    #[inline]
    pub fn new(kind: RuntimeErrorKind) -> Self {
        Self {
            kind,
            traceback: Vec::new(),
        }
    }

    /// Add a traceback entry.
    #[inline]
    pub fn add_traceback(&mut self, entry: TracebackEntry) {
        self.traceback.push(entry);
    }

    /// Returns true for the fault raised by `yield` outside a generator.
    #[inline]
    pub fn is_invalid_suspension(&self) -> bool {
        matches!(self.kind, RuntimeErrorKind::InvalidSuspension)
    }

    // =========================================================================
    // Convenience Constructors
    // =========================================================================

    #[inline]
    pub fn type_error(message: impl Into<Arc<str>>) -> Self {
        Self::new(RuntimeErrorKind::TypeError {
            message: message.into(),
        })
    }

    #[inline]
    pub fn unsupported_operand(op: &'static str, left: &'static str, right: &'static str) -> Self {
        Self::new(RuntimeErrorKind::UnsupportedOperandTypes { op, left, right })
    }

    #[inline]
    pub fn name_error(name: impl Into<Arc<str>>) -> Self {
        Self::new(RuntimeErrorKind::NameError { name: name.into() })
    }

    #[inline]
    pub fn key_error(key: impl Into<Arc<str>>) -> Self {
        Self::new(RuntimeErrorKind::KeyError { key: key.into() })
    }

    #[inline]
    pub fn arity_mismatch(procedure: impl Into<Arc<str>>, expected: u8, given: usize) -> Self {
        Self::new(RuntimeErrorKind::ArityMismatch {
            procedure: procedure.into(),
            expected,
            given,
        })
    }

    #[inline]
    pub fn invalid_suspension() -> Self {
        Self::new(RuntimeErrorKind::InvalidSuspension)
    }

    #[inline]
    pub fn exception(message: impl Into<Arc<str>>) -> Self {
        Self::new(RuntimeErrorKind::Exception {
            message: message.into(),
        })
    }

    #[inline]
    pub fn recursion_error(depth: usize) -> Self {
        Self::new(RuntimeErrorKind::RecursionError { depth })
    }

    #[inline]
    pub fn execution_limit(budget: u64) -> Self {
        Self::new(RuntimeErrorKind::ExecutionLimit { budget })
    }

    #[inline]
    pub fn pool_exhausted(capacity: usize) -> Self {
        Self::new(RuntimeErrorKind::ContextPoolExhausted { capacity })
    }

    #[inline]
    pub fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Self::new(RuntimeErrorKind::InvalidContextState { operation, state })
    }

    #[inline]
    pub fn invalid_opcode(opcode: u8) -> Self {
        Self::new(RuntimeErrorKind::InvalidOpcode { opcode })
    }

    #[inline]
    pub fn internal(message: impl Into<Arc<str>>) -> Self {
        Self::new(RuntimeErrorKind::InternalError {
            message: message.into(),
        })
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            RuntimeErrorKind::TypeError { message } => write!(f, "TypeError: {}", message),
            RuntimeErrorKind::UnsupportedOperandTypes { op, left, right } => {
                write!(
                    f,
                    "TypeError: unsupported operand type(s) for {}: '{}' and '{}'",
                    op, left, right
                )
            }
            RuntimeErrorKind::NameError { name } => {
                write!(f, "NameError: native function '{}' is not registered", name)
            }
            RuntimeErrorKind::KeyError { key } => write!(f, "KeyError: '{}'", key),
            RuntimeErrorKind::ArityMismatch {
                procedure,
                expected,
                given,
            } => write!(
                f,
                "TypeError: {}() takes {} argument(s) ({} given)",
                procedure, expected, given
            ),
            RuntimeErrorKind::InvalidSuspension => {
                write!(f, "Cannot call yield outside of a generator function")
            }
            RuntimeErrorKind::Exception { message } => write!(f, "Exception: {}", message),
            RuntimeErrorKind::RecursionError { depth } => {
                write!(
                    f,
                    "RecursionError: maximum call depth exceeded ({})",
                    depth
                )
            }
            RuntimeErrorKind::ExecutionLimit { budget } => {
                write!(f, "ExecutionLimit: exceeded {} instructions", budget)
            }
            RuntimeErrorKind::ContextPoolExhausted { capacity } => {
                write!(f, "ResourceError: all {} contexts are in use", capacity)
            }
            RuntimeErrorKind::InvalidContextState { operation, state } => {
                write!(f, "InternalError: cannot {} a {} context", operation, state)
            }
            RuntimeErrorKind::InvalidOpcode { opcode } => {
                write!(f, "InternalError: invalid opcode 0x{:02x}", opcode)
            }
            RuntimeErrorKind::InternalError { message } => {
                write!(f, "InternalError: {}", message)
            }
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<CoreError> for RuntimeError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::KeyError { key } => RuntimeError::key_error(key),
            other => RuntimeError::type_error(
                other
                    .to_string()
                    .trim_start_matches("TypeError: ")
                    .to_string(),
            ),
        }
    }
}

/// Result type for host operations.
pub type VmResult<T> = Result<T, RuntimeError>;
