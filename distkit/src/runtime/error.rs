// Error handling for the distkit runtime (heap access, natives, evaluator)

use crate::runtime::heap::Handle;
use std::fmt;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors raised while operating on heap values or invoking callables.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Wrong type for an operation
    TypeError {
        expected: String,
        actual: String,
        operation: String,
    },

    /// Free identifier with no local, captured or global binding
    UndefinedSymbol(String),

    /// Wrong number of arguments for a native
    ArityMismatch {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Value is not callable
    NotCallable(String),

    /// Handle does not belong to the heap it was used with
    InvalidHandle(Handle),

    /// JSON parsing/stringifying errors
    JsonError(String),

    Generic(String),
}

impl RuntimeError {
    pub fn new(message: &str) -> RuntimeError {
        RuntimeError::Generic(message.to_string())
    }

    pub(crate) fn type_error(expected: &str, actual: &str, operation: &str) -> RuntimeError {
        RuntimeError::TypeError {
            expected: expected.to_string(),
            actual: actual.to_string(),
            operation: operation.to_string(),
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::TypeError {
                expected,
                actual,
                operation,
            } => {
                write!(
                    f,
                    "Type error in {}: expected {}, got {}",
                    operation, expected, actual
                )
            }
            RuntimeError::UndefinedSymbol(name) => write!(f, "{} is not defined", name),
            RuntimeError::ArityMismatch {
                function,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Arity mismatch in {}: expected {} arguments, got {}",
                    function, expected, actual
                )
            }
            RuntimeError::NotCallable(what) => write!(f, "{} is not a function", what),
            RuntimeError::InvalidHandle(handle) => write!(f, "Invalid heap handle {}", handle),
            RuntimeError::JsonError(msg) => write!(f, "JSON error: {}", msg),
            RuntimeError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}
