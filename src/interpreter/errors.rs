//! Runtime error types for the interpreter
//!
//! This module defines [`RuntimeError`], which represents all errors that can occur
//! during program execution (as opposed to parse errors).
//!
//! Every variant corresponds to an exception class of the scripting language
//! ([`RuntimeError::kind_name`]). `Display` renders only the exception message,
//! which is what the trace reports for an uncaught failure. Errors raised by user
//! code with `raise` carry the exception instance they were raised with.

use crate::memory::value::{Address, Value};
use crate::parser::ast::SourceLocation;
use thiserror::Error;

/// Built-in exception classes and their parents
pub const EXCEPTION_HIERARCHY: &[(&str, Option<&str>)] = &[
    ("BaseException", None),
    ("Exception", Some("BaseException")),
    ("ArithmeticError", Some("Exception")),
    ("ZeroDivisionError", Some("ArithmeticError")),
    ("OverflowError", Some("ArithmeticError")),
    ("LookupError", Some("Exception")),
    ("IndexError", Some("LookupError")),
    ("KeyError", Some("LookupError")),
    ("ValueError", Some("Exception")),
    ("TypeError", Some("Exception")),
    ("NameError", Some("Exception")),
    ("UnboundLocalError", Some("NameError")),
    ("AttributeError", Some("Exception")),
    ("RuntimeError", Some("Exception")),
    ("RecursionError", Some("RuntimeError")),
    ("NotImplementedError", Some("RuntimeError")),
    ("AssertionError", Some("Exception")),
    ("StopIteration", Some("Exception")),
    ("ImportError", Some("Exception")),
    ("ModuleNotFoundError", Some("ImportError")),
];

/// Runtime errors that can occur during execution
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    /// Name lookup failed in every scope
    #[error("name '{name}' is not defined")]
    UndefinedVariable {
        name: String,
        location: SourceLocation,
    },

    /// Attribute lookup failed
    #[error("{message}")]
    MissingAttribute {
        message: String,
        location: SourceLocation,
    },

    /// Operation applied to a value of the wrong type
    #[error("{message}")]
    TypeError {
        message: String,
        location: SourceLocation,
    },

    /// Sequence index out of range
    #[error("{message}")]
    IndexOutOfRange {
        message: String,
        location: SourceLocation,
    },

    /// Missing mapping key; `key` is the key's repr
    #[error("{key}")]
    KeyNotFound {
        key: String,
        value: Value,
        location: SourceLocation,
    },

    /// Right type, inappropriate value
    #[error("{message}")]
    ValueError {
        message: String,
        location: SourceLocation,
    },

    /// Division or modulo by zero
    #[error("{message}")]
    DivisionByZero {
        message: String,
        location: SourceLocation,
    },

    /// Integer result does not fit in 64 bits
    #[error("{message}")]
    IntegerOverflow {
        message: String,
        location: SourceLocation,
    },

    /// Too many nested frames
    #[error("maximum recursion depth exceeded")]
    RecursionLimit { location: SourceLocation },

    /// Import of a module the interpreter does not provide
    #[error("No module named '{name}'")]
    ModuleNotFound {
        name: String,
        location: SourceLocation,
    },

    /// `assert` failed
    #[error("{message}")]
    AssertionFailed {
        message: String,
        location: SourceLocation,
    },

    /// Language feature outside the supported subset
    #[error("{message}")]
    UnsupportedOperation {
        message: String,
        location: SourceLocation,
    },

    /// `break`/`continue`/`return` or bare `raise` used where it has no meaning
    #[error("{message}")]
    InvalidControlFlow {
        message: String,
        location: SourceLocation,
    },

    /// Exception raised by user code; `message` is `str()` of the instance
    #[error("{message}")]
    Raised {
        class: Address,
        class_name: String,
        instance: Value,
        message: String,
        location: SourceLocation,
    },
}

impl RuntimeError {
    /// Name of the exception class this error is an instance of
    pub fn kind_name(&self) -> &str {
        match self {
            RuntimeError::UndefinedVariable { .. } => "NameError",
            RuntimeError::MissingAttribute { .. } => "AttributeError",
            RuntimeError::TypeError { .. } => "TypeError",
            RuntimeError::IndexOutOfRange { .. } => "IndexError",
            RuntimeError::KeyNotFound { .. } => "KeyError",
            RuntimeError::ValueError { .. } => "ValueError",
            RuntimeError::DivisionByZero { .. } => "ZeroDivisionError",
            RuntimeError::IntegerOverflow { .. } => "OverflowError",
            RuntimeError::RecursionLimit { .. } => "RecursionError",
            RuntimeError::ModuleNotFound { .. } => "ModuleNotFoundError",
            RuntimeError::AssertionFailed { .. } => "AssertionError",
            RuntimeError::UnsupportedOperation { .. } => "NotImplementedError",
            RuntimeError::InvalidControlFlow { .. } => "RuntimeError",
            RuntimeError::Raised { class_name, .. } => class_name,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            RuntimeError::UndefinedVariable { location, .. }
            | RuntimeError::MissingAttribute { location, .. }
            | RuntimeError::TypeError { location, .. }
            | RuntimeError::IndexOutOfRange { location, .. }
            | RuntimeError::KeyNotFound { location, .. }
            | RuntimeError::ValueError { location, .. }
            | RuntimeError::DivisionByZero { location, .. }
            | RuntimeError::IntegerOverflow { location, .. }
            | RuntimeError::RecursionLimit { location }
            | RuntimeError::ModuleNotFound { location, .. }
            | RuntimeError::AssertionFailed { location, .. }
            | RuntimeError::UnsupportedOperation { location, .. }
            | RuntimeError::InvalidControlFlow { location, .. }
            | RuntimeError::Raised { location, .. } => *location,
        }
    }

    pub fn type_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::TypeError {
            message: message.into(),
            location,
        }
    }

    pub fn value_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::ValueError {
            message: message.into(),
            location,
        }
    }

    pub fn index_error(message: impl Into<String>, location: SourceLocation) -> Self {
        RuntimeError::IndexOutOfRange {
            message: message.into(),
            location,
        }
    }

    pub fn overflow(location: SourceLocation) -> Self {
        RuntimeError::IntegerOverflow {
            message: "integer overflow".to_string(),
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_the_exception_message() {
        let loc = SourceLocation::new(3, 1);
        let err = RuntimeError::UndefinedVariable {
            name: "x".into(),
            location: loc,
        };
        assert_eq!(err.to_string(), "name 'x' is not defined");
        assert_eq!(err.kind_name(), "NameError");
        assert_eq!(err.location().line, 3);

        let err = RuntimeError::KeyNotFound {
            key: "'missing'".into(),
            value: Value::str("missing"),
            location: loc,
        };
        assert_eq!(err.to_string(), "'missing'");
    }

    #[test]
    fn test_hierarchy_parents_are_declared_first() {
        for (i, (_, parent)) in EXCEPTION_HIERARCHY.iter().enumerate() {
            if let Some(parent) = parent {
                assert!(EXCEPTION_HIERARCHY[..i].iter().any(|(name, _)| name == parent));
            }
        }
    }
}
