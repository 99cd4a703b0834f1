//! Error types for GAQL.

use std::fmt;

use thiserror::Error;

/// The kind of problem a query has, independent of its message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed token stream, missing or misplaced clause, misused operator.
    Syntax,
    /// Unknown resource in the FROM clause.
    Resource,
    /// Malformed or unknown field path.
    Field,
    /// Any other semantic problem (parameters, limits).
    Validation,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Syntax => "syntax",
            ErrorKind::Resource => "resource",
            ErrorKind::Field => "field",
            ErrorKind::Validation => "validation",
        };
        f.write_str(name)
    }
}

/// The main error type for GAQL operations.
#[derive(Debug, Error)]
pub enum GaqlError {
    /// The query could not be tokenized or derived by the grammar.
    #[error("{message}")]
    Syntax {
        message: String,
        position: Option<usize>,
    },

    /// Unknown resource name.
    #[error("{0}")]
    Resource(String),

    /// Malformed or unknown field path.
    #[error("{0}")]
    Field(String),

    /// Catch-all semantic error.
    #[error("{0}")]
    Validation(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GaqlError {
    /// Create a syntax error without position information.
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            position: None,
        }
    }

    /// Create a syntax error at the given byte offset of the normalized query.
    pub fn syntax_at(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Build an error of the given kind.
    pub fn of_kind(kind: ErrorKind, message: impl Into<String>, position: Option<usize>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Syntax => Self::Syntax { message, position },
            ErrorKind::Resource => Self::Resource(message),
            ErrorKind::Field => Self::Field(message),
            ErrorKind::Validation => Self::Validation(message),
        }
    }

    /// The query-level kind of this error. Configuration and IO failures
    /// count as generic validation errors.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Syntax { .. } => ErrorKind::Syntax,
            Self::Resource(_) => ErrorKind::Resource,
            Self::Field(_) => ErrorKind::Field,
            Self::Validation(_) | Self::Config(_) | Self::Io(_) => ErrorKind::Validation,
        }
    }

    /// Character position for syntax errors, when known.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Syntax { position, .. } => *position,
            _ => None,
        }
    }
}

/// Result type alias for GAQL operations.
pub type GaqlResult<T> = Result<T, GaqlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = GaqlError::syntax_at(5, "FROM clause is required");
        assert_eq!(err.to_string(), "FROM clause is required");
        assert_eq!(err.position(), Some(5));
    }

    #[test]
    fn test_of_kind_round_trips_kind() {
        for kind in [
            ErrorKind::Syntax,
            ErrorKind::Resource,
            ErrorKind::Field,
            ErrorKind::Validation,
        ] {
            assert_eq!(GaqlError::of_kind(kind, "boom", None).kind(), kind);
        }
    }

    #[test]
    fn test_config_error_display() {
        let err = GaqlError::Config("bad indent".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad indent");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
