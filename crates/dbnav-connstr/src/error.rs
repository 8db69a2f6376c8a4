//! Error types for the connection-string codec
//!
//! Every failure is local to a single `parse` call: nothing here touches
//! cache or gate state.

use crate::descriptor::Dialect;

/// Errors while parsing a raw connection string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input was empty or whitespace only
    #[error("connection string is empty")]
    Empty,

    /// Dialect could not be inferred from the input
    #[error("unrecognized connection string format")]
    UnknownDialect,

    /// A mandatory field is missing
    #[error("{dialect} connection string is missing {field}")]
    MissingField {
        /// Dialect being parsed
        dialect: Dialect,
        /// Name of the missing field as it appears in the grammar
        field: &'static str,
    },

    /// The string does not start with a scheme this dialect accepts
    #[error("{dialect} connection string must start with {expected}")]
    SchemeMismatch {
        /// Dialect being parsed
        dialect: Dialect,
        /// Accepted scheme prefix(es)
        expected: &'static str,
    },

    /// Whitespace inside a value where none is allowed
    #[error("connection string contains whitespace at offset {offset}")]
    EmbeddedWhitespace {
        /// Byte offset of the offending character in the trimmed input
        offset: usize,
    },

    /// NoSQL `AccountEndpoint` is not an absolute URL with a host
    #[error("invalid account endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// Endpoint value as written
        endpoint: String,
        /// Reason reported by the URL parser
        message: String,
    },

    /// URI authority has no host
    #[error("connection string has no host")]
    MissingHost,

    /// Port is not a number in `0..=65535`
    #[error("invalid port '{0}'")]
    InvalidPort(String),

    /// `mongodb+srv` requires exactly one host without a port
    #[error("mongodb+srv requires a single host name without a port, got '{0}'")]
    InvalidSrvHost(String),

    /// Percent-encoded component does not decode to UTF-8
    #[error("invalid percent-encoding in {field}")]
    InvalidEncoding {
        /// Component that failed to decode
        field: &'static str,
    },
}

impl ParseError {
    /// Create missing-field error
    #[inline]
    #[must_use]
    pub fn missing(dialect: Dialect, field: &'static str) -> Self {
        Self::MissingField { dialect, field }
    }

    /// Message suitable for an input box validation hint
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Empty => "Connection string cannot be empty.".to_string(),
            Self::MissingField { field, .. } => {
                format!("Connection string must contain \"{field}\".")
            }
            Self::SchemeMismatch { expected, .. } => {
                format!("Connection string must start with \"{expected}\".")
            }
            Self::EmbeddedWhitespace { .. } => {
                "Connection string cannot contain whitespace.".to_string()
            }
            other => {
                let mut message = other.to_string();
                if let Some(first) = message.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                message.push('.');
                message
            }
        }
    }
}

/// Result type alias for codec operations
pub type ParseResult<T> = Result<T, ParseError>;
