//! dbnav Connection Strings
//!
//! Parses and rebuilds the three connection-string dialects a database
//! browser deals with into one canonical [`ConnectionDescriptor`].
//!
//! # Dialects
//!
//! - **NoSQL key/value**: `AccountEndpoint=<url>;AccountKey=<key>;[Database=<name>;]`
//! - **MongoDB URI**: `mongodb://...` and `mongodb+srv://...`
//! - **PostgreSQL URI**: `postgres://[user[:password]@]host[:port][/database]`
//!
//! # Round trip
//!
//! For every descriptor produced by [`parse`], `parse(&build(&d, &FieldOverrides::new()), dialect)`
//! returns a descriptor equal to `d`, even when the text differs from the
//! original input (key order, casing, whitespace, percent-encoding).
//!
//! # Example
//!
//! ```rust
//! use dbnav_connstr::{build, parse, Dialect, FieldOverrides};
//!
//! let raw = "Database=abcd;AccountEndpoint=https://abcdef.documents.azure.com:443/;AccountKey=abcdef==;";
//! let descriptor = parse(raw, Dialect::NoSqlKeyValue).unwrap();
//! assert_eq!(descriptor.full_id(), "abcdef.documents.azure.com:443/abcd");
//!
//! let rebuilt = build(&descriptor, &FieldOverrides::new().clear_database());
//! assert_eq!(
//!     rebuilt,
//!     "AccountEndpoint=https://abcdef.documents.azure.com:443/;AccountKey=abcdef==;"
//! );
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod codecs;
pub mod descriptor;
pub mod error;

pub use codecs::{codec_for, DialectCodec, MongoCodec, NoSqlCodec, PostgresCodec};
pub use descriptor::{
    ConnectionDescriptor, DescriptorSummary, Dialect, FieldOverrides, HostAddress, Override,
    Redacted,
};
pub use error::{ParseError, ParseResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse a raw connection string in the given dialect
///
/// # Errors
/// - `ParseError::Empty` for empty input
/// - `ParseError::MissingField` when a mandatory NoSQL key is absent
/// - `ParseError::SchemeMismatch` when a URI does not start with the dialect's scheme
/// - `ParseError::EmbeddedWhitespace` for whitespace inside values
pub fn parse(raw: &str, dialect: Dialect) -> ParseResult<ConnectionDescriptor> {
    codec_for(dialect).parse(raw)
}

/// Parse a raw connection string, inferring its dialect
///
/// # Errors
/// `ParseError::UnknownDialect` when no dialect matches, otherwise as [`parse`]
pub fn parse_any(raw: &str) -> ParseResult<ConnectionDescriptor> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }
    let dialect = Dialect::detect(raw).ok_or(ParseError::UnknownDialect)?;
    parse(raw, dialect)
}

/// Build a connection string from a descriptor with field overrides applied
///
/// Never fails: descriptors are structurally valid by construction.
#[must_use]
pub fn build(descriptor: &ConnectionDescriptor, overrides: &FieldOverrides) -> String {
    let descriptor = descriptor.with_overrides(overrides);
    codec_for(descriptor.dialect()).build(&descriptor)
}

/// Validation hint for an input box, `None` when the input parses
#[must_use]
pub fn validate(raw: &str, dialect: Dialect) -> Option<String> {
    parse(raw, dialect).err().map(|e| e.user_message())
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with connection strings
    pub use crate::{
        build, parse, parse_any, ConnectionDescriptor, Dialect, FieldOverrides, ParseError,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_reports_user_message() {
        assert_eq!(validate("postgres://h", Dialect::PostgresUri), None);
        assert_eq!(
            validate("AccountKey=abcdef==", Dialect::NoSqlKeyValue).as_deref(),
            Some("Connection string must contain \"AccountEndpoint\".")
        );
    }

    #[test]
    fn parse_any_detects() {
        let d = parse_any("mongodb://h/db").unwrap();
        assert_eq!(d.dialect(), Dialect::MongoUri);
        assert_eq!(parse_any("   "), Err(ParseError::Empty));
        assert_eq!(parse_any("Server=x"), Err(ParseError::UnknownDialect));
    }

    #[test]
    fn redacted_masks_secret() {
        let d = parse("postgres://u:hunter2@h/db", Dialect::PostgresUri).unwrap();
        let shown = d.redacted().to_string();
        assert_eq!(shown, "postgres://u:redacted@h/db");
        assert!(!shown.contains("hunter2"));

        let summary = d.summary(false);
        assert_eq!(summary.secret.as_deref(), Some("redacted"));
        assert_eq!(d.summary(true).secret.as_deref(), Some("hunter2"));
    }
}
