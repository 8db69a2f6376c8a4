//! Dialect codecs
//!
//! One codec per connection-string grammar:
//! - [`NoSqlCodec`]: semicolon-separated `Key=Value` segments
//! - [`MongoCodec`]: `mongodb://` and `mongodb+srv://` URIs
//! - [`PostgresCodec`]: `postgres://` URIs

use crate::descriptor::{ConnectionDescriptor, Dialect};
use crate::error::ParseResult;

mod mongo;
mod nosql;
mod postgres;
mod uri;

pub use mongo::MongoCodec;
pub use nosql::NoSqlCodec;
pub use postgres::PostgresCodec;

pub(crate) const MONGO_SCHEME: &str = "mongodb";
pub(crate) const MONGO_SRV_SCHEME: &str = "mongodb+srv";
pub(crate) const MONGO_PREFIX: &str = "mongodb://";
pub(crate) const MONGO_SRV_PREFIX: &str = "mongodb+srv://";
pub(crate) const POSTGRES_SCHEME: &str = "postgres";
pub(crate) const POSTGRES_PREFIX: &str = "postgres://";

/// Parser/builder pair for one grammar
///
/// Implementations are stateless; `build` must produce a string that
/// `parse` maps back to a descriptor with the same semantic fields.
pub trait DialectCodec: Send + Sync + 'static {
    /// Grammar handled by this codec
    fn dialect(&self) -> Dialect;

    /// Parse a raw connection string
    ///
    /// # Errors
    /// Any [`crate::ParseError`] describing why the input is not valid for
    /// this dialect
    fn parse(&self, raw: &str) -> ParseResult<ConnectionDescriptor>;

    /// Render a descriptor back into this dialect
    fn build(&self, descriptor: &ConnectionDescriptor) -> String;
}

/// Codec for a dialect
#[inline]
#[must_use]
pub fn codec_for(dialect: Dialect) -> &'static dyn DialectCodec {
    match dialect {
        Dialect::NoSqlKeyValue => &NoSqlCodec,
        Dialect::MongoUri => &MongoCodec,
        Dialect::PostgresUri => &PostgresCodec,
    }
}

/// Render a descriptor with the codec of its own dialect
#[inline]
pub(crate) fn render(descriptor: &ConnectionDescriptor) -> String {
    codec_for(descriptor.dialect()).build(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_for_matches_dialect() {
        for dialect in Dialect::ALL {
            assert_eq!(codec_for(dialect).dialect(), dialect);
        }
    }
}
