//! MongoDB URI codec

use super::uri;
use super::{
    DialectCodec, MONGO_PREFIX, MONGO_SCHEME, MONGO_SRV_PREFIX, MONGO_SRV_SCHEME,
};
use crate::descriptor::{ConnectionDescriptor, Dialect};
use crate::error::{ParseError, ParseResult};

/// Codec for `mongodb://` and `mongodb+srv://` URIs
///
/// Host lists and query parameters are preserved verbatim, so credential
/// updates through [`ConnectionDescriptor::with_credentials`] never disturb
/// replica-set or TLS options.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoCodec;

impl DialectCodec for MongoCodec {
    fn dialect(&self) -> Dialect {
        Dialect::MongoUri
    }

    fn parse(&self, raw: &str) -> ParseResult<ConnectionDescriptor> {
        let raw = uri::prepare(raw)?;
        let (scheme, rest) = if let Some(rest) = raw.strip_prefix(MONGO_SRV_PREFIX) {
            (MONGO_SRV_SCHEME, rest)
        } else if let Some(rest) = raw.strip_prefix(MONGO_PREFIX) {
            (MONGO_SCHEME, rest)
        } else {
            return Err(ParseError::SchemeMismatch {
                dialect: Dialect::MongoUri,
                expected: "mongodb:// or mongodb+srv://",
            });
        };

        let parts = uri::split(rest)?;
        if scheme == MONGO_SRV_SCHEME
            && (parts.hosts.len() != 1 || parts.hosts.iter().any(|h| h.port.is_some()))
        {
            return Err(ParseError::InvalidSrvHost(parts.raw_hosts));
        }

        Ok(ConnectionDescriptor {
            dialect: Dialect::MongoUri,
            scheme: scheme.to_string(),
            endpoint: None,
            hosts: parts.hosts,
            principal: parts.principal,
            secret: parts.secret,
            database: parts.database,
            flags: parts.flags,
        })
    }

    fn build(&self, descriptor: &ConnectionDescriptor) -> String {
        let mut out = String::from(if descriptor.is_srv() {
            MONGO_SRV_PREFIX
        } else {
            MONGO_PREFIX
        });
        uri::render_authority_and_tail(&mut out, descriptor, true);
        out
    }
}
