//! NoSQL key/value codec
//!
//! `AccountEndpoint=<url>;AccountKey=<base64>;[Database=<name>;]`
//!
//! Keys are case-insensitive and may appear in any order. Unknown keys are
//! ignored, the trailing `;` is optional and whitespace around keys and values
//! is trimmed.

use super::uri::reject_whitespace;
use super::DialectCodec;
use crate::descriptor::{ConnectionDescriptor, Dialect, HostAddress};
use crate::error::{ParseError, ParseResult};
use url::Url;

const ENDPOINT_KEY: &str = "AccountEndpoint";
const KEY_KEY: &str = "AccountKey";
const DATABASE_KEY: &str = "Database";

/// Codec for semicolon-separated `Key=Value` account strings
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSqlCodec;

/// A recognized value and its byte offset in the trimmed input
#[derive(Clone, Copy)]
struct Located<'a> {
    value: &'a str,
    offset: usize,
}

impl DialectCodec for NoSqlCodec {
    fn dialect(&self) -> Dialect {
        Dialect::NoSqlKeyValue
    }

    fn parse(&self, raw: &str) -> ParseResult<ConnectionDescriptor> {
        let input = raw.trim();
        if input.is_empty() {
            return Err(ParseError::Empty);
        }

        let mut endpoint: Option<Located<'_>> = None;
        let mut key: Option<Located<'_>> = None;
        let mut database: Option<Located<'_>> = None;

        let mut segment_start = 0;
        for segment in input.split(';') {
            let start = segment_start;
            segment_start += segment.len() + 1;

            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            let leading = value.len() - value.trim_start().len();
            let located = Located {
                value: trimmed,
                offset: start + name.len() + 1 + leading,
            };

            // First non-empty occurrence of each key wins.
            let name = name.trim();
            let slot = if name.eq_ignore_ascii_case(ENDPOINT_KEY) {
                &mut endpoint
            } else if name.eq_ignore_ascii_case(KEY_KEY) {
                &mut key
            } else if name.eq_ignore_ascii_case(DATABASE_KEY) {
                &mut database
            } else {
                continue;
            };
            slot.get_or_insert(located);
        }

        let endpoint = endpoint.ok_or(ParseError::missing(Dialect::NoSqlKeyValue, ENDPOINT_KEY))?;
        let key = key.ok_or(ParseError::missing(Dialect::NoSqlKeyValue, KEY_KEY))?;
        reject_whitespace(endpoint.value, endpoint.offset)?;
        reject_whitespace(key.value, key.offset)?;

        let url = Url::parse(endpoint.value).map_err(|e| ParseError::InvalidEndpoint {
            endpoint: endpoint.value.to_string(),
            message: e.to_string(),
        })?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| ParseError::InvalidEndpoint {
                endpoint: endpoint.value.to_string(),
                message: "endpoint has no host".to_string(),
            })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        let port = url
            .port_or_known_default()
            .or(Dialect::NoSqlKeyValue.default_port());

        Ok(ConnectionDescriptor {
            dialect: Dialect::NoSqlKeyValue,
            scheme: url.scheme().to_string(),
            endpoint: Some(endpoint.value.to_string()),
            hosts: vec![HostAddress::new(host, port)],
            principal: None,
            secret: Some(key.value.to_string()),
            database: database.map(|d| d.value.to_string()),
            flags: Vec::new(),
        })
    }

    fn build(&self, descriptor: &ConnectionDescriptor) -> String {
        let endpoint = descriptor.endpoint().map_or_else(
            || {
                let host = descriptor.hosts().first().map(ToString::to_string).unwrap_or_default();
                format!("{}://{host}/", descriptor.scheme())
            },
            str::to_string,
        );

        let mut out = format!("{ENDPOINT_KEY}={endpoint};");
        if let Some(key) = descriptor.secret() {
            out.push_str(&format!("{KEY_KEY}={key};"));
        }
        if let Some(database) = descriptor.database() {
            out.push_str(&format!("{DATABASE_KEY}={database};"));
        }
        out
    }
}
