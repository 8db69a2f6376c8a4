//! Shared pieces of the URI dialects: userinfo, host lists, path and query

use crate::descriptor::{ConnectionDescriptor, HostAddress};
use crate::error::{ParseError, ParseResult};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Everything outside RFC 3986 unreserved characters is escaped
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Components of `[userinfo@]hosts[/path][?query]`
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct UriParts {
    pub(super) principal: Option<String>,
    pub(super) secret: Option<String>,
    pub(super) hosts: Vec<HostAddress>,
    pub(super) database: Option<String>,
    pub(super) flags: Vec<(String, String)>,
    pub(super) raw_hosts: String,
}

/// Trim and reject empty input or interior whitespace
pub(super) fn prepare(raw: &str) -> ParseResult<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    reject_whitespace(trimmed, 0)?;
    Ok(trimmed)
}

/// Fail on the first whitespace character; `base` offsets the reported position
pub(crate) fn reject_whitespace(value: &str, base: usize) -> ParseResult<()> {
    match value.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((offset, _)) => Err(ParseError::EmbeddedWhitespace {
            offset: base + offset,
        }),
        None => Ok(()),
    }
}

/// Split everything after `scheme://`
pub(super) fn split(rest: &str) -> ParseResult<UriParts> {
    let authority_end = rest.find(|c: char| c == '/' || c == '?').unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    let (userinfo, raw_hosts) = match authority.rfind('@') {
        Some(at) => (Some(&authority[..at]), &authority[at + 1..]),
        None => (None, authority),
    };

    let (principal, secret) = match userinfo {
        Some(info) => match info.split_once(':') {
            Some((user, password)) => (
                Some(decode(user, "user name")?),
                Some(decode(password, "password")?),
            ),
            None => (Some(decode(info, "user name")?), None),
        },
        None => (None, None),
    };

    if raw_hosts.is_empty() {
        return Err(ParseError::MissingHost);
    }
    let hosts = raw_hosts
        .split(',')
        .map(HostAddress::parse)
        .collect::<ParseResult<Vec<_>>>()?;

    let (path, query) = match tail.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (tail, None),
    };
    let database = match path.strip_prefix('/') {
        Some(name) if !name.is_empty() => Some(decode(name, "database")?),
        _ => None,
    };

    Ok(UriParts {
        principal,
        secret,
        hosts,
        database,
        flags: query.map(parse_query).unwrap_or_default(),
        raw_hosts: raw_hosts.to_string(),
    })
}

/// `key=value` pairs separated by `&`, kept verbatim
fn parse_query(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

fn decode(component: &str, field: &'static str) -> ParseResult<String> {
    percent_decode_str(component)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|_| ParseError::InvalidEncoding { field })
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// Render `[userinfo@]hosts[/database][?query]`
///
/// An absent credential omits its segment; an empty one is written as an
/// empty segment, so `user:@host` survives a round trip.
pub(super) fn render_authority_and_tail(
    out: &mut String,
    descriptor: &ConnectionDescriptor,
    slash_before_query: bool,
) {
    match (descriptor.principal(), descriptor.secret()) {
        (None, None) => {}
        (principal, secret) => {
            out.push_str(&encode(principal.unwrap_or_default()));
            if let Some(secret) = secret {
                out.push(':');
                out.push_str(&encode(secret));
            }
            out.push('@');
        }
    }

    let hosts: Vec<String> = descriptor.hosts().iter().map(ToString::to_string).collect();
    out.push_str(&hosts.join(","));

    match descriptor.database() {
        Some(database) => {
            out.push('/');
            out.push_str(&encode(database));
        }
        None if slash_before_query && !descriptor.flags().is_empty() => out.push('/'),
        None => {}
    }

    if !descriptor.flags().is_empty() {
        let query: Vec<String> = descriptor
            .flags()
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        out.push('?');
        out.push_str(&query.join("&"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_full_uri() {
        let parts = split("u%40x:p%3Aw@h1:1,h2/db%20one?a=1&b").unwrap();
        assert_eq!(parts.principal.as_deref(), Some("u@x"));
        assert_eq!(parts.secret.as_deref(), Some("p:w"));
        assert_eq!(
            parts.hosts,
            vec![HostAddress::new("h1", Some(1)), HostAddress::new("h2", None)]
        );
        assert_eq!(parts.database.as_deref(), Some("db one"));
        assert_eq!(
            parts.flags,
            vec![("a".into(), "1".into()), ("b".into(), String::new())]
        );
    }

    #[test]
    fn split_distinguishes_absent_and_empty_password() {
        assert_eq!(split("u@h").unwrap().secret, None);
        assert_eq!(split("u:@h").unwrap().secret.as_deref(), Some(""));
    }

    #[test]
    fn split_requires_host() {
        assert_eq!(split("u:p@/db"), Err(ParseError::MissingHost));
        assert_eq!(split(""), Err(ParseError::MissingHost));
    }

    #[test]
    fn split_rejects_bad_encoding() {
        assert_eq!(
            split("%FF@h"),
            Err(ParseError::InvalidEncoding { field: "user name" })
        );
    }

    #[test]
    fn prepare_rejects_interior_whitespace() {
        assert_eq!(prepare("  "), Err(ParseError::Empty));
        assert_eq!(
            prepare(" postgres://a b "),
            Err(ParseError::EmbeddedWhitespace { offset: 12 })
        );
        assert_eq!(prepare(" postgres://h "), Ok("postgres://h"));
    }

    #[test]
    fn encode_keeps_unreserved() {
        assert_eq!(encode("a-b_c.d~e"), "a-b_c.d~e");
        assert_eq!(encode("p@ss:w/rd"), "p%40ss%3Aw%2Frd");
    }
}
