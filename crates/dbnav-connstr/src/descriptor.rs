//! Canonical connection descriptor
//!
//! [`ConnectionDescriptor`] is the dialect-independent view of a parsed
//! connection string. It is an immutable value: every mutation is a functional
//! update returning a new descriptor.

use crate::codecs;
use crate::error::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Connection-string grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// `AccountEndpoint=...;AccountKey=...;[Database=...;]`
    NoSqlKeyValue,
    /// `mongodb://` or `mongodb+srv://`
    MongoUri,
    /// `postgres://`
    PostgresUri,
}

impl Dialect {
    /// All dialects, in detection order
    pub const ALL: [Dialect; 3] = [Self::NoSqlKeyValue, Self::MongoUri, Self::PostgresUri];

    /// Human-readable dialect name
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::NoSqlKeyValue => "NoSQL",
            Self::MongoUri => "MongoDB",
            Self::PostgresUri => "PostgreSQL",
        }
    }

    /// Port assumed when a URI host omits one
    #[inline]
    #[must_use]
    pub fn default_port(self) -> Option<u16> {
        match self {
            Self::NoSqlKeyValue => Some(443),
            Self::MongoUri => Some(27017),
            Self::PostgresUri => Some(5432),
        }
    }

    /// Whether the grammar carries a user name
    #[inline]
    #[must_use]
    pub fn has_principal(self) -> bool {
        !matches!(self, Self::NoSqlKeyValue)
    }

    /// Infer the dialect from a raw string
    ///
    /// URI dialects are recognized by their scheme; the key/value dialect by
    /// the presence of an `AccountEndpoint` key (case-insensitive).
    #[must_use]
    pub fn detect(raw: &str) -> Option<Self> {
        let raw = raw.trim_start();
        if raw.starts_with(codecs::MONGO_PREFIX) || raw.starts_with(codecs::MONGO_SRV_PREFIX) {
            return Some(Self::MongoUri);
        }
        if raw.starts_with(codecs::POSTGRES_PREFIX) {
            return Some(Self::PostgresUri);
        }
        let has_endpoint = raw.split(';').any(|segment| {
            segment
                .split_once('=')
                .is_some_and(|(key, _)| key.trim().eq_ignore_ascii_case("AccountEndpoint"))
        });
        has_endpoint.then_some(Self::NoSqlKeyValue)
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nosql" | "cosmos" | "no-sql-key-value" => Ok(Self::NoSqlKeyValue),
            "mongo" | "mongodb" | "mongo-uri" => Ok(Self::MongoUri),
            "postgres" | "postgresql" | "postgres-uri" => Ok(Self::PostgresUri),
            _ => Err(ParseError::UnknownDialect),
        }
    }
}

/// One `host[:port]` entry of a URI authority
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HostAddress {
    /// Host name or IP literal (IPv6 without brackets)
    pub host: String,
    /// Explicit port, if present
    pub port: Option<u16>,
}

impl HostAddress {
    /// Create host address
    #[inline]
    #[must_use]
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `[v6]` or `[v6]:port`
    ///
    /// # Errors
    /// - `ParseError::MissingHost` if the host part is empty
    /// - `ParseError::InvalidPort` if the port is not a `u16`
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        let (host, port) = if let Some(bracketed) = s.strip_prefix('[') {
            let (host, after) = bracketed.split_once(']').ok_or(ParseError::MissingHost)?;
            match after.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None if after.is_empty() => (host, None),
                None => return Err(ParseError::InvalidPort(after.to_string())),
            }
        } else {
            match s.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (s, None),
            }
        };

        if host.is_empty() {
            return Err(ParseError::MissingHost);
        }
        let port = port
            .map(|p| p.parse::<u16>().map_err(|_| ParseError::InvalidPort(p.to_string())))
            .transpose()?;

        Ok(Self::new(host, port))
    }

    /// Whether the host names the local machine
    #[inline]
    #[must_use]
    pub fn is_loopback(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1" | "::1")
    }
}

impl Display for HostAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]", self.host)?;
        } else {
            f.write_str(&self.host)?;
        }
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}

/// Tri-state field update used by [`FieldOverrides`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Override<T> {
    /// Leave the current value untouched
    #[default]
    Keep,
    /// Remove the value (segment is omitted when built)
    Clear,
    /// Replace the value
    Set(T),
}

impl<T: Clone> Override<T> {
    fn apply(&self, current: Option<&T>) -> Option<T> {
        match self {
            Self::Keep => current.cloned(),
            Self::Clear => None,
            Self::Set(value) => Some(value.clone()),
        }
    }
}

/// Field replacements applied before building a connection string
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOverrides {
    /// User name
    pub principal: Override<String>,
    /// Password or account key
    pub secret: Override<String>,
    /// Database name
    pub database: Override<String>,
}

impl FieldOverrides {
    /// No overrides
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With user name
    #[inline]
    #[must_use]
    pub fn principal(mut self, principal: impl Into<String>) -> Self {
        self.principal = Override::Set(principal.into());
        self
    }

    /// Without user name
    #[inline]
    #[must_use]
    pub fn clear_principal(mut self) -> Self {
        self.principal = Override::Clear;
        self
    }

    /// With password or key
    #[inline]
    #[must_use]
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Override::Set(secret.into());
        self
    }

    /// Without password or key
    #[inline]
    #[must_use]
    pub fn clear_secret(mut self) -> Self {
        self.secret = Override::Clear;
        self
    }

    /// With database
    #[inline]
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Override::Set(database.into());
        self
    }

    /// Without database
    #[inline]
    #[must_use]
    pub fn clear_database(mut self) -> Self {
        self.database = Override::Clear;
        self
    }

    /// Whether every field is `Keep`
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Canonical form of a parsed connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    pub(crate) dialect: Dialect,
    pub(crate) scheme: String,
    pub(crate) endpoint: Option<String>,
    pub(crate) hosts: Vec<HostAddress>,
    pub(crate) principal: Option<String>,
    pub(crate) secret: Option<String>,
    pub(crate) database: Option<String>,
    pub(crate) flags: Vec<(String, String)>,
}

impl ConnectionDescriptor {
    /// Grammar this descriptor was parsed from
    #[inline]
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// URI scheme (`postgres`, `mongodb`, `mongodb+srv`) or endpoint scheme
    #[inline]
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// `AccountEndpoint` value as written (NoSQL only)
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// All hosts, in order
    #[inline]
    #[must_use]
    pub fn hosts(&self) -> &[HostAddress] {
        &self.hosts
    }

    /// First host name
    #[inline]
    #[must_use]
    pub fn host(&self) -> &str {
        self.hosts.first().map_or("", |h| h.host.as_str())
    }

    /// Port of the first host, if written or derived from the endpoint
    #[inline]
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.hosts.first().and_then(|h| h.port)
    }

    /// User name
    #[inline]
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    /// Password or account key
    #[inline]
    #[must_use]
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    /// Database name
    #[inline]
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Raw query parameters, in order
    #[inline]
    #[must_use]
    pub fn flags(&self) -> &[(String, String)] {
        &self.flags
    }

    /// First value of a query parameter (case-insensitive key)
    #[must_use]
    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Whether this is a `mongodb+srv` seed-list URI
    #[inline]
    #[must_use]
    pub fn is_srv(&self) -> bool {
        self.scheme == codecs::MONGO_SRV_SCHEME
    }

    /// `<host>:<port>` of the first host
    ///
    /// The dialect's default port is used when none is written; SRV URIs have
    /// no port and yield the bare host.
    #[must_use]
    pub fn account_id(&self) -> String {
        let port = if self.is_srv() {
            None
        } else {
            self.port().or(self.dialect.default_port())
        };
        match port {
            Some(port) => format!("{}:{port}", self.host()),
            None => self.host().to_string(),
        }
    }

    /// [`account_id`](Self::account_id) plus `/<database>` when a database is set
    #[must_use]
    pub fn full_id(&self) -> String {
        match &self.database {
            Some(database) => format!("{}/{database}", self.account_id()),
            None => self.account_id(),
        }
    }

    /// Whether every host is a loopback address (local emulators)
    #[must_use]
    pub fn is_local_emulator(&self) -> bool {
        !self.hosts.is_empty() && self.hosts.iter().all(HostAddress::is_loopback)
    }

    /// Apply overrides, returning a new descriptor
    ///
    /// Principal overrides are ignored for dialects without a user name.
    #[must_use]
    pub fn with_overrides(&self, overrides: &FieldOverrides) -> Self {
        let principal = if self.dialect.has_principal() {
            overrides.principal.apply(self.principal.as_ref())
        } else {
            self.principal.clone()
        };
        Self {
            principal,
            secret: overrides.secret.apply(self.secret.as_ref()),
            database: overrides.database.apply(self.database.as_ref()),
            ..self.clone()
        }
    }

    /// Replace both credentials; hosts and flags are preserved
    #[must_use]
    pub fn with_credentials(&self, principal: Option<&str>, secret: Option<&str>) -> Self {
        let overrides = FieldOverrides {
            principal: principal.map_or(Override::Clear, |p| Override::Set(p.to_string())),
            secret: secret.map_or(Override::Clear, |s| Override::Set(s.to_string())),
            database: Override::Keep,
        };
        self.with_overrides(&overrides)
    }

    /// Replace the database name
    #[must_use]
    pub fn with_database(&self, database: Option<&str>) -> Self {
        let overrides = FieldOverrides {
            database: database.map_or(Override::Clear, |d| Override::Set(d.to_string())),
            ..FieldOverrides::default()
        };
        self.with_overrides(&overrides)
    }

    /// Strip user name and secret
    #[inline]
    #[must_use]
    pub fn without_credentials(&self) -> Self {
        self.with_credentials(None, None)
    }

    /// Display form with the secret masked, for logs
    #[inline]
    #[must_use]
    pub fn redacted(&self) -> Redacted<'_> {
        Redacted(self)
    }

    /// Serializable summary; the secret is masked unless `reveal_secret`
    #[must_use]
    pub fn summary(&self, reveal_secret: bool) -> DescriptorSummary {
        DescriptorSummary {
            dialect: self.dialect,
            host: self.host().to_string(),
            port: self.port(),
            account_id: self.account_id(),
            full_id: self.full_id(),
            hosts: self.hosts.iter().map(ToString::to_string).collect(),
            principal: self.principal.clone(),
            secret: self.secret.as_ref().map(|s| {
                if reveal_secret {
                    s.clone()
                } else {
                    REDACTED.to_string()
                }
            }),
            database: self.database.clone(),
            flags: self.flags.clone(),
            local_emulator: self.is_local_emulator(),
        }
    }
}

const REDACTED: &str = "redacted";

/// Connection string with its secret masked
#[derive(Debug, Clone, Copy)]
pub struct Redacted<'a>(&'a ConnectionDescriptor);

impl Display for Redacted<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let masked = match self.0.secret {
            Some(_) => self.0.with_overrides(&FieldOverrides::new().secret(REDACTED)),
            None => self.0.clone(),
        };
        f.write_str(&codecs::render(&masked))
    }
}

/// JSON-friendly view of a descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorSummary {
    /// Grammar
    pub dialect: Dialect,
    /// First host
    pub host: String,
    /// First port
    pub port: Option<u16>,
    /// `<host>:<port>`
    pub account_id: String,
    /// Account id with database suffix
    pub full_id: String,
    /// Every host as written
    pub hosts: Vec<String>,
    /// User name
    pub principal: Option<String>,
    /// Secret (masked by default)
    pub secret: Option<String>,
    /// Database name
    pub database: Option<String>,
    /// Query parameters
    pub flags: Vec<(String, String)>,
    /// All hosts are loopback
    pub local_emulator: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_dialects() {
        assert_eq!(Dialect::detect("mongodb://h"), Some(Dialect::MongoUri));
        assert_eq!(Dialect::detect("mongodb+srv://h"), Some(Dialect::MongoUri));
        assert_eq!(Dialect::detect("postgres://h"), Some(Dialect::PostgresUri));
        assert_eq!(
            Dialect::detect("accountkey=a;  accountendpoint=https://x/"),
            Some(Dialect::NoSqlKeyValue)
        );
        assert_eq!(Dialect::detect("Server=tcp:x;"), None);
    }

    #[test]
    fn dialect_from_str() {
        assert_eq!("Cosmos".parse::<Dialect>(), Ok(Dialect::NoSqlKeyValue));
        assert_eq!("mongodb".parse::<Dialect>(), Ok(Dialect::MongoUri));
        assert_eq!("postgresql".parse::<Dialect>(), Ok(Dialect::PostgresUri));
        assert!("sqlite".parse::<Dialect>().is_err());
    }

    #[test]
    fn host_address_parsing() {
        assert_eq!(HostAddress::parse("h:27018"), Ok(HostAddress::new("h", Some(27018))));
        assert_eq!(HostAddress::parse("h"), Ok(HostAddress::new("h", None)));
        assert_eq!(HostAddress::parse("[::1]:5432"), Ok(HostAddress::new("::1", Some(5432))));
        assert_eq!(HostAddress::parse(":5432"), Err(ParseError::MissingHost));
        assert_eq!(
            HostAddress::parse("h:99999"),
            Err(ParseError::InvalidPort("99999".into()))
        );
    }

    #[test]
    fn host_address_display_brackets_ipv6() {
        assert_eq!(HostAddress::new("::1", Some(10255)).to_string(), "[::1]:10255");
        assert_eq!(HostAddress::new("db.local", None).to_string(), "db.local");
    }

    #[test]
    fn overrides_builder() {
        let overrides = FieldOverrides::new().principal("u").clear_secret();
        assert_eq!(overrides.principal, Override::Set("u".to_string()));
        assert_eq!(overrides.secret, Override::Clear);
        assert_eq!(overrides.database, Override::Keep);
        assert!(!overrides.is_empty());
        assert!(FieldOverrides::new().is_empty());
    }
}
