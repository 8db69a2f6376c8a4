//! Base listing data handed over by the tree host

use dbnav_cache::{ListingScope, ResourceIdentity};
use dbnav_connstr::Dialect;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Kind of account or server a base resource describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    /// NoSQL document account
    NoSqlAccount,
    /// MongoDB API account (request-unit based)
    MongoAccount,
    /// MongoDB vCore cluster
    MongoCluster,
    /// PostgreSQL flexible server
    PostgresServer,
}

impl ResourceKind {
    /// All kinds
    pub const ALL: [Self; 4] = [
        Self::NoSqlAccount,
        Self::MongoAccount,
        Self::MongoCluster,
        Self::PostgresServer,
    ];

    /// Connection-string dialect accounts of this kind use
    #[must_use]
    pub const fn dialect(self) -> Dialect {
        match self {
            Self::NoSqlAccount => Dialect::NoSqlKeyValue,
            Self::MongoAccount | Self::MongoCluster => Dialect::MongoUri,
            Self::PostgresServer => Dialect::PostgresUri,
        }
    }

    /// Context value prefix used for menus
    #[must_use]
    pub const fn context_value(self) -> &'static str {
        match self {
            Self::NoSqlAccount => "nosql.account",
            Self::MongoAccount => "mongo.account",
            Self::MongoCluster => "mongo.cluster",
            Self::PostgresServer => "postgres.server",
        }
    }

    /// Icon id
    #[must_use]
    pub const fn icon(self) -> &'static str {
        match self {
            Self::NoSqlAccount => "database-nosql",
            Self::MongoAccount | Self::MongoCluster => "database-mongo",
            Self::PostgresServer => "database-postgres",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoSqlAccount => "NoSQL account",
            Self::MongoAccount => "MongoDB account",
            Self::MongoCluster => "MongoDB cluster",
            Self::PostgresServer => "PostgreSQL server",
        };
        f.write_str(name)
    }
}

/// Resource as listed by the host, before detail is attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResource {
    /// Provider-assigned id
    pub id: ResourceIdentity,
    /// Display name
    pub name: String,
    /// Account or server kind
    pub kind: ResourceKind,
    /// Resource group
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Region
    #[serde(default)]
    pub location: Option<String>,
    /// Scope the bulk detail listing runs against
    pub scope: ListingScope,
}

impl BaseResource {
    /// Create base resource
    #[must_use]
    pub fn new(
        id: impl Into<ResourceIdentity>,
        name: impl Into<String>,
        kind: ResourceKind,
        scope: ListingScope,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            resource_group: None,
            location: None,
            scope,
        }
    }

    /// With resource group
    #[inline]
    #[must_use]
    pub fn with_resource_group(mut self, group: impl Into<String>) -> Self {
        self.resource_group = Some(group.into());
        self
    }

    /// With region
    #[inline]
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}
