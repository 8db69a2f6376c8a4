//! Core value types shared by the cache and the tree layer

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tokio::time::Instant;

/// Provider-assigned resource id; the only cache and registry key
///
/// Opaque and stable across refresh cycles. Compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentity(Arc<str>);

impl ResourceIdentity {
    /// Create identity
    #[inline]
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Raw id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Identity of a child addressed by `segment` under this one
    #[must_use]
    pub fn child(&self, kind: &str, segment: &str) -> Self {
        Self::new(format!("{}/{kind}/{segment}", self.0))
    }
}

impl Display for ResourceIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceIdentity {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl AsRef<str> for ResourceIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Scope handed to the bulk listing call (a subscription, typically)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingScope(String);

impl ListingScope {
    /// Create scope
    #[inline]
    #[must_use]
    pub fn new(scope: impl Into<String>) -> Self {
        Self(scope.into())
    }

    /// Raw scope id
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ListingScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fields fetched from the management API beyond the base listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDetail {
    /// Resource id
    pub identity: ResourceIdentity,
    /// Display name
    pub name: String,
    /// Resource group
    #[serde(default)]
    pub resource_group: Option<String>,
    /// Region
    #[serde(default)]
    pub location: Option<String>,
    /// SKU or capacity tier (e.g. `M30`, `Standard_D2s_v3`)
    #[serde(default)]
    pub capacity: Option<String>,
    /// Number of nodes or shards
    #[serde(default)]
    pub node_count: Option<u32>,
    /// Provisioned storage
    #[serde(default)]
    pub storage_gb: Option<u32>,
    /// Engine version
    #[serde(default)]
    pub server_version: Option<String>,
    /// Public endpoint
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ResourceDetail {
    /// Create detail with only identity and name
    #[inline]
    #[must_use]
    pub fn new(identity: impl Into<ResourceIdentity>, name: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            name: name.into(),
            resource_group: None,
            location: None,
            capacity: None,
            node_count: None,
            storage_gb: None,
            server_version: None,
            endpoint: None,
        }
    }

    /// With capacity tier
    #[inline]
    #[must_use]
    pub fn with_capacity(mut self, capacity: impl Into<String>) -> Self {
        self.capacity = Some(capacity.into());
        self
    }

    /// With node count
    #[inline]
    #[must_use]
    pub fn with_node_count(mut self, node_count: u32) -> Self {
        self.node_count = Some(node_count);
        self
    }

    /// With server version
    #[inline]
    #[must_use]
    pub fn with_server_version(mut self, version: impl Into<String>) -> Self {
        self.server_version = Some(version.into());
        self
    }
}

/// Detail as served from the cache
#[derive(Debug, Clone)]
pub struct CachedResourceDetail {
    /// Cached payload
    pub detail: Arc<ResourceDetail>,
    /// When the snapshot holding this entry was populated
    pub inserted_at: Instant,
}

impl CachedResourceDetail {
    /// Whether the entry is still servable at `now`
    #[inline]
    #[must_use]
    pub fn is_fresh(&self, now: Instant, ttl: std::time::Duration) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}
