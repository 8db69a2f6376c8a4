//! Bulk listing collaborator

use crate::types::{ListingScope, ResourceDetail};
use async_trait::async_trait;

/// Cloud management client that lists resource detail in bulk
///
/// One call per population cycle; the cache never asks for single resources.
#[async_trait]
pub trait DetailSource: Send + Sync {
    /// List every resource visible in `scope`
    async fn list(&self, scope: &ListingScope) -> anyhow::Result<Vec<ResourceDetail>>;
}

/// Fixed listing, served verbatim for every scope
#[derive(Debug, Clone, Default)]
pub struct StaticDetailSource {
    resources: Vec<ResourceDetail>,
}

impl StaticDetailSource {
    /// Create source serving `resources`
    #[inline]
    #[must_use]
    pub fn new(resources: Vec<ResourceDetail>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl DetailSource for StaticDetailSource {
    async fn list(&self, _scope: &ListingScope) -> anyhow::Result<Vec<ResourceDetail>> {
        Ok(self.resources.clone())
    }
}
