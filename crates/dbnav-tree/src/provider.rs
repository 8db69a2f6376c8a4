//! Branch data provider facade
//!
//! Entry point the tree view calls into. Builds account items from base
//! listings, decorates them from the detail cache and routes refreshes.

use crate::error::TreeResult;
use crate::item::{
    AttachedAccountItem, MongoAccountItem, MongoClusterItem, NoSqlAccountItem, PostgresServerItem,
    ResourceItem,
};
use crate::listener::RefreshListener;
use crate::node::{AccountExplorer, TreeHost, TreeNode};
use crate::registry::TreeItemRefreshRegistry;
use crate::resource::{BaseResource, ResourceKind};
use dashmap::DashMap;
use dbnav_cache::{CacheSnapshot, ListingScope, ResourceDetailCache, ResourceIdentity};
use dbnav_connstr::Dialect;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

/// Facade between the tree view and the cache/registry pair
pub struct BranchDataProvider {
    cache: Arc<ResourceDetailCache>,
    registry: Arc<TreeItemRefreshRegistry>,
    host: Arc<dyn TreeHost>,
    explorer: Arc<dyn AccountExplorer>,
    surfaced: DashMap<ResourceIdentity, Weak<dyn TreeNode>>,
}

impl BranchDataProvider {
    /// Create provider
    #[must_use]
    pub fn new(
        cache: Arc<ResourceDetailCache>,
        registry: Arc<TreeItemRefreshRegistry>,
        host: Arc<dyn TreeHost>,
        explorer: Arc<dyn AccountExplorer>,
    ) -> Self {
        Self {
            cache,
            registry,
            host,
            explorer,
            surfaced: DashMap::new(),
        }
    }

    /// Detail cache
    #[inline]
    #[must_use]
    pub fn cache(&self) -> &Arc<ResourceDetailCache> {
        &self.cache
    }

    /// Refresh registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<TreeItemRefreshRegistry> {
        &self.registry
    }

    /// Build the item for a listed resource
    ///
    /// Never waits for the remote listing. When the cache is stale a
    /// population is started in the background; the item is then returned
    /// without detail and refreshed once the population completes. Items
    /// resolved against a fresh cache are never parked, even when the
    /// listing has no detail for them.
    pub fn get_resource_item(&self, base: BaseResource) -> Arc<ResourceItem> {
        let cycle = self.cache.cycle();
        let cold = self.cache.needs_population();
        if cold && !self.cache.is_populating() {
            self.populate_in_background(base.scope.clone());
        }

        let detail = self.cache.get(&base.id).map(|cached| cached.detail);
        let identity = base.id.clone();

        let item = Arc::new(match base.kind {
            ResourceKind::NoSqlAccount => ResourceItem::NoSqlAccount(NoSqlAccountItem::new(base, detail)),
            ResourceKind::MongoAccount => ResourceItem::MongoAccount(MongoAccountItem::new(base, detail)),
            ResourceKind::MongoCluster => ResourceItem::MongoCluster(MongoClusterItem::new(base, detail)),
            ResourceKind::PostgresServer => {
                ResourceItem::PostgresServer(PostgresServerItem::new(base, detail))
            }
        });

        if cold && item.awaits_detail() {
            self.registry.register(identity.clone(), Arc::clone(&item));
            // A cycle that completed between the read and the registration
            // already drained; drain again so this item is not stranded.
            if self.cache.cycle() != cycle {
                if let Some(snapshot) = self.cache.last_populated() {
                    self.registry.on_population_complete(&snapshot, self.host.as_ref());
                }
            }
        }

        self.track(identity, &item);
        item
    }

    /// Build an item from a raw connection string
    ///
    /// Infers the dialect when none is given. Parse failures stay local and
    /// never touch the cache.
    ///
    /// # Errors
    /// `TreeError::Parse` when the string does not parse
    pub fn attach(&self, raw: &str, dialect: Option<Dialect>) -> TreeResult<Arc<ResourceItem>> {
        let parsed = match dialect {
            Some(dialect) => dbnav_connstr::parse(raw, dialect),
            None => dbnav_connstr::parse_any(raw),
        };
        let descriptor = parsed.map_err(|error| {
            warn!(?dialect, error = %error, "rejected connection string");
            error
        })?;

        info!(connection = %descriptor.redacted(), "attached account");
        let item = Arc::new(ResourceItem::Attached(AttachedAccountItem::new(descriptor)));
        self.track(item.identity(), &item);
        Ok(item)
    }

    /// Children of `node`, tracked for later `refresh_item` calls
    ///
    /// # Errors
    /// Explorer and connection-string failures of the node
    pub async fn get_children(&self, node: &dyn TreeNode) -> TreeResult<Vec<Arc<dyn TreeNode>>> {
        let children = node.children(self.explorer.as_ref()).await?;
        self.prune_surfaced();
        for child in &children {
            self.surfaced.insert(child.identity(), Arc::downgrade(child));
        }
        debug!(parent = %node.identity(), children = children.len(), "expanded tree node");
        Ok(children)
    }

    /// Bring the detail cache up to date, waiting for the outcome
    ///
    /// Populates only when the cache is stale; call
    /// [`ResourceDetailCache::invalidate`] first to force a new listing.
    ///
    /// # Errors
    /// `TreeError::Population` when the listing fails
    pub async fn refresh(&self, scope: &ListingScope) -> TreeResult<CacheSnapshot> {
        let snapshot = self.cache.ensure_fresh(scope).await?;
        self.registry.on_population_complete(&snapshot, self.host.as_ref());
        self.prune_surfaced();
        Ok(snapshot)
    }

    /// Re-render a previously surfaced item
    ///
    /// Returns `false` when no live item with that identity was surfaced.
    pub fn refresh_item(&self, identity: &ResourceIdentity) -> bool {
        let Some(node) = self.surfaced.get(identity).and_then(|weak| weak.upgrade()) else {
            self.surfaced.remove(identity);
            return false;
        };
        self.host.item_changed(identity, node.tree_item());
        true
    }

    /// Number of surfaced items still tracked for `refresh_item`
    #[must_use]
    pub fn surfaced_count(&self) -> usize {
        self.surfaced.len()
    }

    /// Listener that drains the registry on every population announcement
    ///
    /// Subscribes immediately, so no announcement after this call is missed.
    #[must_use]
    pub fn refresh_listener(&self) -> RefreshListener {
        RefreshListener::new(
            &self.cache,
            Arc::clone(&self.registry),
            Arc::clone(&self.host),
        )
    }

    fn track(&self, identity: ResourceIdentity, item: &Arc<ResourceItem>) {
        let node: Arc<dyn TreeNode> = Arc::<ResourceItem>::clone(item);
        self.surfaced.insert(identity, Arc::downgrade(&node));
    }

    /// Forget surfaced items the host no longer holds
    fn prune_surfaced(&self) {
        self.surfaced.retain(|_, weak| weak.strong_count() > 0);
    }

    /// Populate without blocking the caller
    ///
    /// Failures go to `TreeHost::population_failed` from here only when no
    /// [`RefreshListener`] is subscribed; otherwise the listener reports them.
    fn populate_in_background(&self, scope: ListingScope) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(%scope, "no async runtime, skipping background population");
            return;
        };
        let cache = Arc::clone(&self.cache);
        let registry = Arc::clone(&self.registry);
        let host = Arc::clone(&self.host);
        runtime.spawn(async move {
            match cache.ensure_fresh(&scope).await {
                Ok(snapshot) => {
                    registry.on_population_complete(&snapshot, host.as_ref());
                }
                Err(error) if cache.subscriber_count() == 0 => {
                    warn!(%scope, error = %error, "background population failed");
                    host.population_failed(&error);
                }
                Err(error) => debug!(%scope, error = %error, "background population failed"),
            }
        });
    }
}

impl std::fmt::Debug for BranchDataProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BranchDataProvider")
            .field("cache", &self.cache)
            .field("pending", &self.registry.pending_count())
            .field("surfaced", &self.surfaced.len())
            .finish_non_exhaustive()
    }
}
