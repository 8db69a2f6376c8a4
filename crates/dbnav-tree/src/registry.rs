//! Deferred refresh registry
//!
//! Items surfaced before the detail cache was populated are parked here. When
//! a population cycle completes, every parked item is drained exactly once:
//! its detail slot is filled from that cycle's snapshot and the host is told
//! to re-render it.

use crate::item::ResourceItem;
use crate::node::{TreeHost, TreeNode};
use dbnav_cache::{CacheSnapshot, ResourceIdentity};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Items waiting for their detail, keyed by identity
#[derive(Debug, Default)]
pub struct TreeItemRefreshRegistry {
    pending: Mutex<HashMap<ResourceIdentity, Arc<ResourceItem>>>,
}

impl TreeItemRefreshRegistry {
    /// Create empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `item` until the next completed population
    ///
    /// Registering an identity again replaces the older item.
    pub fn register(&self, identity: ResourceIdentity, item: Arc<ResourceItem>) {
        self.pending.lock().insert(identity, item);
    }

    /// Number of parked items
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Whether `identity` is parked
    #[must_use]
    pub fn is_pending(&self, identity: &ResourceIdentity) -> bool {
        self.pending.lock().contains_key(identity)
    }

    /// Drain every parked item, merge cached detail and notify the host
    ///
    /// Detail comes from `snapshot` whatever its age. Returns the number of
    /// items refreshed. Items missing from the snapshot are still re-rendered
    /// so the host stops showing them as loading.
    pub fn on_population_complete(&self, snapshot: &CacheSnapshot, host: &dyn TreeHost) -> usize {
        let drained = std::mem::take(&mut *self.pending.lock());
        let count = drained.len();
        if count == 0 {
            return 0;
        }

        let mut merged = 0usize;
        for (identity, item) in drained {
            if let Some(detail) = snapshot.get(&identity) {
                item.merge_detail(detail);
                merged += 1;
            }
            host.item_changed(&identity, item.tree_item());
        }

        debug!(
            cycle = snapshot.cycle(),
            refreshed = count,
            merged,
            "drained deferred tree item refreshes"
        );
        count
    }
}
