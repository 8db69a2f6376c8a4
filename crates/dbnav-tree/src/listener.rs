//! Population announcement listener

use crate::node::TreeHost;
use crate::registry::TreeItemRefreshRegistry;
use dbnav_cache::{PopulationEvent, ResourceDetailCache};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Drains the refresh registry whenever the cache announces a population
///
/// Holds the cache weakly: the listener ends once the cache is dropped.
pub struct RefreshListener {
    events: broadcast::Receiver<PopulationEvent>,
    cache: Weak<ResourceDetailCache>,
    registry: Arc<TreeItemRefreshRegistry>,
    host: Arc<dyn TreeHost>,
}

impl RefreshListener {
    /// Subscribe to `cache` now
    #[must_use]
    pub fn new(
        cache: &Arc<ResourceDetailCache>,
        registry: Arc<TreeItemRefreshRegistry>,
        host: Arc<dyn TreeHost>,
    ) -> Self {
        Self {
            events: cache.subscribe(),
            cache: Arc::downgrade(cache),
            registry,
            host,
        }
    }

    /// Process announcements until the cache goes away
    pub async fn run(mut self) {
        loop {
            match self.events.recv().await {
                Ok(PopulationEvent::Completed { cycle, .. }) => {
                    if !self.drain() {
                        break;
                    }
                    debug!(cycle, "population completed");
                }
                Ok(PopulationEvent::Failed { error, .. }) => {
                    self.host.population_failed(&error);
                }
                Err(RecvError::Lagged(missed)) => {
                    // At least one completion may be among the missed events.
                    warn!(missed, "refresh listener lagged behind population events");
                    if !self.drain() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("refresh listener stopped");
    }

    /// Run on the current tokio runtime
    #[must_use = "dropping the handle detaches the listener; keep it to stop the listener"]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    fn drain(&self) -> bool {
        let Some(cache) = self.cache.upgrade() else {
            return false;
        };
        if let Some(snapshot) = cache.last_populated() {
            self.registry
                .on_population_complete(&snapshot, self.host.as_ref());
        }
        true
    }
}

impl std::fmt::Debug for RefreshListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshListener")
            .field("pending", &self.registry.pending_count())
            .finish_non_exhaustive()
    }
}
