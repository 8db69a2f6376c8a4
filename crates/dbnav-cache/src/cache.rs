//! Single-flight resource detail cache
//!
//! Holds one snapshot of resource detail for the whole account list. The
//! snapshot is replaced wholesale by a bulk listing call; at most one listing
//! call is in flight at a time, and callers that arrive during it park on the
//! [`AsyncGate`] and observe the same snapshot or the same error.
//!
//! Staleness is lazy: a snapshot carries its population timestamp and is
//! checked against the TTL on read. No timer runs in the background.

use crate::config::CacheConfig;
use crate::error::{PopulationError, PopulationResult};
use crate::gate::{AsyncGate, GateGuard, GateWaiter};
use crate::source::DetailSource;
use crate::types::{CachedResourceDetail, ListingScope, ResourceDetail, ResourceIdentity};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of entries in the current snapshot
    pub entry_count: u64,
    /// Successful population cycles
    pub populations: u64,
    /// Failed listing calls
    pub failures: u64,
}

/// Announcement published after every population attempt
#[derive(Debug, Clone)]
pub enum PopulationEvent {
    /// A new snapshot was installed
    Completed {
        /// Cycle number of the new snapshot
        cycle: u64,
        /// Identities present in the new snapshot
        identities: Arc<[ResourceIdentity]>,
    },
    /// The listing call failed; the previous snapshot is unchanged
    Failed {
        /// Scope of the failed listing
        scope: ListingScope,
        /// Error handed to every caller of the cycle
        error: PopulationError,
    },
}

#[derive(Debug)]
struct Snapshot {
    entries: HashMap<ResourceIdentity, Arc<ResourceDetail>>,
    populated_at: Instant,
    cycle: u64,
    invalidation_epoch: u64,
}

/// Immutable view of one populated snapshot
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    inner: Arc<Snapshot>,
}

impl CacheSnapshot {
    /// Detail for `identity`, regardless of age
    #[must_use]
    pub fn get(&self, identity: &ResourceIdentity) -> Option<Arc<ResourceDetail>> {
        self.inner.entries.get(identity).cloned()
    }

    /// Cycle that produced this snapshot
    #[inline]
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.inner.cycle
    }

    /// Population timestamp
    #[inline]
    #[must_use]
    pub fn populated_at(&self) -> Instant {
        self.inner.populated_at
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Whether the listing returned nothing
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Identities in this snapshot
    pub fn identities(&self) -> impl Iterator<Item = &ResourceIdentity> {
        self.inner.entries.keys()
    }

    /// Whether two handles refer to the same population
    #[inline]
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    /// Bumped by `invalidate`; a snapshot populated before the bump is stale
    invalidation_epoch: u64,
    cycle: u64,
    stats: CacheStats,
}

impl CacheState {
    fn fresh_snapshot(&self, now: Instant, ttl: Duration) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref().filter(|snapshot| {
            snapshot.invalidation_epoch == self.invalidation_epoch
                && now.saturating_duration_since(snapshot.populated_at) < ttl
        })
    }
}

enum Admission {
    Fresh(CacheSnapshot),
    Populate(GateGuard, u64),
    Wait(GateWaiter),
    Retry,
}

/// TTL-bounded, single-flight cache of resource detail
pub struct ResourceDetailCache {
    source: Arc<dyn DetailSource>,
    config: CacheConfig,
    gate: AsyncGate,
    state: Mutex<CacheState>,
    events: broadcast::Sender<PopulationEvent>,
}

impl ResourceDetailCache {
    /// Create an empty cache over `source`
    #[must_use]
    pub fn new(source: Arc<dyn DetailSource>, config: CacheConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            source,
            config,
            gate: AsyncGate::new(),
            state: Mutex::new(CacheState::default()),
            events,
        }
    }

    /// Cached detail for `identity`
    ///
    /// Pure read: never populates, and returns `None` once the snapshot's
    /// TTL has elapsed or the cache was invalidated.
    #[must_use]
    pub fn get(&self, identity: &ResourceIdentity) -> Option<CachedResourceDetail> {
        let state = self.state.lock();
        let snapshot = state.fresh_snapshot(Instant::now(), self.config.ttl())?;
        snapshot
            .entries
            .get(identity)
            .map(|detail| CachedResourceDetail {
                detail: Arc::clone(detail),
                inserted_at: snapshot.populated_at,
            })
    }

    /// Current snapshot if still fresh
    #[must_use]
    pub fn snapshot(&self) -> Option<CacheSnapshot> {
        let state = self.state.lock();
        state
            .fresh_snapshot(Instant::now(), self.config.ttl())
            .map(|inner| CacheSnapshot {
                inner: Arc::clone(inner),
            })
    }

    /// Whether the next `ensure_fresh` would call the listing source
    #[must_use]
    pub fn needs_population(&self) -> bool {
        let state = self.state.lock();
        state
            .fresh_snapshot(Instant::now(), self.config.ttl())
            .is_none()
    }

    /// Whether a listing call is in flight
    #[inline]
    #[must_use]
    pub fn is_populating(&self) -> bool {
        self.gate.is_closed()
    }

    /// Number of completed population cycles
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.state.lock().cycle
    }

    /// Mark the whole cache stale
    ///
    /// A population already in flight still installs its snapshot, but that
    /// snapshot is stale on arrival.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        state.invalidation_epoch += 1;
        debug!(epoch = state.invalidation_epoch, "resource detail cache invalidated");
    }

    /// Cache statistics
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entry_count: state
                .snapshot
                .as_ref()
                .map_or(0, |s| s.entries.len() as u64),
            ..state.stats
        }
    }

    /// Subscribe to population announcements
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PopulationEvent> {
        self.events.subscribe()
    }

    /// Number of live announcement subscribers
    #[inline]
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Gate guarding population, for observing parked callers
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &AsyncGate {
        &self.gate
    }

    /// Return a fresh snapshot, populating it if needed
    ///
    /// When the cache is fresh this returns immediately. Otherwise exactly one
    /// caller performs the bulk listing while the rest wait for its outcome.
    /// A caller whose populator vanished (cancelled or panicked) takes over
    /// and retries.
    ///
    /// # Errors
    /// `PopulationError::ListingFailed` when the listing call fails; every
    /// caller of the same cycle receives the same error.
    pub async fn ensure_fresh(&self, scope: &ListingScope) -> PopulationResult<CacheSnapshot> {
        loop {
            match self.admit() {
                Admission::Fresh(snapshot) => return Ok(snapshot),
                Admission::Retry => tokio::task::yield_now().await,
                Admission::Populate(guard, epoch) => {
                    return self.populate(scope, guard, epoch).await;
                }
                Admission::Wait(waiter) => match waiter.wait().await {
                    Ok(()) => {
                        if let Some(snapshot) = self.last_populated() {
                            return Ok(snapshot);
                        }
                    }
                    Err(PopulationError::Abandoned) => {
                        debug!(%scope, "population abandoned by its owner, retrying");
                    }
                    Err(error) => return Err(error),
                },
            }
        }
    }

    /// Decide under the state lock whether to serve, populate or wait
    fn admit(&self) -> Admission {
        let state = self.state.lock();
        if let Some(snapshot) = state.fresh_snapshot(Instant::now(), self.config.ttl()) {
            return Admission::Fresh(CacheSnapshot {
                inner: Arc::clone(snapshot),
            });
        }
        if let Some(guard) = self.gate.enable() {
            return Admission::Populate(guard, state.invalidation_epoch);
        }
        // The gate may reopen between the two calls; the caller then retries.
        self.gate.waiter().map_or(Admission::Retry, Admission::Wait)
    }

    /// Most recently installed snapshot, fresh or not
    ///
    /// Drains use this so a cycle's detail still reaches parked items when an
    /// invalidation landed while that cycle was in flight.
    #[must_use]
    pub fn last_populated(&self) -> Option<CacheSnapshot> {
        self.state.lock().snapshot.as_ref().map(|inner| CacheSnapshot {
            inner: Arc::clone(inner),
        })
    }

    async fn populate(
        &self,
        scope: &ListingScope,
        guard: GateGuard,
        epoch: u64,
    ) -> PopulationResult<CacheSnapshot> {
        let started = Instant::now();
        info!(%scope, "populating resource detail cache");

        match self.source.list(scope).await {
            Ok(details) => {
                let entries: HashMap<_, _> = details
                    .into_iter()
                    .map(|detail| (detail.identity.clone(), Arc::new(detail)))
                    .collect();
                let identities: Arc<[ResourceIdentity]> = entries.keys().cloned().collect();

                let snapshot = {
                    let mut state = self.state.lock();
                    state.cycle += 1;
                    state.stats.populations += 1;
                    let snapshot = Arc::new(Snapshot {
                        entries,
                        populated_at: Instant::now(),
                        cycle: state.cycle,
                        invalidation_epoch: epoch,
                    });
                    state.snapshot = Some(Arc::clone(&snapshot));
                    snapshot
                };
                guard.disable(Ok(()));

                info!(
                    %scope,
                    cycle = snapshot.cycle,
                    entries = snapshot.entries.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "resource detail cache populated"
                );
                // No subscribers is not an error.
                let _ = self.events.send(PopulationEvent::Completed {
                    cycle: snapshot.cycle,
                    identities,
                });
                Ok(CacheSnapshot { inner: snapshot })
            }
            Err(source) => {
                let error = PopulationError::listing_failed(scope, &source);
                self.state.lock().stats.failures += 1;
                guard.disable(Err(error.clone()));

                warn!(%scope, error = %error, "resource detail population failed");
                let _ = self.events.send(PopulationEvent::Failed {
                    scope: scope.clone(),
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }
}

impl std::fmt::Debug for ResourceDetailCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceDetailCache")
            .field("config", &self.config)
            .field("gate", &self.gate)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::StaticDetailSource;

    fn cache(ttl_secs: u64) -> ResourceDetailCache {
        let source = StaticDetailSource::new(vec![
            ResourceDetail::new("acct-1", "one").with_capacity("M30"),
            ResourceDetail::new("acct-2", "two"),
        ]);
        ResourceDetailCache::new(
            Arc::new(source),
            CacheConfig::new().with_ttl_secs(ttl_secs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn get_never_populates() {
        let cache = cache(60);
        assert!(cache.needs_population());
        assert!(cache.get(&"acct-1".into()).is_none());
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_fresh_installs_snapshot_once() {
        let cache = cache(60);
        let scope = ListingScope::new("sub");

        let first = cache.ensure_fresh(&scope).await.unwrap();
        assert_eq!(first.cycle(), 1);
        assert_eq!(first.len(), 2);
        let second = cache.ensure_fresh(&scope).await.unwrap();
        assert!(first.same_as(&second));

        let hit = cache.get(&"acct-1".into()).unwrap();
        assert_eq!(hit.detail.capacity.as_deref(), Some("M30"));
        assert_eq!(hit.inserted_at, first.populated_at());
        assert_eq!(
            cache.stats(),
            CacheStats {
                entry_count: 2,
                populations: 1,
                failures: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalidate_marks_whole_cache_stale() {
        let cache = cache(60);
        let scope = ListingScope::new("sub");
        cache.ensure_fresh(&scope).await.unwrap();

        cache.invalidate();
        assert!(cache.needs_population());
        assert!(cache.get(&"acct-2".into()).is_none());

        let refreshed = cache.ensure_fresh(&scope).await.unwrap();
        assert_eq!(refreshed.cycle(), 2);
        assert!(cache.get(&"acct-2".into()).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn last_populated_ignores_freshness() {
        let cache = cache(60);
        assert!(cache.last_populated().is_none());
        let populated = cache.ensure_fresh(&ListingScope::new("sub")).await.unwrap();

        cache.invalidate();
        assert!(cache.snapshot().is_none());
        let last = cache.last_populated().unwrap();
        assert!(last.same_as(&populated));
        assert!(last.get(&"acct-1".into()).is_some());
    }

    #[test]
    fn subscriber_count_tracks_receivers() {
        let cache = cache(60);
        assert_eq!(cache.subscriber_count(), 0);
        let events = cache.subscribe();
        assert_eq!(cache.subscriber_count(), 1);
        drop(events);
        assert_eq!(cache.subscriber_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_is_broadcast() {
        let cache = cache(60);
        let mut events = cache.subscribe();
        cache.ensure_fresh(&ListingScope::new("sub")).await.unwrap();

        match events.recv().await.unwrap() {
            PopulationEvent::Completed { cycle, identities } => {
                assert_eq!(cycle, 1);
                let mut ids: Vec<_> = identities.iter().map(ResourceIdentity::as_str).collect();
                ids.sort_unstable();
                assert_eq!(ids, ["acct-1", "acct-2"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
