//! Testing utilities for dbnav workspace
//!
//! Controllable fakes for the collaborators of the cache and tree crates.

#![allow(missing_docs)]

use async_trait::async_trait;
use dbnav_cache::{
    CacheConfig, DetailSource, ListingScope, PopulationError, ResourceDetail, ResourceDetailCache,
    ResourceIdentity,
};
use dbnav_connstr::ConnectionDescriptor;
use dbnav_tree::{AccountExplorer, BaseResource, ResourceKind, TreeHost, TreeItemView};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Notify};

pub const SCOPE: &str = "sub-test";

/// Listing source with call counting, holding and scripted failures
pub struct FakeDetailSource {
    resources: Mutex<Vec<ResourceDetail>>,
    calls: AtomicUsize,
    held: watch::Sender<bool>,
    fail_next: Mutex<Option<String>>,
    panic_next: AtomicBool,
}

impl FakeDetailSource {
    pub fn new(resources: Vec<ResourceDetail>) -> Arc<Self> {
        let (held, _) = watch::channel(false);
        Arc::new(Self {
            resources: Mutex::new(resources),
            calls: AtomicUsize::new(0),
            held,
            fail_next: Mutex::new(None),
            panic_next: AtomicBool::new(false),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Park every listing call after it is counted until `release`
    pub fn hold(&self) {
        self.held.send_replace(true);
    }

    pub fn release(&self) {
        self.held.send_replace(false);
    }

    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }

    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn set_resources(&self, resources: Vec<ResourceDetail>) {
        *self.resources.lock() = resources;
    }

    /// Yield until at least `n` listing calls have started
    pub async fn wait_for_calls(&self, n: usize) {
        while self.calls() < n {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl DetailSource for FakeDetailSource {
    async fn list(&self, _scope: &ListingScope) -> anyhow::Result<Vec<ResourceDetail>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut held = self.held.subscribe();
        held.wait_for(|held| !held).await?;

        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("listing source panicked");
        }
        if let Some(message) = self.fail_next.lock().take() {
            anyhow::bail!(message);
        }
        Ok(self.resources.lock().clone())
    }
}

/// Notification received by [`RecordingHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ItemChanged(ResourceIdentity, TreeItemView),
    PopulationFailed(PopulationError),
}

/// Tree host that records every notification
#[derive(Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
    notify: Notify,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.events.lock().clone()
    }

    /// Identities passed to `item_changed`, in call order
    pub fn changed(&self) -> Vec<ResourceIdentity> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                HostEvent::ItemChanged(identity, _) => Some(identity.clone()),
                HostEvent::PopulationFailed(_) => None,
            })
            .collect()
    }

    pub fn failures(&self) -> Vec<PopulationError> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                HostEvent::PopulationFailed(error) => Some(error.clone()),
                HostEvent::ItemChanged(..) => None,
            })
            .collect()
    }

    /// Wait until at least `n` events were recorded
    pub async fn wait_for_events(&self, n: usize) -> Vec<HostEvent> {
        loop {
            let notified = self.notify.notified();
            {
                let events = self.events.lock();
                if events.len() >= n {
                    return events.clone();
                }
            }
            notified.await;
        }
    }

    fn record(&self, event: HostEvent) {
        self.events.lock().push(event);
        self.notify.notify_waiters();
    }
}

impl TreeHost for RecordingHost {
    fn item_changed(&self, identity: &ResourceIdentity, view: TreeItemView) {
        self.record(HostEvent::ItemChanged(identity.clone(), view));
    }

    fn population_failed(&self, error: &PopulationError) {
        self.record(HostEvent::PopulationFailed(error.clone()));
    }
}

/// In-memory account explorer
#[derive(Default)]
pub struct FakeExplorer {
    connection_strings: HashMap<ResourceIdentity, String>,
    databases: Vec<String>,
    collections: HashMap<String, Vec<String>>,
    fail_listing: bool,
    database_calls: AtomicUsize,
}

impl FakeExplorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_connection_string(mut self, identity: &str, raw: &str) -> Self {
        self.connection_strings
            .insert(ResourceIdentity::new(identity), raw.to_string());
        self
    }

    pub fn with_database(mut self, name: &str, collections: &[&str]) -> Self {
        self.databases.push(name.to_string());
        self.collections.insert(
            name.to_string(),
            collections.iter().map(ToString::to_string).collect(),
        );
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn database_calls(&self) -> usize {
        self.database_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountExplorer for FakeExplorer {
    async fn connection_string(&self, resource: &BaseResource) -> anyhow::Result<String> {
        self.connection_strings
            .get(&resource.id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no connection string for {}", resource.id))
    }

    async fn list_databases(&self, _descriptor: &ConnectionDescriptor) -> anyhow::Result<Vec<String>> {
        self.database_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing {
            anyhow::bail!("connection refused");
        }
        Ok(self.databases.clone())
    }

    async fn list_collections(
        &self,
        _descriptor: &ConnectionDescriptor,
        database: &str,
    ) -> anyhow::Result<Vec<String>> {
        if self.fail_listing {
            anyhow::bail!("connection refused");
        }
        Ok(self.collections.get(database).cloned().unwrap_or_default())
    }
}

pub fn scope() -> ListingScope {
    ListingScope::new(SCOPE)
}

pub fn base(id: &str, kind: ResourceKind) -> BaseResource {
    BaseResource::new(id, format!("name-of-{id}"), kind, scope())
}

pub fn detail(id: &str) -> ResourceDetail {
    ResourceDetail::new(id, format!("name-of-{id}"))
        .with_capacity("M30")
        .with_node_count(3)
        .with_server_version("7.0")
}

/// Details for the given ids
pub fn details(ids: &[&str]) -> Vec<ResourceDetail> {
    ids.iter().map(|id| detail(id)).collect()
}

pub fn cache_over(source: Arc<FakeDetailSource>, ttl_secs: u64) -> Arc<ResourceDetailCache> {
    Arc::new(ResourceDetailCache::new(
        source,
        CacheConfig::new().with_ttl_secs(ttl_secs),
    ))
}
