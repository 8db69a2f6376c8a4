//! Deferred refresh of items surfaced before their detail was cached
//!
//! Run with: cargo test --package dbnav-tree --test deferred_refresh

use dbnav_cache::{PopulationError, ResourceIdentity};
use dbnav_test_utils::{
    base, cache_over, details, scope, FakeDetailSource, FakeExplorer, HostEvent, RecordingHost,
};
use dbnav_tree::{
    BranchDataProvider, ResourceItem, ResourceKind, TreeError, TreeItemRefreshRegistry, TreeNode,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    source: Arc<FakeDetailSource>,
    host: Arc<RecordingHost>,
    provider: BranchDataProvider,
}

fn fixture(ids: &[&str]) -> Fixture {
    let source = FakeDetailSource::new(details(ids));
    let host = RecordingHost::new();
    let provider = BranchDataProvider::new(
        cache_over(Arc::clone(&source), 300),
        Arc::new(TreeItemRefreshRegistry::new()),
        host.clone(),
        Arc::new(FakeExplorer::new()),
    );
    Fixture {
        source,
        host,
        provider,
    }
}

async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

async fn wait_for_events(host: &RecordingHost, n: usize) -> Vec<HostEvent> {
    tokio::time::timeout(Duration::from_secs(5), host.wait_for_events(n))
        .await
        .expect("host notifications")
}

#[tokio::test]
async fn item_surfaced_cold_is_refreshed_exactly_once() {
    let f = fixture(&["a", "b"]);
    f.source.hold();

    let item = f.provider.get_resource_item(base("a", ResourceKind::MongoCluster));
    assert!(item.awaits_detail());
    assert_eq!(item.tree_item().description, None);
    assert_eq!(f.provider.registry().pending_count(), 1);

    f.source.wait_for_calls(1).await;
    f.source.release();

    let events = wait_for_events(&f.host, 1).await;
    settle().await;
    assert_eq!(f.host.events().len(), 1);
    match &events[0] {
        HostEvent::ItemChanged(identity, view) => {
            assert_eq!(identity, &ResourceIdentity::new("a"));
            assert_eq!(view.description.as_deref(), Some("M30, 3 nodes"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(!item.awaits_detail());
    assert_eq!(f.provider.registry().pending_count(), 0);
    assert_eq!(f.source.calls(), 1);
}

#[tokio::test]
async fn listener_and_background_drain_do_not_double_notify() {
    let f = fixture(&["a", "b"]);
    let listener = f.provider.refresh_listener().spawn();
    f.source.hold();

    let a = f.provider.get_resource_item(base("a", ResourceKind::NoSqlAccount));
    let b = f.provider.get_resource_item(base("b", ResourceKind::PostgresServer));
    assert_eq!(f.provider.registry().pending_count(), 2);

    f.source.wait_for_calls(1).await;
    f.source.release();
    wait_for_events(&f.host, 2).await;
    settle().await;

    let mut changed = f.host.changed();
    changed.sort();
    assert_eq!(changed, vec![ResourceIdentity::new("a"), ResourceIdentity::new("b")]);
    assert!(a.detail().is_some() && b.detail().is_some());
    // One background population for two cold items.
    assert_eq!(f.source.calls(), 1);
    listener.abort();
}

#[tokio::test]
async fn items_resolved_after_completion_get_no_callback() {
    let f = fixture(&["a"]);
    f.provider.refresh(&scope()).await.unwrap();

    let item = f.provider.get_resource_item(base("a", ResourceKind::MongoAccount));
    settle().await;

    assert!(!item.awaits_detail());
    assert_eq!(
        item.tree_item().description.as_deref(),
        Some("MongoDB 7.0")
    );
    assert_eq!(f.provider.registry().pending_count(), 0);
    assert!(f.host.events().is_empty());
    assert_eq!(f.source.calls(), 1);
}

#[tokio::test]
async fn item_missing_from_listing_is_still_rerendered() {
    let f = fixture(&["a"]);
    let item = f.provider.get_resource_item(base("ghost", ResourceKind::MongoCluster));

    wait_for_events(&f.host, 1).await;
    assert_eq!(f.host.changed(), vec![ResourceIdentity::new("ghost")]);
    assert!(item.awaits_detail());
    assert_eq!(f.provider.registry().pending_count(), 0);
}

#[tokio::test]
async fn failed_population_is_reported_once_and_items_stay_parked() {
    let f = fixture(&["a"]);
    let listener = f.provider.refresh_listener().spawn();
    f.source.fail_next("forbidden");

    let error = f.provider.refresh(&scope()).await.unwrap_err();
    assert!(matches!(
        error,
        TreeError::Population(PopulationError::ListingFailed { .. })
    ));

    let events = wait_for_events(&f.host, 1).await;
    assert!(matches!(&events[0], HostEvent::PopulationFailed(_)));

    // The next cold item triggers a retry, which succeeds and refreshes it.
    let item = f.provider.get_resource_item(base("a", ResourceKind::MongoCluster));
    wait_for_events(&f.host, 2).await;
    settle().await;
    assert_eq!(f.host.changed(), vec![ResourceIdentity::new("a")]);
    assert!(!item.awaits_detail());
    assert_eq!(f.source.calls(), 2);
    listener.abort();
}

#[tokio::test]
async fn dispatch_builds_one_variant_per_kind() {
    let f = fixture(&[]);
    for kind in ResourceKind::ALL {
        let item = f.provider.get_resource_item(base("x", kind));
        let matches = match (&*item, kind) {
            (ResourceItem::NoSqlAccount(_), ResourceKind::NoSqlAccount)
            | (ResourceItem::MongoAccount(_), ResourceKind::MongoAccount)
            | (ResourceItem::MongoCluster(_), ResourceKind::MongoCluster)
            | (ResourceItem::PostgresServer(_), ResourceKind::PostgresServer) => true,
            _ => false,
        };
        assert!(matches, "{kind} built the wrong item");
        assert_eq!(item.tree_item().context_value, kind.context_value());
    }
    // Re-registering the same identity replaces the parked item.
    assert_eq!(f.provider.registry().pending_count(), 1);
}

#[tokio::test]
async fn item_missing_from_warm_cache_is_never_parked() {
    let f = fixture(&["a"]);
    f.provider.refresh(&scope()).await.unwrap();

    let ghost = f.provider.get_resource_item(base("ghost", ResourceKind::MongoCluster));
    assert!(ghost.awaits_detail());
    assert_eq!(f.provider.registry().pending_count(), 0);

    // A later, unrelated cycle must not re-render it either.
    f.provider.cache().invalidate();
    f.provider.refresh(&scope()).await.unwrap();
    settle().await;
    assert!(f.host.events().is_empty());
    assert_eq!(f.source.calls(), 2);
}

#[tokio::test]
async fn invalidation_during_flight_still_delivers_detail() {
    let f = fixture(&["a"]);
    f.source.hold();

    let item = f.provider.get_resource_item(base("a", ResourceKind::MongoCluster));
    f.source.wait_for_calls(1).await;
    f.provider.cache().invalidate();
    f.source.release();

    let events = wait_for_events(&f.host, 1).await;
    match &events[0] {
        HostEvent::ItemChanged(identity, view) => {
            assert_eq!(identity, &ResourceIdentity::new("a"));
            assert_eq!(view.description.as_deref(), Some("M30, 3 nodes"));
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(item.detail().unwrap().capacity.as_deref(), Some("M30"));
    assert!(f.provider.cache().needs_population());
    assert_eq!(f.provider.registry().pending_count(), 0);
}

#[tokio::test]
async fn background_failure_without_listener_reaches_host() {
    let f = fixture(&["a"]);
    f.source.fail_next("forbidden");

    let item = f.provider.get_resource_item(base("a", ResourceKind::NoSqlAccount));
    let events = wait_for_events(&f.host, 1).await;
    assert!(matches!(
        &events[0],
        HostEvent::PopulationFailed(PopulationError::ListingFailed { .. })
    ));
    assert!(item.awaits_detail());
    assert_eq!(f.provider.registry().pending_count(), 1);
}

#[tokio::test]
async fn background_failure_with_listener_is_reported_once() {
    let f = fixture(&["a"]);
    let listener = f.provider.refresh_listener().spawn();
    f.source.fail_next("forbidden");

    let _item = f.provider.get_resource_item(base("a", ResourceKind::NoSqlAccount));
    wait_for_events(&f.host, 1).await;
    settle().await;
    assert_eq!(f.host.failures().len(), 1);
    assert_eq!(f.host.events().len(), 1);
    listener.abort();
}
