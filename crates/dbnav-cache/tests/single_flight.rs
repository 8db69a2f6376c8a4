//! Single-flight population and gate liveness
//!
//! Run with: cargo test --package dbnav-cache --test single_flight

use dbnav_cache::{PopulationError, PopulationEvent, ResourceDetailCache, ResourceIdentity};
use dbnav_test_utils::{cache_over, details, scope, FakeDetailSource};
use futures::future::join_all;
use std::sync::Arc;

async fn wait_for_waiters(cache: &ResourceDetailCache, n: usize) {
    while cache.gate().waiter_count() < n {
        tokio::task::yield_now().await;
    }
}

fn spawn_callers(
    cache: &Arc<ResourceDetailCache>,
    n: usize,
) -> Vec<tokio::task::JoinHandle<Result<dbnav_cache::CacheSnapshot, PopulationError>>> {
    (0..n)
        .map(|_| {
            let cache = Arc::clone(cache);
            tokio::spawn(async move { cache.ensure_fresh(&scope()).await })
        })
        .collect()
}

#[tokio::test]
async fn concurrent_cold_callers_share_one_listing() {
    let source = FakeDetailSource::new(details(&["a", "b", "c"]));
    let cache = cache_over(Arc::clone(&source), 300);
    source.hold();

    let handles = spawn_callers(&cache, 8);
    source.wait_for_calls(1).await;
    wait_for_waiters(&cache, 7).await;
    assert!(cache.is_populating());
    source.release();

    let snapshots: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    assert_eq!(source.calls(), 1);
    assert!(snapshots.iter().all(|s| s.same_as(&snapshots[0])));
    assert_eq!(snapshots[0].len(), 3);
    assert!(!cache.is_populating());
    assert!(cache.get(&ResourceIdentity::new("b")).is_some());
}

#[tokio::test]
async fn failure_reaches_every_waiter_and_next_caller_retries() {
    let source = FakeDetailSource::new(details(&["a"]));
    let cache = cache_over(Arc::clone(&source), 300);
    let mut events = cache.subscribe();
    source.hold();
    source.fail_next("503 Service Unavailable");

    let handles = spawn_callers(&cache, 4);
    source.wait_for_calls(1).await;
    wait_for_waiters(&cache, 3).await;
    source.release();

    let errors: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap_err())
        .collect();
    assert_eq!(source.calls(), 1);
    assert!(errors.iter().all(|e| *e == errors[0]));
    assert!(matches!(
        &errors[0],
        PopulationError::ListingFailed { message, .. } if message == "503 Service Unavailable"
    ));

    match events.recv().await.unwrap() {
        PopulationEvent::Failed { error, .. } => assert_eq!(error, errors[0]),
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(cache.needs_population());
    assert_eq!(cache.stats().failures, 1);

    let snapshot = cache.ensure_fresh(&scope()).await.unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(snapshot.cycle(), 1);
}

#[tokio::test]
async fn failure_keeps_previous_snapshot() {
    let source = FakeDetailSource::new(details(&["a"]));
    let cache = cache_over(Arc::clone(&source), 300);
    let first = cache.ensure_fresh(&scope()).await.unwrap();

    cache.invalidate();
    source.fail_next("throttled");
    assert!(cache.ensure_fresh(&scope()).await.is_err());

    // Still stale; the old snapshot stays in place.
    assert!(cache.needs_population());
    assert_eq!(cache.stats().entry_count, 1);
    assert_eq!(cache.cycle(), first.cycle());
}

#[tokio::test]
async fn panicking_populator_does_not_wedge_waiters() {
    let source = FakeDetailSource::new(details(&["a"]));
    let cache = cache_over(Arc::clone(&source), 300);
    source.hold();
    source.panic_next();

    let populator = spawn_callers(&cache, 1).remove(0);
    source.wait_for_calls(1).await;
    let waiter = spawn_callers(&cache, 1).remove(0);
    wait_for_waiters(&cache, 1).await;
    source.release();

    assert!(populator.await.unwrap_err().is_panic());
    // The waiter takes over and populates itself.
    let snapshot = waiter.await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(source.calls(), 2);
    assert!(!cache.is_populating());
}

#[tokio::test]
async fn cancelled_populator_does_not_wedge_waiters() {
    let source = FakeDetailSource::new(details(&["a", "b"]));
    let cache = cache_over(Arc::clone(&source), 300);
    source.hold();

    let populator = spawn_callers(&cache, 1).remove(0);
    source.wait_for_calls(1).await;
    let waiter = spawn_callers(&cache, 1).remove(0);
    wait_for_waiters(&cache, 1).await;

    populator.abort();
    assert!(populator.await.unwrap_err().is_cancelled());
    source.wait_for_calls(2).await;
    source.release();

    let snapshot = waiter.await.unwrap().unwrap();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(source.calls(), 2);
}

#[tokio::test]
async fn invalidate_during_population_leaves_cache_stale() {
    let source = FakeDetailSource::new(details(&["a"]));
    let cache = cache_over(Arc::clone(&source), 300);
    source.hold();

    let populator = spawn_callers(&cache, 1).remove(0);
    source.wait_for_calls(1).await;
    cache.invalidate();
    source.release();

    assert_eq!(populator.await.unwrap().unwrap().cycle(), 1);
    assert!(cache.needs_population());
    assert!(cache.get(&ResourceIdentity::new("a")).is_none());

    source.set_resources(details(&["a", "z"]));
    let snapshot = cache.ensure_fresh(&scope()).await.unwrap();
    assert_eq!(snapshot.cycle(), 2);
    assert!(cache.get(&ResourceIdentity::new("z")).is_some());
}
