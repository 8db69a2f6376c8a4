//! Lazy TTL expiry against a paused clock
//!
//! Run with: cargo test --package dbnav-cache --test ttl

use dbnav_cache::ResourceIdentity;
use dbnav_test_utils::{cache_over, details, scope, FakeDetailSource};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn entries_expire_after_ttl_without_a_timer() {
    let source = FakeDetailSource::new(details(&["a"]));
    let cache = cache_over(Arc::clone(&source), 300);
    let id = ResourceIdentity::new("a");

    cache.ensure_fresh(&scope()).await.unwrap();
    assert!(!cache.needs_population());

    tokio::time::advance(Duration::from_secs(299)).await;
    assert!(cache.get(&id).is_some());
    cache.ensure_fresh(&scope()).await.unwrap();
    assert_eq!(source.calls(), 1);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(cache.get(&id).is_none());
    assert!(cache.needs_population());
    // Reads never repopulate.
    assert_eq!(source.calls(), 1);

    let snapshot = cache.ensure_fresh(&scope()).await.unwrap();
    assert_eq!(source.calls(), 2);
    assert_eq!(snapshot.cycle(), 2);
    assert!(cache.get(&id).is_some());
}

#[tokio::test(start_paused = true)]
async fn zero_ttl_serves_nothing_from_reads() {
    let source = FakeDetailSource::new(details(&["a"]));
    let cache = cache_over(Arc::clone(&source), 0);

    let snapshot = cache.ensure_fresh(&scope()).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(cache.get(&ResourceIdentity::new("a")).is_none());
}
