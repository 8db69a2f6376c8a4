//! dbnav Resource Detail Cache
//!
//! Caches the management-API detail of every resource in an account list so
//! tree items can be decorated without one remote call per item.
//!
//! # Core Concepts
//!
//! - **Single flight**: one bulk listing per population cycle, guarded by an
//!   [`AsyncGate`]; concurrent callers wait for its outcome
//! - **Lazy TTL**: a snapshot expires by timestamp, checked on read
//! - **Whole-cache replacement**: a new listing replaces the snapshot in one step
//! - **Announcements**: [`PopulationEvent`]s on a broadcast channel let the tree
//!   layer refresh items surfaced before their detail arrived
//!
//! # Example
//!
//! ```rust
//! use dbnav_cache::{CacheConfig, ListingScope, ResourceDetail, ResourceDetailCache, StaticDetailSource};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let source = StaticDetailSource::new(vec![ResourceDetail::new("acct-1", "orders")]);
//! let cache = ResourceDetailCache::new(Arc::new(source), CacheConfig::default());
//!
//! cache.ensure_fresh(&ListingScope::new("sub-1")).await.unwrap();
//! assert_eq!(cache.get(&"acct-1".into()).unwrap().detail.name, "orders");
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cache;
pub mod config;
pub mod error;
pub mod gate;
pub mod source;
pub mod types;

pub use cache::{CacheSnapshot, CacheStats, PopulationEvent, ResourceDetailCache};
pub use config::CacheConfig;
pub use error::{PopulationError, PopulationResult};
pub use gate::{AsyncGate, GateGuard, GateOutcome, GateWaiter};
pub use source::{DetailSource, StaticDetailSource};
pub use types::{CachedResourceDetail, ListingScope, ResourceDetail, ResourceIdentity};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the cache
    pub use crate::{
        CacheConfig, DetailSource, ListingScope, PopulationError, PopulationEvent,
        ResourceDetail, ResourceDetailCache, ResourceIdentity,
    };
}
