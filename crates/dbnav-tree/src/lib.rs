//! dbnav Tree
//!
//! Tree items for database accounts and the machinery that keeps them in
//! step with the resource detail cache.
//!
//! # Flow
//!
//! 1. The view asks [`BranchDataProvider::get_resource_item`] for an account
//! 2. The provider decorates it from the cache, starting a background
//!    population if the cache is stale
//! 3. Items built without detail are parked in the
//!    [`TreeItemRefreshRegistry`]
//! 4. When the population completes the registry merges the detail into each
//!    parked item and tells the [`TreeHost`] to re-render it, once

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod item;
pub mod listener;
pub mod node;
pub mod provider;
pub mod registry;
pub mod resource;

pub use error::{TreeError, TreeResult};
pub use item::{
    AttachedAccountItem, CollectionItem, DatabaseItem, MongoAccountItem, MongoClusterItem,
    NoSqlAccountItem, PostgresServerItem, ResourceItem,
};
pub use listener::RefreshListener;
pub use node::{AccountExplorer, Collapsible, TreeHost, TreeItemView, TreeNode};
pub use provider::BranchDataProvider;
pub use registry::TreeItemRefreshRegistry;
pub use resource::{BaseResource, ResourceKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building tree views
    pub use crate::{
        AccountExplorer, BaseResource, BranchDataProvider, ResourceItem, ResourceKind, TreeHost,
        TreeItemRefreshRegistry, TreeNode,
    };
}
