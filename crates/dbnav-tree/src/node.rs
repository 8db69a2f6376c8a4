//! Seams between the tree layer and its host
//!
//! - [`TreeNode`]: anything that can render itself and enumerate children
//! - [`TreeHost`]: the view that receives refresh notifications
//! - [`AccountExplorer`]: the data-plane client that lists databases and collections

use crate::error::TreeResult;
use crate::resource::BaseResource;
use async_trait::async_trait;
use dbnav_cache::{PopulationError, ResourceIdentity};
use dbnav_connstr::ConnectionDescriptor;
use serde::Serialize;
use std::sync::Arc;

/// Expansion state of a rendered item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Collapsible {
    /// Leaf
    None,
    /// Has children, folded
    Collapsed,
    /// Has children, unfolded
    Expanded,
}

/// Rendered form of a tree item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItemView {
    /// Stable id
    pub id: String,
    /// Primary text
    pub label: String,
    /// Secondary text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Hover text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
    /// Menu context key
    pub context_value: String,
    /// Icon id
    pub icon: String,
    /// Expansion state
    pub collapsible: Collapsible,
}

/// Node of the resource tree
#[async_trait]
pub trait TreeNode: Send + Sync {
    /// Id used for refresh routing
    fn identity(&self) -> ResourceIdentity;

    /// Render for display
    fn tree_item(&self) -> TreeItemView;

    /// Enumerate children
    async fn children(&self, explorer: &dyn AccountExplorer) -> TreeResult<Vec<Arc<dyn TreeNode>>>;
}

/// View that displays tree items
pub trait TreeHost: Send + Sync {
    /// Re-render the item with `identity`
    fn item_changed(&self, identity: &ResourceIdentity, view: TreeItemView);

    /// A population cycle failed; show the error once
    fn population_failed(&self, error: &PopulationError);
}

/// Data-plane client for the accounts in the tree
#[async_trait]
pub trait AccountExplorer: Send + Sync {
    /// Connection string of a listed account
    async fn connection_string(&self, resource: &BaseResource) -> anyhow::Result<String>;

    /// Database names reachable through `descriptor`
    async fn list_databases(&self, descriptor: &ConnectionDescriptor) -> anyhow::Result<Vec<String>>;

    /// Collection, container or table names inside `database`
    async fn list_collections(
        &self,
        descriptor: &ConnectionDescriptor,
        database: &str,
    ) -> anyhow::Result<Vec<String>>;
}
