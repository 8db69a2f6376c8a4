//! JSON fixtures standing in for the cloud management and data-plane APIs
//!
//! ```json
//! {
//!   "accounts": [
//!     {
//!       "id": "/subscriptions/s/accounts/orders",
//!       "name": "orders",
//!       "kind": "mongo-cluster",
//!       "scope": "s",
//!       "detail": { "capacity": "M30", "node_count": 3 },
//!       "connection_string": "mongodb+srv://orders.example.net/",
//!       "databases": { "shop": ["carts", "orders"] }
//!     }
//!   ]
//! }
//! ```

use async_trait::async_trait;
use dbnav_cache::{ListingScope, ResourceDetail, StaticDetailSource};
use dbnav_connstr::ConnectionDescriptor;
use dbnav_tree::{AccountExplorer, BaseResource};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Detail fields of a fixture account; identity and name come from the account
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixtureDetail {
    /// SKU or tier
    pub capacity: Option<String>,
    /// Nodes or shards
    pub node_count: Option<u32>,
    /// Storage in GB
    pub storage_gb: Option<u32>,
    /// Engine version
    pub server_version: Option<String>,
    /// Public endpoint
    pub endpoint: Option<String>,
}

/// One listed account
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureAccount {
    /// Base listing fields
    #[serde(flatten)]
    pub resource: BaseResource,
    /// Detail returned by the bulk listing; absent accounts are missing from it
    #[serde(default)]
    pub detail: Option<FixtureDetail>,
    /// Connection string handed out by the data-plane client
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Databases and their collections
    #[serde(default)]
    pub databases: BTreeMap<String, Vec<String>>,
}

impl FixtureAccount {
    fn resource_detail(&self) -> Option<ResourceDetail> {
        let fixture = self.detail.clone()?;
        let mut detail = ResourceDetail::new(self.resource.id.clone(), self.resource.name.clone());
        detail.resource_group.clone_from(&self.resource.resource_group);
        detail.location.clone_from(&self.resource.location);
        detail.capacity = fixture.capacity;
        detail.node_count = fixture.node_count;
        detail.storage_gb = fixture.storage_gb;
        detail.server_version = fixture.server_version;
        detail.endpoint = fixture.endpoint;
        Some(detail)
    }
}

/// Fixture file contents
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fixture {
    /// Listed accounts
    #[serde(default)]
    pub accounts: Vec<FixtureAccount>,
}

impl Fixture {
    /// Load from a JSON file
    ///
    /// # Errors
    /// When the file cannot be read or decoded
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture = serde_json::from_str(&text)
            .with_context(|| format!("decoding fixture {}", path.display()))?;
        Ok(fixture)
    }

    /// Scope of the first account, used for the bulk listing
    #[must_use]
    pub fn scope(&self) -> ListingScope {
        self.accounts
            .first()
            .map_or_else(|| ListingScope::new("fixture"), |a| a.resource.scope.clone())
    }

    /// Bulk listing source over the fixture
    ///
    /// Lists every account with detail regardless of scope, the way one
    /// cache serves the whole tree.
    #[must_use]
    pub fn detail_source(&self) -> StaticDetailSource {
        StaticDetailSource::new(
            self.accounts
                .iter()
                .filter_map(FixtureAccount::resource_detail)
                .collect(),
        )
    }

    /// Data-plane client over the fixture
    ///
    /// Databases are keyed by the account id of each fixture connection
    /// string; accounts whose string does not parse are skipped.
    #[must_use]
    pub fn explorer(&self) -> FixtureExplorer {
        let mut connection_strings = HashMap::new();
        let mut databases = HashMap::new();
        for account in &self.accounts {
            let Some(raw) = &account.connection_string else {
                continue;
            };
            connection_strings.insert(account.resource.id.to_string(), raw.clone());
            match dbnav_connstr::parse(raw, account.resource.kind.dialect()) {
                Ok(descriptor) => {
                    databases.insert(descriptor.account_id(), account.databases.clone());
                }
                Err(error) => {
                    tracing::warn!(account = %account.resource.id, error = %error, "fixture connection string does not parse");
                }
            }
        }
        FixtureExplorer {
            connection_strings,
            databases,
        }
    }
}

/// [`AccountExplorer`] serving fixture databases
#[derive(Debug, Clone)]
pub struct FixtureExplorer {
    connection_strings: HashMap<String, String>,
    databases: HashMap<String, BTreeMap<String, Vec<String>>>,
}

impl FixtureExplorer {
    fn account(&self, descriptor: &ConnectionDescriptor) -> anyhow::Result<&BTreeMap<String, Vec<String>>> {
        let account_id = descriptor.account_id();
        self.databases
            .get(&account_id)
            .ok_or_else(|| anyhow::anyhow!("unknown account {account_id}"))
    }
}

#[async_trait]
impl AccountExplorer for FixtureExplorer {
    async fn connection_string(&self, resource: &BaseResource) -> anyhow::Result<String> {
        self.connection_strings
            .get(resource.id.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no connection string for {}", resource.id))
    }

    async fn list_databases(&self, descriptor: &ConnectionDescriptor) -> anyhow::Result<Vec<String>> {
        Ok(self.account(descriptor)?.keys().cloned().collect())
    }

    async fn list_collections(
        &self,
        descriptor: &ConnectionDescriptor,
        database: &str,
    ) -> anyhow::Result<Vec<String>> {
        Ok(self
            .account(descriptor)?
            .get(database)
            .cloned()
            .unwrap_or_default())
    }
}
