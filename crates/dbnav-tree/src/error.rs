//! Error types for the tree layer

use dbnav_cache::{PopulationError, ResourceIdentity};
use dbnav_connstr::ParseError;

/// Errors surfaced while building or expanding tree items
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Resource detail could not be populated
    #[error(transparent)]
    Population(#[from] PopulationError),

    /// Connection string did not parse
    #[error("invalid connection string: {0}")]
    Parse(#[from] ParseError),

    /// The account explorer failed
    #[error("{operation} failed for '{identity}'")]
    Explorer {
        /// Item being expanded
        identity: ResourceIdentity,
        /// Explorer call that failed
        operation: &'static str,
        /// Underlying failure
        #[source]
        source: anyhow::Error,
    },
}

impl TreeError {
    /// Create explorer error for an item
    pub fn explorer(
        identity: &ResourceIdentity,
        operation: &'static str,
        source: anyhow::Error,
    ) -> Self {
        Self::Explorer {
            identity: identity.clone(),
            operation,
            source,
        }
    }
}

/// Result type for tree operations
pub type TreeResult<T> = std::result::Result<T, TreeError>;
