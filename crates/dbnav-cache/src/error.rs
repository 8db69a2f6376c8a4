//! Error types for cache population

use crate::types::ListingScope;

/// Outcome of a failed population cycle
///
/// `Clone` so the same error can be handed to the populating caller and to
/// every caller parked on the gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PopulationError {
    /// The bulk listing call failed
    #[error("listing resources in '{scope}' failed: {message}")]
    ListingFailed {
        /// Scope passed to the listing call
        scope: ListingScope,
        /// Rendered error chain of the collaborator failure
        message: String,
    },

    /// The populating task went away before reporting an outcome
    #[error("population was abandoned before completing")]
    Abandoned,
}

impl PopulationError {
    /// Create listing failure from a collaborator error
    pub fn listing_failed(scope: &ListingScope, source: &anyhow::Error) -> Self {
        Self::ListingFailed {
            scope: scope.clone(),
            message: format!("{source:#}"),
        }
    }

    /// Whether another attempt could succeed without outside intervention
    #[inline]
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        matches!(self, Self::Abandoned)
    }
}

/// Result type for population
pub type PopulationResult<T> = std::result::Result<T, PopulationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_failed_renders_chain() {
        let source = anyhow::anyhow!("503 Service Unavailable").context("list accounts");
        let err = PopulationError::listing_failed(&ListingScope::new("sub-1"), &source);
        assert_eq!(
            err.to_string(),
            "listing resources in 'sub-1' failed: list accounts: 503 Service Unavailable"
        );
        assert!(!err.is_abandoned());
        assert!(PopulationError::Abandoned.is_abandoned());
    }
}
