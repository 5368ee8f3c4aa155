//! Placement error taxonomy.

use thiserror::Error;

/// Terminal outcomes of one placement attempt. None of them is retried here.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Required inputs are missing (template, provider, requester).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Nothing satisfies the request's tag filters.
    #[error("no eligible placement: {0}")]
    Eligibility(String),

    /// Eligible candidates exist but all of them fail capacity thresholds.
    #[error("insufficient capacity: {0}")]
    Capacity(String),

    #[error("inventory read failed: {0}")]
    Inventory(#[from] anyhow::Error),

    #[error("write-back to provisioning request failed: {0}")]
    WriteBack(anyhow::Error),
}

impl PlacementError {
    /// Stable label for API responses and events.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Eligibility(_) => "eligibility",
            Self::Capacity(_) => "capacity",
            Self::Inventory(_) => "inventory",
            Self::WriteBack(_) => "write_back",
        }
    }
}

pub type PlacementResult<T> = Result<T, PlacementError>;
