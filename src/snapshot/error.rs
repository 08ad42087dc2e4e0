//! Error type shared by every snapshot stage

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Indexer request failed, returned a non-success status, or the local
    /// policy cache could not be read
    #[error("Snapshot source unavailable for policy {policy_id}: {reason}")]
    SourceUnavailable { policy_id: String, reason: String },

    #[error("Malformed address {address}: {reason}")]
    MalformedAddress { address: String, reason: String },

    /// A tracked class has no eligible supply, so no rate can be derived
    #[error("Cannot allocate rewards for {name} ({policy_id}): total supply is zero")]
    ZeroSupplyAllocation { policy_id: String, name: String },

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Invalid snapshot configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for SnapshotError {
    fn from(err: rusqlite::Error) -> Self {
        SnapshotError::PersistenceFailure(err.to_string())
    }
}
