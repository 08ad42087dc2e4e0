//! Snapshot source trait and the ownership record it yields

use super::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One unspent output as reported by the indexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnershipRecord {
    pub address: Option<String>,
    /// Asset unit (policy id + asset name) → quantity
    pub asset_balances: BTreeMap<String, u64>,
}

impl OwnershipRecord {
    pub fn new(address: &str, balances: &[(&str, u64)]) -> Self {
        Self {
            address: Some(address.to_string()),
            asset_balances: balances
                .iter()
                .map(|(unit, qty)| (unit.to_string(), *qty))
                .collect(),
        }
    }
}

/// Supplies the unspent outputs holding assets under a policy
///
/// Implementations:
/// - `KupoClient` - live indexer over HTTP
/// - `PolicyCache` - JSON files saved by a previous live run
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, policy_id: &str) -> Result<Vec<OwnershipRecord>>;

    /// Source name for logging
    fn source_type(&self) -> &'static str;
}
