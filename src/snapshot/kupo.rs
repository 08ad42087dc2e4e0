//! Kupo indexer client
//!
//! ## API Reference
//!
//! Endpoint: `{KUPO_URL}/matches/{policy_id}.*?order=oldest_first&unspent`
//! Returns: array of unspent outputs holding any asset under the policy
//!
//! ```json
//! [{
//!   "transaction_id": "…", "output_index": 0,
//!   "address": "addr1…",
//!   "value": { "coins": 1344798, "assets": { "<policy>.<name>": 1 } }
//! }]
//! ```
//!
//! Hosted instances need the `dmtr-api-key` header.

use super::cache::PolicyCache;
use super::error::{Result, SnapshotError};
use super::source::{OwnershipRecord, SnapshotSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

const API_KEY_HEADER: &str = "dmtr-api-key";

/// One match as returned by Kupo
///
/// Fields the snapshot does not read are kept in `extra` so a saved policy
/// cache is a faithful copy of the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KupoMatch {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub value: KupoValue,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KupoValue {
    #[serde(default)]
    pub coins: u64,
    #[serde(default)]
    pub assets: BTreeMap<String, u64>,
}

impl From<KupoMatch> for OwnershipRecord {
    fn from(m: KupoMatch) -> Self {
        OwnershipRecord {
            address: m.address,
            asset_balances: m.value.assets,
        }
    }
}

pub struct KupoClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    save_to: Option<PolicyCache>,
}

impl KupoClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SnapshotError::SourceUnavailable {
                policy_id: String::new(),
                reason: format!("cannot build HTTP client: {}", e),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client,
            save_to: None,
        })
    }

    /// Write every fetched response to the policy cache
    pub fn save_to(mut self, cache: PolicyCache) -> Self {
        self.save_to = Some(cache);
        self
    }

    pub fn matches_url(&self, policy_id: &str) -> String {
        format!(
            "{}/matches/{}.*?order=oldest_first&unspent",
            self.base_url, policy_id
        )
    }

    pub async fn fetch_matches(&self, policy_id: &str) -> Result<Vec<KupoMatch>> {
        let unavailable = |reason: String| SnapshotError::SourceUnavailable {
            policy_id: policy_id.to_string(),
            reason,
        };

        let mut request = self.client.get(self.matches_url(policy_id));
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(unavailable(format!("Kupo API error: {} {}", status, body)));
        }

        let matches: Vec<KupoMatch> = response
            .json()
            .await
            .map_err(|e| unavailable(format!("invalid response body: {}", e)))?;

        Ok(matches)
    }
}

#[async_trait]
impl SnapshotSource for KupoClient {
    async fn fetch(&self, policy_id: &str) -> Result<Vec<OwnershipRecord>> {
        let matches = self.fetch_matches(policy_id).await?;

        if let Some(cache) = &self.save_to {
            cache.save(policy_id, &matches)?;
        }

        Ok(matches.into_iter().map(OwnershipRecord::from).collect())
    }

    fn source_type(&self) -> &'static str {
        "Kupo"
    }
}
