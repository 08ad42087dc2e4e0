//! Result publishing
//!
//! Turns the per-stake rewards into rows rounded to 1 decimal place and hands
//! them to a `RewardSink`, which replaces the previous snapshot's rows.

use super::allocator::round_dp;
use super::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Precision of the published reward
pub const PUBLISHED_REWARD_DECIMALS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardRow {
    pub stake: String,
    pub reward: f64,
}

/// Destination for the final reward rows
///
/// `replace_all` supersedes every row of the table: after it returns `Ok`
/// the table holds exactly `rows`.
#[async_trait]
pub trait RewardSink: Send + Sync {
    /// Returns the number of rows written
    async fn replace_all(&self, table: &str, rows: &[RewardRow]) -> Result<usize>;

    fn sink_type(&self) -> &'static str;
}

/// Rows sorted by stake address
pub fn build_rows(by_stake: &BTreeMap<String, f64>) -> Vec<RewardRow> {
    by_stake
        .iter()
        .map(|(stake, reward)| RewardRow {
            stake: stake.clone(),
            reward: round_dp(*reward, PUBLISHED_REWARD_DECIMALS),
        })
        .collect()
}

pub async fn publish(sink: &dyn RewardSink, table: &str, rows: &[RewardRow]) -> Result<usize> {
    log::info!(
        "📤 Publishing {} reward rows to {} table '{}'",
        rows.len(),
        sink.sink_type(),
        table
    );

    match sink.replace_all(table, rows).await {
        Ok(written) => {
            log::info!("✅ Data inserted successfully: {} rows", written);
            Ok(written)
        }
        Err(e) => {
            log::error!("❌ Publishing rewards failed: {}", e);
            Err(e)
        }
    }
}
