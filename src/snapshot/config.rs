//! Static snapshot configuration
//!
//! Tracked asset classes, the reward pool for the period and the address
//! exclusion list. Built-in defaults carry the production values; a JSON
//! file with the same shape can replace them (`--config`).

use super::error::{Result, SnapshotError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const DISCO_NFT_POLICY_ID: &str = "d0112837f8f856b2ca14f69b375bc394e73d146fdadcc993bb993779";
pub const DISCO_TOKEN_POLICY_ID: &str = "5612bee388219c1b76fd527ed0fa5aa1d28652838bcab4ee4ee63197";

/// Reward pool distributed per snapshot period
pub const DEFAULT_REWARD_POOL: f64 = 1828919.06301369;

const DEFAULT_EXCLUDED_ADDRESSES: &[&str] = &[
    // Discoin treasury
    "addr1xy306nxnhkseaw4rlgfa55skyd342z4mtq5k2j4jux7k4kfzl4xd80dpn6a287snmffpvgmr259tkkpfv49t9cdadtvssms0kr",
    // Discatalyst treasury
    "addr1xxy8exmrl37hk2pyct5mgc45tjh53udzfhqfxavzlc743vug0jdk8lra0v5zfshfk33tgh90frc6ynwqjd6c9l3atzesqljg09",
    // Discoin rewards wallet
    "addr1xy37w4aqgukmhljn229a4m0ccsk3y49x40tfrnj3u8gw96pruat6q3edh0l9x55tmtkl33pdzf22d27kj889rcwsut5qaa2r64",
    // Vending machine wallets
    "stake1uyq4g3vqed986la2h7ywavup76xjr0kpfew30u99quw6w4qjxjucm",
    "addr1q83r3xqr4teazjd9z0qd8z8r9a9qslwpm6g9ugz3tu0j7mxjj9djsz0020h68nz3rxknzdh93nryqzhq6h9z0nnzf0rsc4p3x5",
    "stake1u8ffzkegp8h48mare3g3ntf3xmjce3jqptsdtj38ee3yh3c9t4uum",
    // JPG Store contract
    "addr1w999n67e86jn6xal07pzxtrmqynspgx0fwmcmpua4wc6yzsxpljz3",
    "addr1zxj47sy4qxlktqzmkrw8dahe46gtv8seakrshsqz26qnvzypw288a4x0xf8pxgcntelxmyclq83s0ykeehchz2wtspksr3q9nx",
    // JPG Store V2 contract
    "addr1zxgx3far7qygq0k6epa0zcvcvrevmn0ypsnfsue94nsn3tvpw288a4x0xf8pxgcntelxmyclq83s0ykeehchz2wtspks905plm",
    // Minswap pool contract
    "addr1z8snz7c4974vzdpxu65ruphl3zjdvtxw8strf2c2tmqnxz2j2c79gy9l76sdg0xwhd7r0c0kna0tycz4y5s6mlenh8pq0xmsha",
    // Minswap order contract
    "addr1wxn9efv2f6w82hagxqtn62ju4m293tqvw0uhmdl64ch8uwc0h43gt",
    "addr1zxn9efv2f6w82hagxqtn62ju4m293tqvw0uhmdl64ch8uw6j2c79gy9l76sdg0xwhd7r0c0kna0tycz4y5s6mlenh8pq6s3z70",
    // Unknown contract
    "addr1w9yr0zr530tp9yzrhly8lw5upddu0eym3yh0mjwa0qlr9pgmkzgv0",
];

/// One tracked asset family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetClass {
    pub policy_id: String,
    pub display_name: String,
    /// Share of the reward pool, in (0, 1]
    pub reward_ratio: f64,
}

impl AssetClass {
    pub fn new(policy_id: &str, display_name: &str, reward_ratio: f64) -> Self {
        Self {
            policy_id: policy_id.to_string(),
            display_name: display_name.to_string(),
            reward_ratio,
        }
    }

    /// Whether an asset unit (policy id + asset name) belongs to this class
    pub fn owns_unit(&self, unit: &str) -> bool {
        unit.starts_with(&self.policy_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotConfig {
    pub asset_classes: Vec<AssetClass>,
    pub reward_pool: f64,
    /// Exact-match address strings (payment, stake or raw address)
    pub excluded_addresses: Vec<String>,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            asset_classes: vec![
                AssetClass::new(DISCO_NFT_POLICY_ID, "Disco Solaris NFT", 0.3),
                AssetClass::new(DISCO_TOKEN_POLICY_ID, "discoin", 0.7),
            ],
            reward_pool: DEFAULT_REWARD_POOL,
            excluded_addresses: DEFAULT_EXCLUDED_ADDRESSES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl SnapshotConfig {
    /// Load from a JSON file and validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            SnapshotError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: SnapshotConfig = serde_json::from_str(&json)?;
        config.validate()?;

        log::info!("Loaded snapshot configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.asset_classes.is_empty() {
            return Err(SnapshotError::InvalidConfig(
                "at least one asset class is required".to_string(),
            ));
        }

        if !self.reward_pool.is_finite() || self.reward_pool <= 0.0 {
            return Err(SnapshotError::InvalidConfig(format!(
                "reward_pool must be a positive number, got {}",
                self.reward_pool
            )));
        }

        let mut seen = HashSet::new();
        for class in &self.asset_classes {
            if class.policy_id.is_empty() {
                return Err(SnapshotError::InvalidConfig(format!(
                    "asset class '{}' has an empty policy id",
                    class.display_name
                )));
            }
            if !seen.insert(class.policy_id.as_str()) {
                return Err(SnapshotError::InvalidConfig(format!(
                    "duplicate policy id {}",
                    class.policy_id
                )));
            }
            if !(class.reward_ratio > 0.0 && class.reward_ratio <= 1.0) {
                return Err(SnapshotError::InvalidConfig(format!(
                    "reward_ratio for {} must be in (0, 1], got {}",
                    class.display_name, class.reward_ratio
                )));
            }
        }

        let ratio_sum: f64 = self.asset_classes.iter().map(|c| c.reward_ratio).sum();
        if (ratio_sum - 1.0).abs() > 1e-9 {
            log::warn!(
                "Asset class reward ratios sum to {} (expected 1.0), pool will not be fully distributed or will be exceeded",
                ratio_sum
            );
        }

        Ok(())
    }

    pub fn class(&self, policy_id: &str) -> Option<&AssetClass> {
        self.asset_classes.iter().find(|c| c.policy_id == policy_id)
    }
}
