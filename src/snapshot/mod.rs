//! Holder snapshot and reward allocation
//!
//! One run per invocation, strictly forward:
//!
//! ```text
//! SnapshotSource (Kupo or policy cache)
//!     ↓ OwnershipRecord per unspent output
//! OwnershipAggregator → AggregateTotals
//!     ↓
//! allocator → Allocation (rates, per address, per stake)
//!     ↓
//! publisher → RewardRow → RewardSink (SQLite, transactional replace)
//! ```
//!
//! ## Module Organization
//!
//! - `config` - asset classes, reward pool, exclusion list
//! - `source` / `kupo` / `cache` - where ownership records come from
//! - `address` - Shelley address credentials
//! - `blocklist` - exact-match address exclusion
//! - `aggregator` - eligibility filter and per-class sums
//! - `allocator` - reward rates and stake consolidation
//! - `publisher` / `db` - rounded rows and the SQLite sink
//! - `engine` - orchestration of one run

pub mod address;
pub mod aggregator;
pub mod allocator;
pub mod blocklist;
pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod kupo;
pub mod publisher;
pub mod source;

pub use address::{AddressDecoder, AddressDetails, CardanoAddressDecoder, Credential};
pub use aggregator::{AggregateTotals, OwnershipAggregator, SkipReason};
pub use allocator::Allocation;
pub use blocklist::ExclusionList;
pub use cache::{DebugDumper, PolicyCache};
pub use config::{AssetClass, SnapshotConfig};
pub use db::SqliteRewardSink;
pub use engine::{SnapshotEngine, SnapshotReport};
pub use error::{Result, SnapshotError};
pub use kupo::KupoClient;
pub use publisher::{RewardRow, RewardSink};
pub use source::{OwnershipRecord, SnapshotSource};
