//! Snapshot Engine - single-pass reward run
//!
//! ```text
//! SnapshotSource::fetch (one policy at a time)
//!     ↓
//! OwnershipAggregator (eligibility filter, per-address/per-class sums)
//!     ↓
//! allocator::allocate (rates → per address → per stake)
//!     ↓
//! publisher::publish (1dp rows, full replace in the sink)
//! ```
//!
//! Classes are fetched sequentially so progress logs read in order. Any
//! error before publishing aborts the run with nothing written.

use super::address::AddressDecoder;
use super::aggregator::{AggregateTotals, OwnershipAggregator};
use super::allocator::{self, Allocation};
use super::blocklist::ExclusionList;
use super::cache::DebugDumper;
use super::config::SnapshotConfig;
use super::error::Result;
use super::publisher::{self, RewardRow, RewardSink};
use super::source::SnapshotSource;

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct SnapshotReport {
    pub totals: AggregateTotals,
    pub allocation: Allocation,
    pub rows: Vec<RewardRow>,
    /// Rows written to the sink, `None` when publishing was skipped
    pub published: Option<usize>,
}

pub struct SnapshotEngine {
    config: SnapshotConfig,
    exclusions: ExclusionList,
    source: Box<dyn SnapshotSource>,
    decoder: Box<dyn AddressDecoder>,
    verbose: bool,
    dumper: Option<DebugDumper>,
}

impl SnapshotEngine {
    pub fn new(
        config: SnapshotConfig,
        source: Box<dyn SnapshotSource>,
        decoder: Box<dyn AddressDecoder>,
    ) -> Result<Self> {
        config.validate()?;
        let exclusions = ExclusionList::new(config.excluded_addresses.iter().cloned());
        if exclusions.is_empty() {
            log::warn!("⚠️  Exclusion list is empty, every eligible holder is rewarded");
        } else {
            log::info!("🚫 Excluding {} addresses", exclusions.len());
        }

        Ok(Self {
            config,
            exclusions,
            source,
            decoder,
            verbose: false,
            dumper: None,
        })
    }

    /// Log skipped records and dump intermediate tables
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_dumper(mut self, dumper: DebugDumper) -> Self {
        self.dumper = Some(dumper);
        self
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    /// Fetch and aggregate every tracked class
    pub async fn aggregate(&self) -> Result<AggregateTotals> {
        let mut aggregator =
            OwnershipAggregator::new(self.decoder.as_ref(), &self.exclusions).verbose(self.verbose);

        for class in &self.config.asset_classes {
            log::info!(
                "Retrieving policy address list for policy: {} ({}) from {}",
                class.display_name,
                class.policy_id,
                self.source.source_type()
            );
            let records = self.source.fetch(&class.policy_id).await?;
            log::debug!("Policy address list size={}", records.len());

            let summary = aggregator.add_records(class, &records);
            log::debug!(
                "   {} records, {} eligible, {} skipped",
                summary.records,
                summary.eligible,
                summary.skipped
            );
        }

        let totals = aggregator.into_totals();
        if self.verbose {
            self.dump("asset_totals.json", &totals.total_by_class)?;
            self.dump(
                "asset_totals_by_address.json",
                &totals.total_by_address_and_class,
            )?;
        }

        Ok(totals)
    }

    pub fn allocate(&self, totals: &AggregateTotals) -> Result<Allocation> {
        let allocation = allocator::allocate(&self.config, totals)?;
        for (policy_id, rate) in &allocation.rates {
            let name = self
                .config
                .class(policy_id)
                .map_or(policy_id.as_str(), |c| c.display_name.as_str());
            log::info!("💰 {}: {:.8} per asset", name, rate);
        }

        if self.verbose {
            self.dump("rewards_by_address.json", &allocation.by_address)?;
        }
        self.dump("rewards_by_stake.json", &allocation.by_stake)?;

        Ok(allocation)
    }

    /// Full run; `sink = None` computes everything but publishes nothing
    pub async fn run(&self, sink: Option<(&dyn RewardSink, &str)>) -> Result<SnapshotReport> {
        log::info!("🚀 Starting snapshot");

        let totals = self.aggregate().await?;
        let allocation = self.allocate(&totals)?;
        let rows = publisher::build_rows(&allocation.by_stake);

        let published = match sink {
            Some((sink, table)) => Some(publisher::publish(sink, table, &rows).await?),
            None => {
                log::info!("Publishing skipped, {} rows computed", rows.len());
                None
            }
        };

        log::info!("✅ Finished snapshot");

        Ok(SnapshotReport {
            totals,
            allocation,
            rows,
            published,
        })
    }

    fn dump<T: serde::Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        if let Some(dumper) = &self.dumper {
            dumper.write_json(name, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::address::{AddressDetails, Credential};
    use crate::snapshot::config::AssetClass;
    use crate::snapshot::error::SnapshotError;
    use crate::snapshot::source::OwnershipRecord;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Serves fixed records per policy and records the fetch order
    struct FixedSource {
        records: HashMap<String, Vec<OwnershipRecord>>,
        fetched: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SnapshotSource for FixedSource {
        async fn fetch(&self, policy_id: &str) -> Result<Vec<OwnershipRecord>> {
            self.fetched.lock().unwrap().push(policy_id.to_string());
            self.records
                .get(policy_id)
                .cloned()
                .ok_or_else(|| SnapshotError::SourceUnavailable {
                    policy_id: policy_id.to_string(),
                    reason: "HTTP 503".to_string(),
                })
        }

        fn source_type(&self) -> &'static str {
            "fixed"
        }
    }

    /// `addr_<payment>_<stake>` → key credentials named after the parts
    struct NamedDecoder;

    impl AddressDecoder for NamedDecoder {
        fn decode(&self, address: &str) -> Result<AddressDetails> {
            let mut parts = address.split('_').skip(1);
            match (parts.next(), parts.next()) {
                (Some(p), Some(s)) => Ok(AddressDetails {
                    network_id: 1,
                    payment: Some(Credential::Key(p.as_bytes().to_vec())),
                    stake: Some(Credential::Key(s.as_bytes().to_vec())),
                }),
                _ => Err(SnapshotError::MalformedAddress {
                    address: address.to_string(),
                    reason: "bad test address".to_string(),
                }),
            }
        }

        fn payment_address(&self, _network_id: u8, credential: &Credential) -> Result<String> {
            Ok(format!("pay_{}", String::from_utf8_lossy(credential.hash())))
        }

        fn reward_address(&self, _network_id: u8, credential: &Credential) -> Result<String> {
            Ok(format!("stake_{}", String::from_utf8_lossy(credential.hash())))
        }
    }

    fn config() -> SnapshotConfig {
        SnapshotConfig {
            asset_classes: vec![AssetClass::new("aa", "A", 0.3), AssetClass::new("bb", "B", 0.7)],
            reward_pool: 1000.0,
            excluded_addresses: vec![],
        }
    }

    fn source(a: Vec<OwnershipRecord>, b: Vec<OwnershipRecord>) -> FixedSource {
        FixedSource {
            records: HashMap::from([("aa".to_string(), a), ("bb".to_string(), b)]),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    #[tokio::test]
    async fn test_run_without_sink() {
        let src = source(
            vec![OwnershipRecord::new("addr_x_s1", &[("aa.01", 10)])],
            vec![
                OwnershipRecord::new("addr_x_s1", &[("bb.01", 60)]),
                OwnershipRecord::new("addr_y_s2", &[("bb.01", 40)]),
                OwnershipRecord::new("addr_broken", &[("bb.01", 999)]),
            ],
        );
        let engine = SnapshotEngine::new(config(), Box::new(src), Box::new(NamedDecoder)).unwrap();

        let report = engine.run(None).await.unwrap();

        assert_eq!(report.published, None);
        assert_eq!(report.totals.class_total("bb"), 100);
        assert_eq!(
            report.rows,
            vec![
                RewardRow { stake: "stake_s1".to_string(), reward: 720.0 },
                RewardRow { stake: "stake_s2".to_string(), reward: 280.0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_classes_fetched_in_config_order() {
        let src = source(
            vec![OwnershipRecord::new("addr_x_s1", &[("aa.01", 1)])],
            vec![OwnershipRecord::new("addr_x_s1", &[("bb.01", 1)])],
        );
        let fetched = Arc::clone(&src.fetched);
        let engine = SnapshotEngine::new(config(), Box::new(src), Box::new(NamedDecoder)).unwrap();

        engine.aggregate().await.unwrap();
        assert_eq!(*fetched.lock().unwrap(), vec!["aa".to_string(), "bb".to_string()]);
    }

    #[tokio::test]
    async fn test_source_failure_aborts() {
        let src = FixedSource {
            records: HashMap::from([(
                "aa".to_string(),
                vec![OwnershipRecord::new("addr_x_s1", &[("aa.01", 1)])],
            )]),
            fetched: Arc::new(Mutex::new(Vec::new())),
        };
        let engine = SnapshotEngine::new(config(), Box::new(src), Box::new(NamedDecoder)).unwrap();

        let err = engine.run(None).await.unwrap_err();
        assert!(matches!(err, SnapshotError::SourceUnavailable { policy_id, .. } if policy_id == "bb"));
    }

    #[tokio::test]
    async fn test_zero_supply_aborts() {
        let src = source(
            vec![OwnershipRecord::new("addr_x_s1", &[("aa.01", 1)])],
            vec![OwnershipRecord::new("addr_x_s1", &[("cc.01", 5)])],
        );
        let engine = SnapshotEngine::new(config(), Box::new(src), Box::new(NamedDecoder)).unwrap();

        let err = engine.run(None).await.unwrap_err();
        assert!(matches!(err, SnapshotError::ZeroSupplyAllocation { .. }));
    }

    #[tokio::test]
    async fn test_exclusion_by_derived_stake() {
        let mut cfg = config();
        cfg.excluded_addresses = vec!["stake_s2".to_string()];
        let src = source(
            vec![OwnershipRecord::new("addr_x_s1", &[("aa.01", 10)])],
            vec![
                OwnershipRecord::new("addr_x_s1", &[("bb.01", 60)]),
                OwnershipRecord::new("addr_y_s2", &[("bb.01", 40)]),
            ],
        );
        let engine = SnapshotEngine::new(cfg, Box::new(src), Box::new(NamedDecoder)).unwrap();

        let report = engine.run(None).await.unwrap();
        assert_eq!(report.totals.class_total("bb"), 60);
        assert_eq!(
            report.rows,
            vec![RewardRow { stake: "stake_s1".to_string(), reward: 1000.0 }]
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config();
        cfg.asset_classes.clear();
        let src = source(vec![], vec![]);
        assert!(SnapshotEngine::new(cfg, Box::new(src), Box::new(NamedDecoder)).is_err());
    }
}
