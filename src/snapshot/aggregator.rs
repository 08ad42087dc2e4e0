//! Ownership aggregation
//!
//! Filters indexer records down to plain wallet holders and sums their
//! quantities per address and per asset class.
//!
//! Eligibility, checked in order (first failure skips the whole record):
//! 1. address present and starts with `addr`
//! 2. address decodes, with both payment and stake credentials
//! 3. raw, payment and reward address are not on the exclusion list
//! 4. neither credential is a script

use super::address::{AddressDecoder, AddressDetails};
use super::blocklist::ExclusionList;
use super::config::AssetClass;
use super::source::OwnershipRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

const PAYMENT_ADDRESS_PREFIX: &str = "addr";

/// Per-run holder tables
///
/// Keys are policy ids. `BTreeMap` keeps iteration (and therefore float
/// summation in the allocator) deterministic for a given input.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateTotals {
    pub total_by_class: BTreeMap<String, u128>,
    pub total_by_address_and_class: BTreeMap<String, BTreeMap<String, u128>>,
    /// Reward address each eligible holder address decoded to
    #[serde(skip)]
    pub stake_by_address: BTreeMap<String, String>,
}

impl AggregateTotals {
    pub fn class_total(&self, policy_id: &str) -> u128 {
        self.total_by_class.get(policy_id).copied().unwrap_or(0)
    }

    pub fn holder_count(&self) -> usize {
        self.total_by_address_and_class.len()
    }
}

/// Why a record was left out of aggregation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NotPaymentAddress,
    Undecodable(String),
    MissingCredential,
    Excluded(String),
    ScriptCredential,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotPaymentAddress => write!(f, "not a payment address"),
            SkipReason::Undecodable(reason) => write!(f, "undecodable: {}", reason),
            SkipReason::MissingCredential => write!(f, "missing payment or stake credential"),
            SkipReason::Excluded(matched) => write!(f, "excluded ({})", matched),
            SkipReason::ScriptCredential => write!(f, "script credential"),
        }
    }
}

/// Address that passed every eligibility check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleHolder {
    pub address: String,
    pub reward_address: String,
}

/// Result of aggregating one asset class
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassSummary {
    pub records: usize,
    pub eligible: usize,
    pub skipped: usize,
    pub supply: u128,
}

pub struct OwnershipAggregator<'a> {
    decoder: &'a dyn AddressDecoder,
    exclusions: &'a ExclusionList,
    verbose: bool,
    totals: AggregateTotals,
}

impl<'a> OwnershipAggregator<'a> {
    pub fn new(decoder: &'a dyn AddressDecoder, exclusions: &'a ExclusionList) -> Self {
        Self {
            decoder,
            exclusions,
            verbose: false,
            totals: AggregateTotals::default(),
        }
    }

    /// Log every skipped record at debug level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run the eligibility filter on one address
    pub fn check_eligibility(&self, address: Option<&str>) -> Result<EligibleHolder, SkipReason> {
        let address = match address {
            Some(a) if !a.is_empty() && a.starts_with(PAYMENT_ADDRESS_PREFIX) => a,
            _ => return Err(SkipReason::NotPaymentAddress),
        };

        let AddressDetails {
            network_id,
            payment,
            stake,
        } = self
            .decoder
            .decode(address)
            .map_err(|e| SkipReason::Undecodable(e.to_string()))?;

        let (payment, stake) = match (payment, stake) {
            (Some(p), Some(s)) => (p, s),
            _ => return Err(SkipReason::MissingCredential),
        };

        let payment_address = self
            .decoder
            .payment_address(network_id, &payment)
            .map_err(|e| SkipReason::Undecodable(e.to_string()))?;
        let reward_address = self
            .decoder
            .reward_address(network_id, &stake)
            .map_err(|e| SkipReason::Undecodable(e.to_string()))?;

        if let Some(matched) = self.exclusions.first_match(&[
            payment_address.as_str(),
            reward_address.as_str(),
            address,
        ]) {
            return Err(SkipReason::Excluded(matched.to_string()));
        }

        if payment.is_script() || stake.is_script() {
            return Err(SkipReason::ScriptCredential);
        }

        Ok(EligibleHolder {
            address: address.to_string(),
            reward_address,
        })
    }

    /// Fold one class's records into the running tables
    pub fn add_records(&mut self, class: &AssetClass, records: &[OwnershipRecord]) -> ClassSummary {
        let mut summary = ClassSummary {
            records: records.len(),
            ..Default::default()
        };

        for record in records {
            let holder = match self.check_eligibility(record.address.as_deref()) {
                Ok(holder) => holder,
                Err(reason) => {
                    summary.skipped += 1;
                    if self.verbose {
                        log::debug!(
                            "Skipping address {}: {}",
                            record.address.as_deref().unwrap_or("<none>"),
                            reason
                        );
                    }
                    continue;
                }
            };
            summary.eligible += 1;

            for (unit, quantity) in &record.asset_balances {
                if !class.owns_unit(unit) {
                    continue;
                }
                let quantity = u128::from(*quantity);

                *self
                    .totals
                    .total_by_class
                    .entry(class.policy_id.clone())
                    .or_insert(0) += quantity;
                *self
                    .totals
                    .total_by_address_and_class
                    .entry(holder.address.clone())
                    .or_default()
                    .entry(class.policy_id.clone())
                    .or_insert(0) += quantity;
                summary.supply += quantity;
            }

            if self.totals.total_by_address_and_class.contains_key(&holder.address) {
                self.totals
                    .stake_by_address
                    .entry(holder.address)
                    .or_insert(holder.reward_address);
            }
        }

        log::info!(
            "Found {} assets ({}) on {} addresses",
            self.totals.class_total(&class.policy_id),
            class.policy_id,
            self.totals.holder_count()
        );

        summary
    }

    pub fn into_totals(self) -> AggregateTotals {
        self.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::address::{
        CardanoAddressDecoder, Credential, CREDENTIAL_HASH_LEN, MAINNET_NETWORK_ID,
    };

    const POLICY_A: &str = "aaaa";
    const POLICY_B: &str = "bbbb";

    fn key(byte: u8) -> Credential {
        Credential::Key(vec![byte; CREDENTIAL_HASH_LEN])
    }

    fn script(byte: u8) -> Credential {
        Credential::Script(vec![byte; CREDENTIAL_HASH_LEN])
    }

    fn base(payment: &Credential, stake: &Credential) -> String {
        CardanoAddressDecoder::new()
            .base_address(MAINNET_NETWORK_ID, payment, stake)
            .unwrap()
    }

    fn class_a() -> AssetClass {
        AssetClass::new(POLICY_A, "A", 0.3)
    }

    #[test]
    fn test_sums_sub_identifiers_under_one_class() {
        let decoder = CardanoAddressDecoder::new();
        let exclusions = ExclusionList::default();
        let mut aggregator = OwnershipAggregator::new(&decoder, &exclusions);

        let x = base(&key(1), &key(2));
        let records = vec![
            OwnershipRecord::new(&x, &[("aaaa.01", 1), ("aaaa.02", 1), ("bbbb.01", 50)]),
            OwnershipRecord::new(&x, &[("aaaa.03", 3)]),
        ];

        let summary = aggregator.add_records(&class_a(), &records);
        assert_eq!(summary.eligible, 2);
        assert_eq!(summary.supply, 5);

        let totals = aggregator.into_totals();
        assert_eq!(totals.class_total(POLICY_A), 5);
        assert_eq!(totals.class_total(POLICY_B), 0);
        assert_eq!(totals.total_by_address_and_class[&x][POLICY_A], 5);
        assert!(!totals.total_by_address_and_class[&x].contains_key(POLICY_B));
    }

    #[test]
    fn test_non_payment_addresses_skipped() {
        let decoder = CardanoAddressDecoder::new();
        let exclusions = ExclusionList::default();
        let aggregator = OwnershipAggregator::new(&decoder, &exclusions);

        assert_eq!(
            aggregator.check_eligibility(None),
            Err(SkipReason::NotPaymentAddress)
        );
        assert_eq!(
            aggregator.check_eligibility(Some("")),
            Err(SkipReason::NotPaymentAddress)
        );
        assert_eq!(
            aggregator.check_eligibility(Some("Ae2tdPwUPEZ4YjgvykNpoFeYUxoyhNj2kg8KfKWN2FizsSpLUPv68MpTVDo")),
            Err(SkipReason::NotPaymentAddress)
        );
        assert!(matches!(
            aggregator.check_eligibility(Some("addr1broken")),
            Err(SkipReason::Undecodable(_))
        ));
    }

    #[test]
    fn test_enterprise_address_skipped() {
        let decoder = CardanoAddressDecoder::new();
        let exclusions = ExclusionList::default();
        let aggregator = OwnershipAggregator::new(&decoder, &exclusions);

        let enterprise = decoder.payment_address(MAINNET_NETWORK_ID, &key(7)).unwrap();
        assert_eq!(
            aggregator.check_eligibility(Some(&enterprise)),
            Err(SkipReason::MissingCredential)
        );
    }

    #[test]
    fn test_exclusion_by_raw_payment_and_stake() {
        let decoder = CardanoAddressDecoder::new();

        let raw = base(&key(1), &key(2));
        let payment_only = decoder.payment_address(MAINNET_NETWORK_ID, &key(3)).unwrap();
        let via_payment = base(&key(3), &key(4));
        let reward = decoder.reward_address(MAINNET_NETWORK_ID, &key(6)).unwrap();
        let via_stake = base(&key(5), &key(6));
        let allowed = base(&key(8), &key(9));

        let exclusions = ExclusionList::new([raw.clone(), payment_only, reward]);
        let mut aggregator = OwnershipAggregator::new(&decoder, &exclusions);

        let records: Vec<_> = [&raw, &via_payment, &via_stake, &allowed]
            .iter()
            .map(|a| OwnershipRecord::new(a, &[("aaaa.01", 100)]))
            .collect();

        let summary = aggregator.add_records(&class_a(), &records);
        assert_eq!(summary.skipped, 3);

        let totals = aggregator.into_totals();
        assert_eq!(totals.class_total(POLICY_A), 100);
        assert_eq!(totals.holder_count(), 1);
        assert!(totals.total_by_address_and_class.contains_key(&allowed));
    }

    #[test]
    fn test_script_credentials_skipped() {
        let decoder = CardanoAddressDecoder::new();
        let exclusions = ExclusionList::default();
        let mut aggregator = OwnershipAggregator::new(&decoder, &exclusions);

        let script_payment = base(&script(1), &key(2));
        let script_stake = base(&key(3), &script(4));
        assert_eq!(
            aggregator.check_eligibility(Some(&script_payment)),
            Err(SkipReason::ScriptCredential)
        );

        let records = vec![
            OwnershipRecord::new(&script_payment, &[("aaaa.01", 10)]),
            OwnershipRecord::new(&script_stake, &[("aaaa.01", 10)]),
        ];
        aggregator.add_records(&class_a(), &records);

        let totals = aggregator.into_totals();
        assert_eq!(totals.class_total(POLICY_A), 0);
        assert!(totals.total_by_address_and_class.is_empty());
        assert!(totals.stake_by_address.is_empty());
    }

    #[test]
    fn test_sum_consistency_across_classes() {
        let decoder = CardanoAddressDecoder::new();
        let exclusions = ExclusionList::default();
        let mut aggregator = OwnershipAggregator::new(&decoder, &exclusions).verbose(true);

        let holders: Vec<String> = (1..=5u8).map(|i| base(&key(i), &key(i + 100))).collect();
        let class_b = AssetClass::new(POLICY_B, "B", 0.7);

        let a_records: Vec<_> = holders
            .iter()
            .enumerate()
            .map(|(i, h)| OwnershipRecord::new(h, &[("aaaa.01", i as u64 + 1)]))
            .collect();
        let b_records: Vec<_> = holders
            .iter()
            .enumerate()
            .map(|(i, h)| OwnershipRecord::new(h, &[("bbbb.01", 10 * (i as u64 + 1)), ("bbbb.02", 1)]))
            .collect();

        aggregator.add_records(&class_a(), &a_records);
        aggregator.add_records(&class_b, &b_records);
        let totals = aggregator.into_totals();

        for policy in [POLICY_A, POLICY_B] {
            let sum: u128 = totals
                .total_by_address_and_class
                .values()
                .filter_map(|by_class| by_class.get(policy))
                .sum();
            assert_eq!(sum, totals.class_total(policy));
        }
        assert_eq!(totals.class_total(POLICY_A), 15);
        assert_eq!(totals.class_total(POLICY_B), 155);
        assert_eq!(totals.stake_by_address.len(), 5);
    }
}
