//! Reward allocation
//!
//! Per class: `rate = reward_pool * reward_ratio / class_total`.
//! Per address: `reward = Σ quantity(class) * rate(class)`, plain f64.
//! Per stake address: sum of the per-address rewards after rounding each to
//! 8 decimal places. The published value is rounded again to 1 decimal place
//! by the publisher.
//!
//! Float summation order can change the last bits of a sum. Addresses are
//! visited in sorted order, so identical input gives bit-identical output;
//! across differently ordered inputs only value-level agreement within
//! rounding tolerance holds.

use super::aggregator::AggregateTotals;
use super::config::SnapshotConfig;
use super::error::{Result, SnapshotError};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

/// Precision applied to each address reward before stake consolidation
pub const ADDRESS_REWARD_DECIMALS: u32 = 8;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Allocation {
    /// Reward per unit, keyed by policy id
    pub rates: BTreeMap<String, f64>,
    pub by_address: BTreeMap<String, f64>,
    pub by_stake: BTreeMap<String, f64>,
}

/// Derive the per-unit reward rate of every configured class
///
/// Must run after every class has been aggregated.
pub fn compute_rates(config: &SnapshotConfig, totals: &AggregateTotals) -> Result<BTreeMap<String, f64>> {
    let mut rates = BTreeMap::new();

    for class in &config.asset_classes {
        log::debug!("Calculating rewards per asset for policy {}", class.policy_id);

        let total = totals.class_total(&class.policy_id);
        if total == 0 {
            return Err(SnapshotError::ZeroSupplyAllocation {
                policy_id: class.policy_id.clone(),
                name: class.display_name.clone(),
            });
        }

        let rate = config.reward_pool * class.reward_ratio / total as f64;
        log::debug!("Rewards per asset for policy {}: {}", class.policy_id, rate);
        rates.insert(class.policy_id.clone(), rate);
    }

    Ok(rates)
}

/// Unrounded reward per holder address
pub fn rewards_by_address(
    totals: &AggregateTotals,
    rates: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut rewards = BTreeMap::new();

    for (address, by_class) in &totals.total_by_address_and_class {
        let reward = rewards.entry(address.clone()).or_insert(0.0);
        for (policy_id, quantity) in by_class {
            if let Some(rate) = rates.get(policy_id) {
                *reward += *quantity as f64 * rate;
            }
        }
    }

    rewards
}

/// Merge address rewards into their stake address
///
/// Each address reward is rounded to 8 decimal places before it is added.
pub fn consolidate_by_stake(
    by_address: &BTreeMap<String, f64>,
    stake_by_address: &BTreeMap<String, String>,
) -> BTreeMap<String, f64> {
    let mut by_stake = BTreeMap::new();

    for (address, reward) in by_address {
        let Some(stake) = stake_by_address.get(address) else {
            log::warn!("No stake address recorded for {}, reward dropped", address);
            continue;
        };
        *by_stake.entry(stake.clone()).or_insert(0.0) += round_dp(*reward, ADDRESS_REWARD_DECIMALS);
    }

    by_stake
}

pub fn allocate(config: &SnapshotConfig, totals: &AggregateTotals) -> Result<Allocation> {
    let rates = compute_rates(config, totals)?;
    let by_address = rewards_by_address(totals, &rates);
    let by_stake = consolidate_by_stake(&by_address, &totals.stake_by_address);

    log::info!(
        "Allocated rewards to {} addresses under {} stake addresses",
        by_address.len(),
        by_stake.len()
    );

    Ok(Allocation {
        rates,
        by_address,
        by_stake,
    })
}

/// Round to a fixed number of decimal places
///
/// Rounds the exact binary value of `value`, with ties going away from zero,
/// so `720.25` becomes `720.3` the way a fixed-point payout string shows it.
pub fn round_dp(value: f64, decimals: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}
