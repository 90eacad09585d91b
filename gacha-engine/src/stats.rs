//! Aggregate statistics over draw history and the pull-count calculator.
//!
//! Expected rates prefer the weight snapshotted on each outcome over the live
//! table, so switching presets does not rewrite what past draws were worth.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{GachaError, Result};
use crate::history::History;
use crate::numbers::{ceil_f64_to_u64, ratio, u64_to_f64};
use crate::pity::PityCounter;
use crate::tiers::TierTable;

/// Observed versus expected figures for one tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierStats {
    pub tier_id: String,
    pub name: String,
    pub color: String,
    pub count: u64,
    pub actual_rate: f64,
    pub expected_rate: f64,
}

impl TierStats {
    /// Observed rate over expected rate; 1.0 means exactly on expectation.
    #[must_use]
    pub fn luck_ratio(&self) -> f64 {
        if self.expected_rate <= 0.0 {
            return 0.0;
        }
        self.actual_rate / self.expected_rate
    }
}

/// Per-tier breakdown plus the draws that matched no tier of the table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub tiers: Vec<TierStats>,
    /// Historical draws whose tier id is absent from the table.
    pub unmatched: u64,
}

/// Headline numbers for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_pulls: u64,
    pub total_spend: f64,
    pub pity: PityCounter,
    pub breakdown: Breakdown,
}

/// Count draws per tier of `table`, rarest first.
#[must_use]
pub fn tier_breakdown(history: &History, table: &TierTable) -> Breakdown {
    let mut counts: HashMap<&str, (u64, f64)> = HashMap::new();
    for outcome in history {
        let entry = counts.entry(outcome.tier_id.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += outcome.weight;
    }

    let total = u64::try_from(history.len()).unwrap_or(u64::MAX);
    let mut matched = 0_u64;
    let tiers = table
        .ranked()
        .map(|tier| {
            let (count, weight_sum) = counts.get(tier.id.as_str()).copied().unwrap_or((0, 0.0));
            matched += count;
            let expected_rate = if count > 0 {
                weight_sum / u64_to_f64(count)
            } else {
                tier.weight
            };
            TierStats {
                tier_id: tier.id.clone(),
                name: tier.name.clone(),
                color: tier.color.clone(),
                count,
                actual_rate: ratio(count, total),
                expected_rate,
            }
        })
        .collect();

    Breakdown {
        tiers,
        unmatched: total.saturating_sub(matched),
    }
}

/// Summary for a session state against the given table.
#[must_use]
pub fn summarize(
    pull_count: u64,
    pity: PityCounter,
    history: &History,
    table: &TierTable,
    cost_per_pull: f64,
) -> StatsSummary {
    StatsSummary {
        total_pulls: pull_count,
        total_spend: u64_to_f64(pull_count) * cost_per_pull,
        pity,
        breakdown: tier_breakdown(history, table),
    }
}

/// Pearson chi-square statistic of observed counts against expected
/// probabilities over `total` trials. Categories with zero expectation are skipped.
#[must_use]
pub fn chi_square(observed: &[u64], expected_probabilities: &[f64], total: u64) -> f64 {
    let total = u64_to_f64(total);
    observed
        .iter()
        .zip(expected_probabilities)
        .filter(|(_, p)| **p > 0.0)
        .map(|(count, p)| {
            let expected = total * p;
            let diff = u64_to_f64(*count) - expected;
            diff * diff / expected
        })
        .sum()
}

/// Result of the pull-count calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "pulls")]
pub enum PullEstimate {
    Pulls(u64),
    /// No finite number of pulls reaches the requested certainty.
    Unbounded,
}

impl PullEstimate {
    #[must_use]
    pub const fn pulls(self) -> Option<u64> {
        match self {
            Self::Pulls(n) => Some(n),
            Self::Unbounded => None,
        }
    }

    /// Spend needed for the estimate; `None` when unbounded.
    #[must_use]
    pub fn cost(self, cost_per_pull: f64) -> Option<f64> {
        self.pulls().map(|n| u64_to_f64(n) * cost_per_pull)
    }
}

/// Minimum pulls `n` such that `1 - (1 - weight)^n >= percent / 100`.
///
/// Models the pity-free geometric distribution: guarantees are ignored, so the
/// figure is an upper-bound approximation when pity is enabled.
///
/// # Errors
///
/// Returns [`GachaError::InvalidArgument`] when `weight` is outside (0, 1] or
/// `percent` is NaN.
pub fn pulls_for_probability(weight: f64, percent: f64) -> Result<PullEstimate> {
    if !weight.is_finite() || weight <= 0.0 || weight > 1.0 {
        return Err(GachaError::InvalidArgument(format!(
            "tier weight must be in (0, 1] (got {weight})"
        )));
    }
    if percent.is_nan() {
        return Err(GachaError::InvalidArgument(
            "target probability must be a number".into(),
        ));
    }
    if percent >= 100.0 {
        return Ok(PullEstimate::Unbounded);
    }
    if percent <= 0.0 {
        return Ok(PullEstimate::Pulls(0));
    }
    if weight >= 1.0 {
        return Ok(PullEstimate::Pulls(1));
    }
    let target = percent / 100.0;
    let n = (1.0 - target).ln() / (1.0 - weight).ln();
    Ok(PullEstimate::Pulls(ceil_f64_to_u64(n)))
}

/// Calculator lookup by tier id.
///
/// # Errors
///
/// Returns [`GachaError::UnknownTier`] when the table has no such tier, or the
/// errors of [`pulls_for_probability`].
pub fn estimate_for_tier(table: &TierTable, tier_id: &str, percent: f64) -> Result<PullEstimate> {
    let tier = table
        .find(tier_id)
        .ok_or_else(|| GachaError::UnknownTier(tier_id.to_string()))?;
    pulls_for_probability(tier.weight, percent)
}
