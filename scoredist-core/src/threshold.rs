//! Threshold pass-rate counting.
//!
//! `pass_rate_percent` is `100 − count/total × 100`: the share of candidates
//! *below* the threshold, which is how the published charts label it.

use serde::{Deserialize, Serialize};

use crate::binning::FLOAT_TOLERANCE;
use crate::domain::Distribution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdMode {
    /// Buckets with key ≥ threshold.
    AtOrAbove,
    /// The single bucket whose key equals the threshold.
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStat {
    pub threshold: f64,
    pub mode: ThresholdMode,
    pub count: u64,
    pub pass_rate_percent: f64,
}

/// Fractions of the domain maximum used by the at-or-above ladder.
pub const LADDER_FRACTIONS: [f64; 5] = [0.5, 0.6, 0.7, 0.8, 0.9];

/// Fractions used by the regional table, which also reports the maximum.
pub const REGIONAL_FRACTIONS: [f64; 6] = [0.5, 0.6, 0.7, 0.8, 0.9, 1.0];

/// Count and pass rate for one threshold.
///
/// A distribution with no candidates yields count 0 and pass rate 0.
pub fn threshold_stat(distribution: &Distribution, threshold: f64, mode: ThresholdMode) -> ThresholdStat {
    let count = distribution
        .buckets()
        .iter()
        .filter(|b| match mode {
            ThresholdMode::Exact => (b.score - threshold).abs() <= FLOAT_TOLERANCE,
            ThresholdMode::AtOrAbove => b.score >= threshold - FLOAT_TOLERANCE,
        })
        .map(|b| b.count)
        .sum();

    let total = distribution.total();
    let pass_rate_percent = if total == 0 {
        0.0
    } else {
        100.0 - count as f64 / total as f64 * 100.0
    };

    ThresholdStat {
        threshold,
        mode,
        count,
        pass_rate_percent,
    }
}

/// Five at-or-above thresholds at 50–90% of the domain maximum, then the
/// exact maximum.
pub fn threshold_ladder(distribution: &Distribution) -> Vec<ThresholdStat> {
    let max = distribution.domain_max();
    LADDER_FRACTIONS
        .iter()
        .map(|f| threshold_stat(distribution, f * max, ThresholdMode::AtOrAbove))
        .chain(std::iter::once(threshold_stat(distribution, max, ThresholdMode::Exact)))
        .collect()
}

/// At-or-above counts at 50–100% of `theoretical_max`, as used by the
/// per-province table.
pub fn regional_thresholds(distribution: &Distribution, theoretical_max: f64) -> Vec<ThresholdStat> {
    REGIONAL_FRACTIONS
        .iter()
        .map(|f| threshold_stat(distribution, f * theoretical_max, ThresholdMode::AtOrAbove))
        .collect()
}
