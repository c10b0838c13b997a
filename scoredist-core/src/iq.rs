//! IQ-style normalized score (mean 100, SD 15) from a candidate's rank.
//!
//! Used once, while preprocessing per-subject tables.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;

/// Proportions this close to 0 or 1 are reported as tails instead of being
/// pushed through the inverse CDF.
pub const TAIL_EPSILON: f64 = 1e-9;

pub const IQ_MEAN: f64 = 100.0;
pub const IQ_SD: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizedScore {
    Value(f64),
    /// Proportion outside `(ε, 1 − ε)`; written as `-`.
    Tail,
}

impl NormalizedScore {
    pub fn value(self) -> Option<f64> {
        match self {
            NormalizedScore::Value(v) => Some(v),
            NormalizedScore::Tail => None,
        }
    }
}

/// Up to seven decimals with trailing zeros (and a bare point) trimmed.
impl fmt::Display for NormalizedScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedScore::Tail => f.write_str("-"),
            NormalizedScore::Value(v) => {
                let fixed = format!("{v:.7}");
                f.write_str(fixed.trim_end_matches('0').trim_end_matches('.'))
            }
        }
    }
}

/// Share of candidates strictly below a score: `(total − at_or_above) / total`.
///
/// 0 when `total` is 0.
pub fn survival_proportion(total: u64, cumulative_at_or_above: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    total.saturating_sub(cumulative_at_or_above) as f64 / total as f64
}

/// `100 + 15 × Φ⁻¹(proportion)` inside the open tail bounds, otherwise
/// [`NormalizedScore::Tail`].
pub fn normalized_score(proportion: f64) -> NormalizedScore {
    if !(proportion > TAIL_EPSILON && proportion < 1.0 - TAIL_EPSILON) {
        return NormalizedScore::Tail;
    }
    match Normal::new(0.0, 1.0) {
        Ok(standard) => NormalizedScore::Value(IQ_MEAN + IQ_SD * standard.inverse_cdf(proportion)),
        Err(_) => NormalizedScore::Tail,
    }
}
