//! Nearest-rank percentile lookup over an at-or-above cumulative distribution,
//! and the fixed z-score ladder built on it.

use serde::{Deserialize, Serialize};

use crate::domain::CumulativeDistribution;

/// One rung of the z-score ladder: standard-normal z, its percentile label,
/// and the lower-tail probability `p`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZLevel {
    pub z: i8,
    pub label: &'static str,
    pub probability: f64,
}

/// The seven reported levels, highest first.
pub const Z_LEVELS: [ZLevel; 7] = [
    ZLevel { z: 3, label: "99.87", probability: 0.9987 },
    ZLevel { z: 2, label: "97.72", probability: 0.9772 },
    ZLevel { z: 1, label: "84.13", probability: 0.8413 },
    ZLevel { z: 0, label: "50", probability: 0.5 },
    ZLevel { z: -1, label: "15.87", probability: 0.1587 },
    ZLevel { z: -2, label: "2.28", probability: 0.0228 },
    ZLevel { z: -3, label: "0.13", probability: 0.0013 },
];

impl ZLevel {
    /// Cumulative at-or-above count a candidate at this level would see.
    pub fn target(&self, total: u64) -> f64 {
        total as f64 * (1.0 - self.probability)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileResult {
    pub z: i8,
    pub label: String,
    pub score: f64,
}

/// Bucket key whose cumulative count is closest to `target`.
///
/// Ties resolve to the first such bucket in ascending key order, i.e. the
/// lowest score. `None` only for an empty cumulative distribution.
pub fn percentile_score(cumulative: &CumulativeDistribution, target: f64) -> Option<f64> {
    let mut best: Option<(f64, f64)> = None;
    for entry in cumulative.entries() {
        let distance = (entry.cumulative as f64 - target).abs();
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((entry.score, distance)),
        }
    }
    best.map(|(score, _)| score)
}

/// Percentile scores at every level of [`Z_LEVELS`].
pub fn z_score_stats(cumulative: &CumulativeDistribution) -> Vec<PercentileResult> {
    let total = cumulative.total();
    Z_LEVELS
        .iter()
        .filter_map(|level| {
            percentile_score(cumulative, level.target(total)).map(|score| PercentileResult {
                z: level.z,
                label: level.label.to_string(),
                score,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, RawPair};

    fn cumulative(pairs: &[(f64, u64)], step: f64, max: f64) -> CumulativeDistribution {
        let raw: Vec<RawPair> = pairs.iter().map(|&(s, c)| RawPair::new(s, c)).collect();
        aggregate(&raw, step, max).unwrap().cumulative
    }

    #[test]
    fn finds_nearest_cumulative_count() {
        // cumulative: 0 → 100, 1 → 60, 2 → 20
        let c = cumulative(&[(0.0, 40), (1.0, 40), (2.0, 20)], 1.0, 2.0);
        assert_eq!(percentile_score(&c, 55.0), Some(1.0));
        assert_eq!(percentile_score(&c, 95.0), Some(0.0));
        assert_eq!(percentile_score(&c, 0.0), Some(2.0));
    }

    #[test]
    fn ties_resolve_to_lowest_key() {
        // cumulative: 0 → 10, 1 → 10, 2 → 0
        let c = cumulative(&[(0.0, 0), (1.0, 10), (2.0, 0)], 1.0, 2.0);
        assert_eq!(percentile_score(&c, 10.0), Some(0.0));
        // equidistant between 10 (keys 0, 1) and 0 (key 2)
        assert_eq!(percentile_score(&c, 5.0), Some(0.0));
    }

    #[test]
    fn empty_cumulative_has_no_percentile() {
        let c = CumulativeDistribution::from_distribution(&crate::domain::Distribution::new(
            1.0,
            1.0,
            Vec::new(),
        ));
        assert_eq!(percentile_score(&c, 1.0), None);
        assert!(z_score_stats(&c).is_empty());
    }

    #[test]
    fn ladder_is_ordered_and_labelled() {
        let pairs: Vec<(f64, u64)> = (0..=10).map(|s| (s as f64, 100)).collect();
        let c = cumulative(&pairs, 1.0, 10.0);
        let stats = z_score_stats(&c);
        assert_eq!(stats.len(), 7);
        assert_eq!(stats[0].label, "99.87");
        assert_eq!(stats[3].z, 0);
        // median of a uniform 0..=10 ladder
        assert_eq!(stats[3].score, 5.0);
        for pair in stats.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}
