//! Frequency and at-or-above cumulative distributions over a score grid.

use serde::{Deserialize, Serialize};

/// Exact bucket identity, stored in thousandths of a point.
///
/// Scores on every supported grid (steps of 0.2, 0.25, 0.05 and the domain
/// maxima) are exact multiples of 0.001, so comparing keys never depends on
/// floating-point drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BucketKey(i64);

impl BucketKey {
    const SCALE: f64 = 1000.0;

    pub fn from_score(score: f64) -> Self {
        Self((score * Self::SCALE).round() as i64)
    }

    pub fn score(self) -> f64 {
        self.0 as f64 / Self::SCALE
    }
}

/// Candidates whose raw score falls into one bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub score: f64,
    pub count: u64,
}

/// Zero-filled bucket sequence spanning `[0, domain_max]`.
///
/// Built by [`crate::aggregate::aggregate`]; keys are strictly increasing and
/// every grid position is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    step: f64,
    domain_max: f64,
    buckets: Vec<ScoreBucket>,
    total: u64,
}

impl Distribution {
    pub(crate) fn new(step: f64, domain_max: f64, buckets: Vec<ScoreBucket>) -> Self {
        let total = buckets.iter().map(|b| b.count).sum();
        Self {
            step,
            domain_max,
            buckets,
            total,
        }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    pub fn buckets(&self) -> &[ScoreBucket] {
        &self.buckets
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of candidates across all buckets.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Count-weighted mean of the bucket keys. 0.0 when there are no candidates.
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let weighted: f64 = self
            .buckets
            .iter()
            .map(|b| b.score * b.count as f64)
            .sum();
        weighted / self.total as f64
    }

    /// Largest single-bucket count.
    pub fn max_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).max().unwrap_or(0)
    }

    /// The highest bucket that holds at least one candidate.
    pub fn highest_populated(&self) -> Option<ScoreBucket> {
        self.buckets.iter().rev().find(|b| b.count > 0).copied()
    }

    /// At-or-above cumulation, folded from the top of the domain downward.
    pub fn cumulative(&self) -> CumulativeDistribution {
        CumulativeDistribution::from_distribution(self)
    }
}

/// Number of candidates scoring at or above a bucket key.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativeEntry {
    pub score: f64,
    pub cumulative: u64,
}

/// At-or-above cumulative counts, ordered by ascending bucket key.
///
/// Non-increasing as the key increases: the first entry equals the total,
/// the last entry equals the count of the top bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CumulativeDistribution {
    entries: Vec<CumulativeEntry>,
}

impl CumulativeDistribution {
    pub fn from_distribution(distribution: &Distribution) -> Self {
        let mut entries = Vec::with_capacity(distribution.len());
        let mut running = 0u64;
        for bucket in distribution.buckets().iter().rev() {
            running += bucket.count;
            entries.push(CumulativeEntry {
                score: bucket.score,
                cumulative: running,
            });
        }
        entries.reverse();
        Self { entries }
    }

    pub fn entries(&self) -> &[CumulativeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cumulative count at the lowest key, i.e. all candidates.
    pub fn total(&self) -> u64 {
        self.entries.first().map(|e| e.cumulative).unwrap_or(0)
    }

    /// Cumulative count at an exact bucket key, if the key is on the grid.
    pub fn at(&self, score: f64) -> Option<u64> {
        let key = BucketKey::from_score(score);
        self.entries
            .iter()
            .find(|e| BucketKey::from_score(e.score) == key)
            .map(|e| e.cumulative)
    }
}
