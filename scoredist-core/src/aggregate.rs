//! Aggregation: raw (score, count) pairs → zero-filled distribution plus
//! at-or-above cumulative distribution.
//!
//! Single pass over the input into a bucket-key → count accumulator that is
//! pre-seeded with every grid key, so the left join and zero fill come for
//! free.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::binning::{Binner, BinningError, FLOAT_TOLERANCE};
use crate::domain::{BucketKey, CumulativeDistribution, Distribution, ScoreBucket};

/// One input row: a raw score (possibly missing) and its candidate count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPair {
    pub score: Option<f64>,
    pub count: u64,
}

impl RawPair {
    pub fn new(score: f64, count: u64) -> Self {
        Self {
            score: Some(score),
            count,
        }
    }

    pub fn missing(count: u64) -> Self {
        Self { score: None, count }
    }
}

/// Candidates that could not be placed on the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedCounts {
    /// Rows whose score was absent or not a number.
    pub missing_score: u64,
    /// Rows whose score fell outside `[0, domain_max]`.
    pub out_of_range: u64,
}

impl DroppedCounts {
    pub fn total(&self) -> u64 {
        self.missing_score.saturating_add(self.out_of_range)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AggregateError {
    #[error("no candidates to aggregate")]
    NoData,

    #[error("candidate counts overflow a 64-bit total")]
    CountOverflow,

    #[error(transparent)]
    Binning(#[from] BinningError),
}

/// Result of a successful aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub distribution: Distribution,
    pub cumulative: CumulativeDistribution,
    pub dropped: DroppedCounts,
}

/// Aggregate raw pairs onto the `[0, domain_max]` grid at `step`.
///
/// Returns [`AggregateError::NoData`] when no candidate lands on the grid and
/// [`AggregateError::CountOverflow`] when the placed counts do not fit a `u64`.
/// Candidates with a missing or out-of-domain score are reported in
/// [`Aggregation::dropped`] and never invented as buckets.
pub fn aggregate(
    pairs: &[RawPair],
    step: f64,
    domain_max: f64,
) -> Result<Aggregation, AggregateError> {
    let binner = Binner::new(step, domain_max)?;

    let mut sums: BTreeMap<BucketKey, u64> = binner.grid().into_iter().map(|k| (k, 0)).collect();
    let mut dropped = DroppedCounts::default();
    // bounds every bucket sum and every cumulative count
    let mut total: u64 = 0;

    let upper = domain_max + FLOAT_TOLERANCE * domain_max.max(1.0);

    for pair in pairs {
        let score = match pair.score.filter(|s| s.is_finite()) {
            Some(score) => score,
            None => {
                dropped.missing_score = dropped.missing_score.saturating_add(pair.count);
                continue;
            }
        };
        if score < -FLOAT_TOLERANCE || score > upper {
            dropped.out_of_range = dropped.out_of_range.saturating_add(pair.count);
            continue;
        }
        match binner.bucket_key(score).and_then(|key| sums.get_mut(&key)) {
            Some(acc) => {
                total = total
                    .checked_add(pair.count)
                    .ok_or(AggregateError::CountOverflow)?;
                *acc += pair.count;
            }
            None => dropped.out_of_range = dropped.out_of_range.saturating_add(pair.count),
        }
    }

    let buckets: Vec<ScoreBucket> = sums
        .into_iter()
        .map(|(key, count)| ScoreBucket {
            score: key.score(),
            count,
        })
        .collect();

    let distribution = Distribution::new(step, domain_max, buckets);
    if distribution.total() == 0 {
        return Err(AggregateError::NoData);
    }
    let cumulative = distribution.cumulative();

    Ok(Aggregation {
        distribution,
        cumulative,
        dropped,
    })
}
