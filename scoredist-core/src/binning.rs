//! Score binning: raw score → bucket key on a fixed-step grid.
//!
//! The grid runs from 0 to the domain maximum in `step` increments. A score
//! equal to the maximum always lands on the maximum itself; when the step does
//! not divide the maximum evenly the maximum becomes an extra top-edge bucket
//! instead of being folded into a narrow final bucket.

use thiserror::Error;

use crate::domain::BucketKey;

/// Tolerance absorbed before flooring `score / step` and when comparing keys.
pub const FLOAT_TOLERANCE: f64 = 1e-6;

/// Finest step a [`BucketKey`] can tell apart; every step is a multiple of it.
pub const MIN_STEP: f64 = 0.001;

/// Upper bound on the buckets of one grid.
pub const MAX_GRID_BUCKETS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum BinningError {
    #[error("bin step must be a positive multiple of 0.001, got {0}")]
    InvalidStep(f64),

    #[error("domain maximum must be positive and finite, got {0}")]
    InvalidDomain(f64),

    #[error("step {step} over [0, {domain_max}] needs too many buckets")]
    GridTooLarge { step: f64, domain_max: f64 },
}

/// Accept `step` only if it is finite, at least [`MIN_STEP`], and a whole
/// multiple of it.
pub fn validate_step(step: f64) -> Result<f64, BinningError> {
    if !step.is_finite() || step < MIN_STEP - FLOAT_TOLERANCE * MIN_STEP {
        return Err(BinningError::InvalidStep(step));
    }
    let units = step / MIN_STEP;
    if (units - units.round()).abs() > FLOAT_TOLERANCE * units {
        return Err(BinningError::InvalidStep(step));
    }
    Ok(step)
}

/// Maps scores onto the bucket grid of one (step, domain) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binner {
    step: f64,
    domain_max: f64,
}

impl Binner {
    pub fn new(step: f64, domain_max: f64) -> Result<Self, BinningError> {
        validate_step(step)?;
        if !domain_max.is_finite() || domain_max <= 0.0 {
            return Err(BinningError::InvalidDomain(domain_max));
        }
        if domain_max / step >= MAX_GRID_BUCKETS as f64 {
            return Err(BinningError::GridTooLarge { step, domain_max });
        }
        Ok(Self { step, domain_max })
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn domain_max(&self) -> f64 {
        self.domain_max
    }

    /// Bucket key for a score. `None` for non-finite input.
    ///
    /// Scores outside `[0, domain_max]` still get a key; callers decide
    /// whether that key is on the grid.
    pub fn bucket_key(&self, score: f64) -> Option<BucketKey> {
        if !score.is_finite() {
            return None;
        }
        if (score - self.domain_max).abs() <= FLOAT_TOLERANCE * self.domain_max.max(1.0) {
            return Some(BucketKey::from_score(self.domain_max));
        }
        let steps = round_to_tolerance(score / self.step).floor();
        Some(BucketKey::from_score(steps * self.step))
    }

    /// Every bucket key in `[0, domain_max]`, ascending.
    pub fn grid(&self) -> Vec<BucketKey> {
        let n = (self.domain_max / self.step + FLOAT_TOLERANCE).floor() as i64;
        let mut keys: Vec<BucketKey> = (0..=n)
            .map(|i| BucketKey::from_score(i as f64 * self.step))
            .collect();
        let top = BucketKey::from_score(self.domain_max);
        if keys.last().map_or(true, |last| *last < top) {
            keys.push(top);
        }
        keys
    }
}

/// Free-function form of [`Binner::bucket_key`], returning the key as a score.
///
/// Returns `None` for non-finite scores or an invalid step/domain.
pub fn bin_score(score: f64, step: f64, domain_max: f64) -> Option<f64> {
    Binner::new(step, domain_max)
        .ok()?
        .bucket_key(score)
        .map(BucketKey::score)
}

fn round_to_tolerance(value: f64) -> f64 {
    const SCALE: f64 = 1.0 / FLOAT_TOLERANCE;
    (value * SCALE).round() / SCALE
}
