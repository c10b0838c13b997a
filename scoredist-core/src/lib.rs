//! Scoredist Core — score binning, distributions, percentiles and color scales.
//!
//! This crate contains the pure statistical core behind the exam score charts:
//! - Exam identifiers (subjects, blocks, totals, years)
//! - Binning of raw scores onto a fixed-step grid
//! - Zero-filled distributions with at-or-above cumulation
//! - Nearest-rank percentile lookup and the z-score ladder
//! - Threshold pass-rate counting
//! - Count-axis tick selection
//! - The five-stop red → green color scale
//! - IQ-style score normalization for preprocessing
//!
//! Nothing here performs I/O or logging; the runner crate owns both.

pub mod aggregate;
pub mod binning;
pub mod color;
pub mod config;
pub mod domain;
pub mod iq;
pub mod percentile;
pub mod stats;
pub mod threshold;
pub mod ticks;

pub use aggregate::{aggregate, AggregateError, Aggregation, DroppedCounts, RawPair};
pub use binning::{
    bin_score, validate_step, Binner, BinningError, FLOAT_TOLERANCE, MAX_GRID_BUCKETS, MIN_STEP,
};
pub use color::{color_at, ColorScale, ColorScaleError, ColorStop, Rgb, ScoreDomain};
pub use config::{ColorDomainTable, DomainSource, StepDecision, StepTable, TableError};
pub use domain::{
    Block, BucketKey, Category, CumulativeDistribution, CumulativeEntry, Distribution, ExamEra,
    ExamYear, ScoreBucket, Subject, TotalScore, UnknownCategory,
};
pub use iq::{normalized_score, survival_proportion, NormalizedScore};
pub use percentile::{percentile_score, z_score_stats, PercentileResult, ZLevel, Z_LEVELS};
pub use stats::{
    compute_chart_statistics, BucketRow, ChartOutcome, ChartRequest, ChartStatistics,
    HighestScore, SkipReason, StatsError,
};
pub use threshold::{
    regional_thresholds, threshold_ladder, threshold_stat, ThresholdMode, ThresholdStat,
};
pub use ticks::{axis_max_for, select_tick_step, tick_positions};
