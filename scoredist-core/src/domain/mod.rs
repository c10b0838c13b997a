//! Domain types: exam identifiers and score distributions.

pub mod category;
pub mod distribution;
pub mod year;

pub use category::{Block, Category, Subject, TotalScore, UnknownCategory};
pub use distribution::{
    BucketKey, CumulativeDistribution, CumulativeEntry, Distribution, ScoreBucket,
};
pub use year::{ExamEra, ExamYear};
