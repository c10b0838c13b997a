//! Chart statistics: everything a score-distribution chart displays, computed
//! for one (year, category) combination.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{aggregate, AggregateError, DroppedCounts, RawPair};
use crate::binning::BinningError;
use crate::color::{color_at, Rgb, ScoreDomain};
use crate::config::StepDecision;
use crate::domain::{Category, ExamYear};
use crate::percentile::{z_score_stats, PercentileResult};
use crate::threshold::{threshold_ladder, ThresholdStat};
use crate::ticks::{axis_max_for, select_tick_step, tick_positions};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("invalid binning for {category} {year}: {source}")]
    Binning {
        year: ExamYear,
        category: Category,
        #[source]
        source: BinningError,
    },

    #[error("candidate counts for {category} {year} overflow a 64-bit total")]
    CountOverflow { year: ExamYear, category: Category },
}

/// Highest score reached and how many candidates reached it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighestScore {
    pub score: f64,
    pub count: u64,
}

/// One chart to compute.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub year: ExamYear,
    pub category: Category,
    /// Sub-group label, e.g. the block a pre-2015 subject paper belonged to.
    pub label: Option<String>,
    pub step: StepDecision,
    pub domain_max: f64,
    /// Published highest score, used instead of the top populated bucket.
    pub highest_override: Option<HighestScore>,
}

impl ChartRequest {
    pub fn new(year: ExamYear, category: Category, step: StepDecision) -> Self {
        Self {
            year,
            category,
            label: None,
            step,
            domain_max: category.theoretical_max(year),
            highest_override: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_highest(mut self, highest: Option<HighestScore>) -> Self {
        self.highest_override = highest;
        self
    }
}

/// One bar of the chart with its cumulative count and fill color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketRow {
    pub score: f64,
    pub count: u64,
    pub cumulative: u64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartStatistics {
    pub year: ExamYear,
    pub category: Category,
    pub label: Option<String>,
    pub step: f64,
    pub domain_max: f64,
    pub total: u64,
    pub mean: f64,
    pub highest: Option<HighestScore>,
    pub percentiles: Vec<PercentileResult>,
    pub thresholds: Vec<ThresholdStat>,
    pub axis_max: f64,
    pub tick_step: f64,
    pub ticks: Vec<f64>,
    pub rows: Vec<BucketRow>,
    pub dropped: DroppedCounts,
}

impl ChartStatistics {
    pub fn colors(&self) -> impl Iterator<Item = Rgb> + '_ {
        self.rows.iter().map(|r| r.color)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The step table says not to chart this combination.
    StepDisabled,
    /// No candidate landed on the grid.
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartOutcome {
    Ready(Box<ChartStatistics>),
    Skipped(SkipReason),
}

impl ChartOutcome {
    pub fn statistics(&self) -> Option<&ChartStatistics> {
        match self {
            ChartOutcome::Ready(stats) => Some(stats),
            ChartOutcome::Skipped(_) => None,
        }
    }
}

/// Bin, aggregate and summarize `pairs` for one chart.
///
/// A skip decision short-circuits before any binning; an empty grid is a
/// skip rather than an error.
pub fn compute_chart_statistics(
    request: &ChartRequest,
    pairs: &[RawPair],
) -> Result<ChartOutcome, StatsError> {
    let step = match request.step {
        StepDecision::Skip => return Ok(ChartOutcome::Skipped(SkipReason::StepDisabled)),
        StepDecision::Step(step) => step,
    };

    let agg = match aggregate(pairs, step, request.domain_max) {
        Ok(agg) => agg,
        Err(AggregateError::NoData) => return Ok(ChartOutcome::Skipped(SkipReason::NoData)),
        Err(AggregateError::CountOverflow) => {
            return Err(StatsError::CountOverflow {
                year: request.year,
                category: request.category,
            })
        }
        Err(AggregateError::Binning(source)) => {
            return Err(StatsError::Binning {
                year: request.year,
                category: request.category,
                source,
            })
        }
    };

    let distribution = &agg.distribution;
    let color_domain = ScoreDomain::full(request.domain_max);
    let rows = distribution
        .buckets()
        .iter()
        .zip(agg.cumulative.entries())
        .map(|(bucket, cum)| BucketRow {
            score: bucket.score,
            count: bucket.count,
            cumulative: cum.cumulative,
            color: color_at(bucket.score, color_domain),
        })
        .collect();

    let highest = request.highest_override.or_else(|| {
        distribution.highest_populated().map(|b| HighestScore {
            score: b.score,
            count: b.count,
        })
    });

    let axis_max = axis_max_for(distribution.max_count());
    let tick_step = select_tick_step(axis_max);

    Ok(ChartOutcome::Ready(Box::new(ChartStatistics {
        year: request.year,
        category: request.category,
        label: request.label.clone(),
        step,
        domain_max: request.domain_max,
        total: distribution.total(),
        mean: distribution.mean(),
        highest,
        percentiles: z_score_stats(&agg.cumulative),
        thresholds: threshold_ladder(distribution),
        axis_max,
        tick_step,
        ticks: tick_positions(axis_max, tick_step),
        rows,
        dropped: agg.dropped,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Block, Subject};

    fn toan_2024() -> ChartRequest {
        ChartRequest::new(ExamYear::new(2024), Subject::Toan.into(), StepDecision::Step(0.2))
    }

    #[test]
    fn skip_short_circuits() {
        let req = ChartRequest::new(ExamYear::new(2025), Subject::Gdcd.into(), StepDecision::Skip);
        let out = compute_chart_statistics(&req, &[RawPair::new(5.0, 10)]).unwrap();
        assert_eq!(out, ChartOutcome::Skipped(SkipReason::StepDisabled));
    }

    #[test]
    fn empty_input_is_no_data() {
        let out = compute_chart_statistics(&toan_2024(), &[RawPair::missing(5)]).unwrap();
        assert_eq!(out, ChartOutcome::Skipped(SkipReason::NoData));
        assert!(out.statistics().is_none());
    }

    #[test]
    fn bad_step_is_an_error() {
        let mut req = toan_2024();
        req.step = StepDecision::Step(-1.0);
        let err = compute_chart_statistics(&req, &[RawPair::new(5.0, 1)]).unwrap_err();
        assert!(matches!(err, StatsError::Binning { .. }));

        req.step = StepDecision::Step(0.0004);
        let err = compute_chart_statistics(&req, &[RawPair::new(5.0, 1)]).unwrap_err();
        assert!(matches!(err, StatsError::Binning { .. }));
    }

    #[test]
    fn overflowing_counts_are_an_error() {
        let huge = 10_000_000_000_000_000_000;
        let pairs = [RawPair::new(5.0, huge), RawPair::new(6.0, huge)];
        let err = compute_chart_statistics(&toan_2024(), &pairs).unwrap_err();
        assert!(matches!(err, StatsError::CountOverflow { .. }));
    }

    #[test]
    fn full_record_for_a_subject() {
        let pairs = [
            RawPair::new(4.0, 100),
            RawPair::new(5.1, 300),
            RawPair::new(6.3, 200),
            RawPair::new(9.9, 1),
            RawPair::missing(7),
        ];
        let out = compute_chart_statistics(&toan_2024(), &pairs).unwrap();
        let stats = out.statistics().unwrap();

        assert_eq!(stats.total, 601);
        assert_eq!(stats.rows.len(), 51);
        assert_eq!(stats.percentiles.len(), 7);
        assert_eq!(stats.thresholds.len(), 6);
        assert_eq!(stats.dropped.missing_score, 7);
        assert_eq!(stats.highest, Some(HighestScore { score: 9.8, count: 1 }));
        assert_eq!(stats.axis_max, 400.0);
        assert_eq!(stats.tick_step, 50.0);
        assert_eq!(stats.ticks.last(), Some(&400.0));
        assert_eq!(stats.rows[0].cumulative, 601);
        assert_eq!(stats.rows[25].color.to_hex(), "#CCCC00");
        assert_eq!(stats.colors().count(), stats.rows.len());

        let median = stats.percentiles.iter().find(|p| p.z == 0).unwrap();
        assert_eq!(median.score, 5.2);
    }

    #[test]
    fn published_highest_score_wins() {
        let req = ChartRequest::new(ExamYear::new(2019), Block::A.into(), StepDecision::Step(0.25))
            .with_label("A")
            .with_highest(Some(HighestScore { score: 29.35, count: 2 }));
        let out = compute_chart_statistics(&req, &[RawPair::new(20.0, 5), RawPair::new(29.25, 2)])
            .unwrap();
        let stats = out.statistics().unwrap();
        assert_eq!(stats.domain_max, 30.0);
        assert_eq!(stats.rows.len(), 121);
        assert_eq!(stats.highest, Some(HighestScore { score: 29.35, count: 2 }));
        assert_eq!(stats.label.as_deref(), Some("A"));
    }
}
