//! Batch orchestration: group preprocessed rows into chart jobs and compute
//! every job's statistics, in parallel on a rayon pool or sequentially.
//!
//! Jobs share no mutable state; results come back in job order either way.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use scoredist_core::{
    compute_chart_statistics, Category, ChartOutcome, ChartRequest, ExamYear, RawPair,
    SkipReason, StatsError, StepTable,
};

use crate::input::{HighestTable, KhoiRow, MonRow};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to build worker pool with {threads} threads: {source}")]
    ThreadPool {
        threads: usize,
        #[source]
        source: rayon::ThreadPoolBuildError,
    },
}

/// Which preprocessed table a batch was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schema {
    Khoi,
    Mon,
}

/// How to run a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Rayon's global pool.
    #[default]
    Parallel,
    /// A dedicated pool with a fixed number of threads.
    Threads(usize),
    Sequential,
}

/// One chart's request plus its raw pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartJob {
    pub request: ChartRequest,
    pub pairs: Vec<RawPair>,
}

impl ChartJob {
    pub fn year(&self) -> ExamYear {
        self.request.year
    }

    pub fn category(&self) -> Category {
        self.request.category
    }
}

/// Block charts: one per (year, block), binned on the range lower bounds.
pub fn khoi_jobs(rows: &[KhoiRow], steps: &StepTable, highest: &HighestTable) -> Vec<ChartJob> {
    let mut groups: BTreeMap<(ExamYear, Category), Vec<RawPair>> = BTreeMap::new();
    for row in rows {
        groups
            .entry((row.year, Category::Block(row.block)))
            .or_default()
            .push(RawPair::new(row.min_score, row.count));
    }

    groups
        .into_iter()
        .map(|((year, category), pairs)| ChartJob {
            request: ChartRequest::new(year, category, steps.resolve(year, category))
                .with_highest(highest.get(year, category)),
            pairs,
        })
        .collect()
}

fn lacks_block_label(row: &MonRow) -> bool {
    row.year.splits_subjects_by_block() && row.block.is_none()
}

/// Rows from block-split years that carry no block label. [`mon_jobs`] has
/// no chart to put them in and leaves them out.
pub fn unlabeled_mon_rows(rows: &[MonRow]) -> usize {
    rows.iter().filter(|r| lacks_block_label(r)).count()
}

/// Subject charts. Years that split subjects by block get one chart per
/// (year, subject, block label); later years one per (year, subject).
///
/// Rows counted by [`unlabeled_mon_rows`] are dropped with a warning.
pub fn mon_jobs(rows: &[MonRow], steps: &StepTable) -> Vec<ChartJob> {
    let mut groups: BTreeMap<(ExamYear, Category, Option<String>), Vec<RawPair>> = BTreeMap::new();
    let mut unlabeled = 0usize;
    let mut unlabeled_candidates = 0u64;
    for row in rows {
        if lacks_block_label(row) {
            debug!(year = %row.year, category = %row.category, "row without block label");
            unlabeled += 1;
            unlabeled_candidates = unlabeled_candidates.saturating_add(row.count);
            continue;
        }
        let label = if row.year.splits_subjects_by_block() {
            row.block.clone()
        } else {
            None
        };
        groups
            .entry((row.year, row.category, label))
            .or_default()
            .push(RawPair {
                score: row.score,
                count: row.count,
            });
    }

    if unlabeled > 0 {
        warn!(
            rows = unlabeled,
            candidates = unlabeled_candidates,
            "dropped subject rows without a block label"
        );
    }

    groups
        .into_iter()
        .map(|((year, category, label), pairs)| {
            let mut request = ChartRequest::new(year, category, steps.resolve(year, category));
            request.label = label;
            ChartJob { request, pairs }
        })
        .collect()
}

/// Result of one job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobResult {
    pub year: ExamYear,
    pub category: Category,
    pub label: Option<String>,
    pub outcome: Result<ChartOutcome, StatsError>,
}

/// Counts over a whole batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub jobs: usize,
    pub generated: usize,
    pub skipped_step: usize,
    pub skipped_no_data: usize,
    pub failed: usize,
    /// Candidates dropped for a missing or out-of-domain score.
    pub dropped_candidates: u64,
}

#[derive(Debug, Clone)]
pub struct BatchResult {
    pub results: Vec<JobResult>,
    pub summary: BatchSummary,
}

fn run_job(job: &ChartJob) -> JobResult {
    JobResult {
        year: job.request.year,
        category: job.request.category,
        label: job.request.label.clone(),
        outcome: compute_chart_statistics(&job.request, &job.pairs),
    }
}

/// Compute every job. Result order matches job order in every mode.
pub fn run_batch(jobs: &[ChartJob], mode: ExecutionMode) -> Result<BatchResult, PipelineError> {
    let results: Vec<JobResult> = match mode {
        ExecutionMode::Parallel => jobs.par_iter().map(run_job).collect(),
        ExecutionMode::Threads(threads) => {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|source| PipelineError::ThreadPool { threads, source })?;
            pool.install(|| jobs.par_iter().map(run_job).collect())
        }
        ExecutionMode::Sequential => jobs.iter().map(run_job).collect(),
    };

    let summary = summarize(&results);
    info!(
        jobs = summary.jobs,
        generated = summary.generated,
        skipped = summary.skipped_step + summary.skipped_no_data,
        failed = summary.failed,
        "batch complete"
    );
    Ok(BatchResult { results, summary })
}

fn summarize(results: &[JobResult]) -> BatchSummary {
    let mut summary = BatchSummary {
        jobs: results.len(),
        ..BatchSummary::default()
    };
    for r in results {
        match &r.outcome {
            Ok(ChartOutcome::Ready(stats)) => {
                summary.generated += 1;
                summary.dropped_candidates =
                    summary.dropped_candidates.saturating_add(stats.dropped.total());
            }
            Ok(ChartOutcome::Skipped(reason)) => {
                debug!(year = %r.year, category = %r.category, label = ?r.label, ?reason, "skipped");
                match reason {
                    SkipReason::StepDisabled => summary.skipped_step += 1,
                    SkipReason::NoData => summary.skipped_no_data += 1,
                }
            }
            Err(e) => {
                warn!(year = %r.year, category = %r.category, error = %e, "chart failed");
                summary.failed += 1;
            }
        }
    }
    summary
}
