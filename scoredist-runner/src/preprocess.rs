//! Preprocessing of raw long-format score tables into the per-chart tables.
//!
//! - **khoi**: block score ranges per (block, year), highest range first,
//!   with the running at-or-above count.
//! - **mon**: subject scores per (year, block, subject), highest first, with
//!   the running at-or-above count and an IQ-style normalized score.

use std::collections::BTreeMap;

use scoredist_core::{
    normalized_score, survival_proportion, Block, BucketKey, Category, ExamYear, NormalizedScore,
};
use tracing::{debug, info, warn};

use crate::input::{KhoiRow, RawScoreRow};

/// Output row of the subject preprocessing.
#[derive(Debug, Clone, PartialEq)]
pub struct MonPreprocessedRow {
    pub year: ExamYear,
    pub category: Category,
    pub block: Option<String>,
    pub score: f64,
    pub count: u64,
    pub cumulative: u64,
    pub iq15: NormalizedScore,
}

/// Block ranges per (block, year), highest range first, with cumulative
/// at-or-above counts. Rows whose category is not a block are skipped.
pub fn preprocess_khoi(rows: &[RawScoreRow]) -> Vec<KhoiRow> {
    // (block, year) → max_score key → (max, min, count)
    let mut groups: BTreeMap<(Block, ExamYear), BTreeMap<BucketKey, (f64, f64, u64)>> =
        BTreeMap::new();
    let mut ignored = 0usize;

    for row in rows {
        let Category::Block(block) = row.category else {
            ignored += 1;
            continue;
        };
        let entry = groups
            .entry((block, row.year))
            .or_default()
            .entry(BucketKey::from_score(row.score.max))
            .or_insert((row.score.max, row.score.min, 0));
        entry.2 = entry.2.saturating_add(row.count);
    }
    if ignored > 0 {
        warn!(ignored, "skipped non-block rows in block preprocessing");
    }

    let mut out = Vec::new();
    for ((block, year), ranges) in groups {
        let mut cumulative = 0u64;
        for (_, (max_score, min_score, count)) in ranges.into_iter().rev() {
            cumulative = cumulative.saturating_add(count);
            out.push(KhoiRow {
                max_score,
                min_score,
                year,
                block,
                count,
                cumulative,
            });
        }
    }
    info!(rows = out.len(), "preprocessed block table");
    out
}

/// Subject scores per (year, block, subject), highest first.
///
/// Duplicate scores within a group are summed. Groups whose total is zero
/// are skipped. `IQ15` is `100 + 15·Φ⁻¹(share strictly below)`.
pub fn preprocess_mon(rows: &[RawScoreRow]) -> Vec<MonPreprocessedRow> {
    type GroupKey = (ExamYear, Option<String>, Category);
    let mut groups: BTreeMap<GroupKey, BTreeMap<BucketKey, (f64, u64)>> = BTreeMap::new();
    let mut ignored = 0usize;

    for row in rows {
        if matches!(row.category, Category::Block(_)) {
            ignored += 1;
            continue;
        }
        let score = row.score.min;
        let entry = groups
            .entry((row.year, row.block.clone(), row.category))
            .or_default()
            .entry(BucketKey::from_score(score))
            .or_insert((score, 0));
        entry.1 = entry.1.saturating_add(row.count);
    }
    if ignored > 0 {
        warn!(ignored, "skipped block rows in subject preprocessing");
    }

    let mut out = Vec::new();
    for ((year, block, category), scores) in groups {
        let total = scores.values().fold(0u64, |acc, (_, c)| acc.saturating_add(*c));
        if total == 0 {
            debug!(%year, %category, block = ?block, "skipping empty subject group");
            continue;
        }
        let mut cumulative = 0u64;
        for (_, (score, count)) in scores.into_iter().rev() {
            cumulative = cumulative.saturating_add(count);
            out.push(MonPreprocessedRow {
                year,
                category,
                block: block.clone(),
                score,
                count,
                cumulative,
                iq15: normalized_score(survival_proportion(total, cumulative)),
            });
        }
    }
    info!(rows = out.len(), "preprocessed subject table");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::ScoreRange;
    use scoredist_core::Subject;

    fn raw(score: ScoreRange, year: u16, category: Category, block: Option<&str>, count: u64) -> RawScoreRow {
        RawScoreRow {
            score,
            year: ExamYear::new(year),
            category,
            block: block.map(str::to_string),
            count,
        }
    }

    #[test]
    fn khoi_ranges_cumulate_from_the_top() {
        let a = Category::Block(Block::A);
        let rows = vec![
            raw(ScoreRange { max: 29.75, min: 29.5 }, 2019, a, None, 10),
            raw(ScoreRange { max: 30.0, min: 29.75 }, 2019, a, None, 3),
            raw(ScoreRange { max: 29.5, min: 29.25 }, 2019, a, None, 20),
            raw(ScoreRange { max: 30.0, min: 29.75 }, 2018, a, None, 1),
            raw(ScoreRange::point(8.0), 2019, Subject::Toan.into(), None, 99),
        ];
        let out = preprocess_khoi(&rows);
        assert_eq!(out.len(), 4);

        let y2019: Vec<(f64, u64)> = out
            .iter()
            .filter(|r| r.year == ExamYear::new(2019))
            .map(|r| (r.min_score, r.cumulative))
            .collect();
        assert_eq!(y2019, vec![(29.75, 3), (29.5, 13), (29.25, 33)]);
    }

    #[test]
    fn mon_groups_cumulate_and_normalize() {
        let toan = Category::Subject(Subject::Toan);
        let rows = vec![
            raw(ScoreRange::point(5.0), 2013, toan, Some("A"), 50),
            raw(ScoreRange::point(9.0), 2013, toan, Some("A"), 25),
            raw(ScoreRange::point(1.0), 2013, toan, Some("A"), 25),
            raw(ScoreRange::point(5.0), 2013, toan, Some("D"), 0),
        ];
        let out = preprocess_mon(&rows);
        // the empty block D group is skipped
        assert_eq!(out.len(), 3);

        assert_eq!(out[0].score, 9.0);
        assert_eq!(out[0].cumulative, 25);
        assert_eq!(out[1].cumulative, 75);
        assert_eq!(out[2].cumulative, 100);

        // 75% strictly below 9.0
        let iq = out[0].iq15.value().unwrap();
        assert!((iq - (100.0 + 15.0 * 0.6744897501960817)).abs() < 1e-4, "{iq}");
        // nobody strictly below the lowest score
        assert_eq!(out[2].iq15, NormalizedScore::Tail);
    }

    #[test]
    fn mon_sums_duplicate_scores() {
        let ly = Category::Subject(Subject::VatLy);
        let rows = vec![
            raw(ScoreRange::point(7.0), 2020, ly, None, 4),
            raw(ScoreRange::point(7.0), 2020, ly, None, 6),
        ];
        let out = preprocess_mon(&rows);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].count, 10);
    }
}
