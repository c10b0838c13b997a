//! Per-province side table for the average-score map.
//!
//! For one (year, category) every listed province gets its candidate count,
//! average score, at-or-above counts at 50–100% of the theoretical maximum,
//! and a map color. Rows are ranked by average, best first, and followed by
//! a national row.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use scoredist_core::{
    aggregate, regional_thresholds, Category, ColorDomainTable, ColorScale, DomainSource,
    ExamYear, RawPair, Rgb, ScoreDomain,
};

use crate::input::{AverageRow, Province, ProvinceScoreRow};

/// Pseudo-province codes that carry the national average.
pub const NATIONAL_CODES: [&str; 3] = ["99", "CaNuoc", "00"];

pub const NATIONAL_NAME: &str = "Cả nước";

/// Step used to bin province distributions before counting thresholds.
/// Fine enough that every integer threshold falls on a bucket edge.
const REGIONAL_STEP: f64 = 0.05;

#[derive(Debug, Error)]
pub enum RegionalError {
    #[error("no province has data for {category} {year}")]
    NoData { year: ExamYear, category: Category },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvinceRow {
    /// 1-based rank by average, best first.
    pub rank: usize,
    pub code: String,
    pub name: String,
    pub count: u64,
    pub average: Option<f64>,
    /// At-or-above counts, aligned with [`RegionalTable::thresholds`].
    pub at_or_above: Vec<u64>,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationalRow {
    pub name: String,
    pub count: u64,
    pub average: Option<f64>,
    pub at_or_above: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalTable {
    pub year: ExamYear,
    pub category: Category,
    pub theoretical_max: f64,
    pub thresholds: Vec<f64>,
    pub color_domain: ScoreDomain,
    pub domain_source: DomainSource,
    pub rows: Vec<ProvinceRow>,
    pub national: NationalRow,
}

/// Inputs for one regional table, already loaded.
#[derive(Debug, Clone, Copy)]
pub struct RegionalInputs<'a> {
    pub provinces: &'a [Province],
    pub averages: &'a [AverageRow],
    pub distribution: &'a [ProvinceScoreRow],
}

pub fn build_regional_table(
    year: ExamYear,
    category: Category,
    inputs: RegionalInputs<'_>,
    domains: &ColorDomainTable,
) -> Result<RegionalTable, RegionalError> {
    let theoretical_max = category.theoretical_max(year);
    let (color_domain, domain_source) = domains.resolve(category, year);
    if domain_source == DomainSource::Fallback {
        warn!(%category, %year, theoretical_max, "no tuned color domain, using the full score range");
    }
    let scale = ColorScale::exam();

    let averages: HashMap<&str, Option<f64>> = inputs
        .averages
        .iter()
        .filter(|a| a.year == year && a.category == category)
        .map(|a| (a.province_code.as_str(), a.average))
        .collect();

    let mut by_province: HashMap<&str, Vec<&ProvinceScoreRow>> = HashMap::new();
    for row in inputs
        .distribution
        .iter()
        .filter(|r| r.year == year && r.category == category)
    {
        by_province.entry(row.province_code.as_str()).or_default().push(row);
    }

    let thresholds: Vec<f64> = regional_thresholds_for(theoretical_max);
    let mut rows = Vec::new();
    let mut seen = HashSet::new();

    for province in inputs.provinces {
        if !seen.insert(province.code.as_str()) {
            continue;
        }
        let average = averages.get(province.code.as_str()).copied();
        let dist = by_province.get(province.code.as_str());
        if average.is_none() && dist.is_none() {
            debug!(code = %province.code, "no data for province");
            continue;
        }
        let dist: &[&ProvinceScoreRow] = dist.map(Vec::as_slice).unwrap_or(&[]);
        let average = average.flatten();

        rows.push(ProvinceRow {
            rank: 0,
            code: province.code.clone(),
            name: province.name.clone(),
            count: province_count(dist),
            average,
            at_or_above: at_or_above_counts(dist, theoretical_max),
            color: match average {
                Some(avg) => scale.color_for(avg, color_domain),
                None => Rgb::MISSING,
            },
        });
    }

    if rows.is_empty() {
        return Err(RegionalError::NoData { year, category });
    }

    rows.sort_by(|a, b| {
        let key = |r: &ProvinceRow| r.average.unwrap_or(0.0);
        key(b).total_cmp(&key(a))
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }

    let national = NationalRow {
        name: NATIONAL_NAME.to_string(),
        count: saturating_sum(rows.iter().map(|r| r.count)),
        average: NATIONAL_CODES
            .iter()
            .find_map(|code| averages.get(code).copied())
            .flatten(),
        at_or_above: (0..thresholds.len())
            .map(|i| saturating_sum(rows.iter().map(|r| r.at_or_above[i])))
            .collect(),
    };

    info!(%category, %year, provinces = rows.len(), "built regional table");
    Ok(RegionalTable {
        year,
        category,
        theoretical_max,
        thresholds,
        color_domain,
        domain_source,
        rows,
        national,
    })
}

fn regional_thresholds_for(theoretical_max: f64) -> Vec<f64> {
    scoredist_core::threshold::REGIONAL_FRACTIONS
        .iter()
        .map(|f| f * theoretical_max)
        .collect()
}

/// Candidate count: the largest cumulative value when present, else the sum
/// of counts.
fn province_count(dist: &[&ProvinceScoreRow]) -> u64 {
    let max_cumulative = dist.iter().filter_map(|r| r.cumulative).max().unwrap_or(0);
    if max_cumulative > 0 {
        max_cumulative
    } else {
        saturating_sum(dist.iter().map(|r| r.count))
    }
}

fn saturating_sum(counts: impl Iterator<Item = u64>) -> u64 {
    counts.fold(0, u64::saturating_add)
}

fn at_or_above_counts(dist: &[&ProvinceScoreRow], theoretical_max: f64) -> Vec<u64> {
    let pairs: Vec<RawPair> = dist
        .iter()
        .map(|r| RawPair {
            score: r.score,
            count: r.count,
        })
        .collect();
    match aggregate(&pairs, REGIONAL_STEP, theoretical_max) {
        Ok(agg) => regional_thresholds(&agg.distribution, theoretical_max)
            .into_iter()
            .map(|s| s.count)
            .collect(),
        Err(_) => vec![0; scoredist_core::threshold::REGIONAL_FRACTIONS.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoredist_core::Subject;

    fn y() -> ExamYear {
        ExamYear::new(2024)
    }

    fn toan() -> Category {
        Subject::Toan.into()
    }

    fn province(code: &str, name: &str) -> Province {
        Province {
            code: code.into(),
            name: name.into(),
        }
    }

    fn avg(code: &str, value: Option<f64>) -> AverageRow {
        AverageRow {
            year: y(),
            category: toan(),
            province_code: code.into(),
            average: value,
        }
    }

    fn score(code: &str, s: f64, count: u64, cumulative: Option<u64>) -> ProvinceScoreRow {
        ProvinceScoreRow {
            year: y(),
            category: toan(),
            province_code: code.into(),
            score: Some(s),
            count,
            cumulative,
        }
    }

    #[test]
    fn ranks_by_average_and_sums_national_row() {
        let provinces = vec![province("01", "Hà Nội"), province("79", "TP. Hồ Chí Minh")];
        let averages = vec![avg("01", Some(6.5)), avg("79", Some(7.1)), avg("99", Some(6.8))];
        let distribution = vec![
            score("01", 4.5, 10, Some(30)),
            score("01", 6.0, 15, Some(20)),
            score("01", 10.0, 5, Some(5)),
            score("79", 5.0, 8, None),
            score("79", 9.25, 4, None),
        ];
        let table = build_regional_table(
            y(),
            toan(),
            RegionalInputs {
                provinces: &provinces,
                averages: &averages,
                distribution: &distribution,
            },
            &ColorDomainTable::builtin(),
        )
        .unwrap();

        assert_eq!(table.thresholds, vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(table.rows[0].code, "79");
        assert_eq!(table.rows[0].rank, 1);
        assert_eq!(table.rows[0].count, 12);
        assert_eq!(table.rows[0].at_or_above, vec![12, 4, 4, 4, 4, 0]);
        assert_eq!(table.rows[1].count, 30);
        assert_eq!(table.rows[1].at_or_above, vec![20, 20, 5, 5, 5, 5]);

        assert_eq!(table.national.count, 42);
        assert_eq!(table.national.average, Some(6.8));
        assert_eq!(table.national.at_or_above[0], 32);
        assert_eq!(table.domain_source, DomainSource::Table);
    }

    #[test]
    fn province_without_average_gets_missing_color() {
        let provinces = vec![province("01", "Hà Nội"), province("02", "Hà Giang")];
        let distribution = vec![score("02", 5.0, 3, None)];
        let table = build_regional_table(
            y(),
            toan(),
            RegionalInputs {
                provinces: &provinces,
                averages: &[],
                distribution: &distribution,
            },
            &ColorDomainTable::builtin(),
        )
        .unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].color, Rgb::MISSING);
        assert_eq!(table.national.average, None);
    }

    #[test]
    fn empty_selection_is_an_error() {
        let provinces = vec![province("01", "Hà Nội")];
        let err = build_regional_table(
            y(),
            toan(),
            RegionalInputs {
                provinces: &provinces,
                averages: &[],
                distribution: &[],
            },
            &ColorDomainTable::empty(),
        )
        .unwrap_err();
        assert!(matches!(err, RegionalError::NoData { .. }));
    }
}
