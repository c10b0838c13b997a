//! CSV input tables.
//!
//! Every loader reads a headered CSV, converts each record into a typed row,
//! and drops (counts, logs) records it cannot interpret instead of failing.
//! Only I/O and CSV framing errors are fatal.
//!
//! Column names follow the spreadsheets the tables are exported from, with
//! aliases for the spellings seen in older exports.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use scoredist_core::{Block, Category, ExamYear, HighestScore, UnknownCategory};

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors that abort loading a whole file.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Why a score cell could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreParseError {
    #[error("empty score")]
    Empty,

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("'{0}' is not a score range")]
    InvalidRange(String),
}

/// Why one record was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("missing value for '{0}'")]
    Missing(&'static str),

    #[error(transparent)]
    Score(#[from] ScoreParseError),

    #[error("invalid count '{0}'")]
    Count(String),

    #[error("invalid year '{0}'")]
    Year(String),

    #[error(transparent)]
    Category(#[from] UnknownCategory),

    #[error("'{0}' is not a block")]
    NotABlock(Category),
}

// ─── Cell parsers ───────────────────────────────────────────────────

/// Score cell as printed on the published tables.
///
/// Block tables give ranges `"30-29.75"` listing the upper bound first;
/// subject tables give single scores, where both bounds coincide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub max: f64,
    pub min: f64,
}

impl ScoreRange {
    pub fn point(score: f64) -> Self {
        Self {
            max: score,
            min: score,
        }
    }
}

pub fn parse_score_range(text: &str) -> Result<ScoreRange, ScoreParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ScoreParseError::Empty);
    }
    // a leading '-' is a sign, not a separator
    let separator = text.char_indices().skip(1).find(|&(_, c)| c == '-');
    match separator.map(|(i, _)| i) {
        Some(split) => {
            let (hi, lo) = (&text[..split], &text[split + 1..]);
            let parse = |s: &str| {
                parse_number(s).ok_or_else(|| ScoreParseError::InvalidRange(text.to_string()))
            };
            Ok(ScoreRange {
                max: parse(hi)?,
                min: parse(lo)?,
            })
        }
        None => parse_number(text)
            .map(ScoreRange::point)
            .ok_or_else(|| ScoreParseError::InvalidNumber(text.to_string())),
    }
}

fn parse_number(text: &str) -> Option<f64> {
    let value: f64 = text.trim().replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

/// Largest count accepted in one cell. Far above any real exam cohort, and
/// low enough that summing a table of such cells cannot overflow `u64`.
pub const MAX_COUNT: u64 = 1_000_000_000_000;

/// Counts are integers, but spreadsheet exports write them as `12.0`.
/// Blank cells count as zero. Exponents, signs and counts above
/// [`MAX_COUNT`] are rejected.
pub fn parse_count(text: Option<&str>) -> Result<u64, RowError> {
    let text = text.map(str::trim).unwrap_or("");
    if text.is_empty() {
        return Ok(0);
    }
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let digits_only = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !digits_only(whole) || !fraction.bytes().all(|b| b == b'0') {
        return Err(RowError::Count(text.to_string()));
    }
    match whole.parse::<u64>() {
        Ok(count) if count <= MAX_COUNT => Ok(count),
        _ => Err(RowError::Count(text.to_string())),
    }
}

pub fn parse_year(text: Option<&str>) -> Result<ExamYear, RowError> {
    let text = text.map(str::trim).ok_or(RowError::Missing("year"))?;
    match parse_number(text) {
        Some(v) if (1900.0..=2200.0).contains(&v) && v.fract() == 0.0 => {
            Ok(ExamYear::new(v as u16))
        }
        _ => Err(RowError::Year(text.to_string())),
    }
}

/// Province codes are two-digit strings; numeric exports lose the leading
/// zero and gain a fraction (`1.0` → `01`). Non-numeric codes pass through.
pub fn normalize_province_code(raw: &str) -> String {
    let head = raw.trim().split('.').next().unwrap_or("");
    format!("{head:0>2}")
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, RowError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RowError::Missing(name)),
    }
}

fn optional(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_block(text: &str) -> Result<Block, RowError> {
    match text.parse::<Category>()? {
        Category::Block(block) => Ok(block),
        other => Err(RowError::NotABlock(other)),
    }
}

// ─── Loading ────────────────────────────────────────────────────────

/// Outcome of loading one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub accepted: usize,
    pub dropped: usize,
}

#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub rows: Vec<T>,
    pub report: LoadReport,
}

fn load_csv<R, T>(
    path: &Path,
    convert: impl Fn(R) -> Result<T, RowError>,
) -> Result<Loaded<T>, InputError>
where
    R: DeserializeOwned,
{
    let file = std::fs::File::open(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut rows = Vec::new();
    let mut report = LoadReport::default();

    for (i, record) in reader.deserialize::<R>().enumerate() {
        // header is line 1
        let line = i + 2;
        let record = record.map_err(|source| InputError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        match convert(record) {
            Ok(row) => {
                rows.push(row);
                report.accepted += 1;
            }
            Err(reason) => {
                warn!(path = %path.display(), line, %reason, "dropping row");
                report.dropped += 1;
            }
        }
    }

    info!(
        path = %path.display(),
        accepted = report.accepted,
        dropped = report.dropped,
        "loaded table"
    );
    Ok(Loaded { rows, report })
}

// ─── Raw long-format scores (preprocess input) ──────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRecord {
    #[serde(alias = "Score", alias = "score_range")]
    score: Option<String>,
    #[serde(alias = "Year")]
    year: Option<String>,
    #[serde(alias = "Subject", alias = "subject", alias = "khoi")]
    category: Option<String>,
    #[serde(alias = "khoi_thi", alias = "Block")]
    block: Option<String>,
    #[serde(alias = "Count")]
    count: Option<String>,
}

/// One raw `(score or range, year, category, count)` observation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawScoreRow {
    pub score: ScoreRange,
    pub year: ExamYear,
    pub category: Category,
    /// Block the paper was sat in, when the table splits subjects by block.
    pub block: Option<String>,
    pub count: u64,
}

pub fn load_raw_scores(path: &Path) -> Result<Loaded<RawScoreRow>, InputError> {
    load_csv(path, |r: RawRecord| {
        Ok(RawScoreRow {
            score: parse_score_range(required(&r.score, "score")?)?,
            year: parse_year(optional(&r.year))?,
            category: required(&r.category, "category")?.parse()?,
            block: optional(&r.block).map(str::to_string),
            count: parse_count(optional(&r.count))?,
        })
    })
}

// ─── Preprocessed block table ───────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct KhoiRecord {
    max_score: Option<String>,
    min_score: Option<String>,
    year: Option<String>,
    khoi: Option<String>,
    count: Option<String>,
    cumulative: Option<String>,
}

/// A row of the preprocessed block table.
#[derive(Debug, Clone, PartialEq)]
pub struct KhoiRow {
    pub max_score: f64,
    pub min_score: f64,
    pub year: ExamYear,
    pub block: Block,
    pub count: u64,
    pub cumulative: u64,
}

pub fn load_khoi_table(path: &Path) -> Result<Loaded<KhoiRow>, InputError> {
    load_csv(path, |r: KhoiRecord| {
        let min_text = required(&r.min_score, "min_score")?;
        let min_score = parse_score_range(min_text)?.min;
        let max_score = match optional(&r.max_score) {
            Some(text) => parse_score_range(text)?.max,
            None => min_score,
        };
        Ok(KhoiRow {
            max_score,
            min_score,
            year: parse_year(optional(&r.year))?,
            block: parse_block(required(&r.khoi, "khoi")?)?,
            count: parse_count(optional(&r.count))?,
            cumulative: parse_count(optional(&r.cumulative))?,
        })
    })
}

// ─── Preprocessed subject table ─────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MonRecord {
    #[serde(rename = "Year", alias = "year")]
    year: Option<String>,
    #[serde(rename = "Subject", alias = "subject")]
    subject: Option<String>,
    #[serde(rename = "khoi_thi", alias = "khoi")]
    block: Option<String>,
    #[serde(rename = "Score", alias = "score")]
    score: Option<String>,
    count: Option<String>,
    #[serde(rename = "Cumulative", alias = "cumulative")]
    cumulative: Option<String>,
    #[serde(rename = "IQ15")]
    iq15: Option<String>,
}

/// A row of the preprocessed subject table.
///
/// A missing score is kept as `None` so the aggregator can account for the
/// candidates it drops.
#[derive(Debug, Clone, PartialEq)]
pub struct MonRow {
    pub year: ExamYear,
    pub category: Category,
    pub block: Option<String>,
    pub score: Option<f64>,
    pub count: u64,
    pub cumulative: Option<u64>,
    pub iq15: Option<String>,
}

pub fn load_mon_table(path: &Path) -> Result<Loaded<MonRow>, InputError> {
    load_csv(path, |r: MonRecord| {
        let score = match optional(&r.score) {
            Some(text) => Some(parse_score_range(text)?.min),
            None => None,
        };
        Ok(MonRow {
            year: parse_year(optional(&r.year))?,
            category: required(&r.subject, "Subject")?.parse()?,
            block: optional(&r.block).map(str::to_string),
            score,
            count: parse_count(optional(&r.count))?,
            cumulative: optional(&r.cumulative)
                .map(|c| parse_count(Some(c)))
                .transpose()?,
            iq15: optional(&r.iq15).map(str::to_string),
        })
    })
}

// ─── Published highest scores ───────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HighestRecord {
    year: Option<String>,
    khoi: Option<String>,
    highest_score: Option<String>,
    #[serde(alias = "count")]
    so_luong: Option<String>,
}

/// Published highest score per (year, category).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HighestTable {
    entries: HashMap<(ExamYear, Category), HighestScore>,
}

impl HighestTable {
    pub fn insert(&mut self, year: ExamYear, category: Category, highest: HighestScore) {
        self.entries.insert((year, category), highest);
    }

    pub fn get(&self, year: ExamYear, category: Category) -> Option<HighestScore> {
        self.entries.get(&(year, category)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn load_highest_scores(path: &Path) -> Result<Loaded<(ExamYear, Category, HighestScore)>, InputError> {
    load_csv(path, |r: HighestRecord| {
        let year = parse_year(optional(&r.year))?;
        let category = required(&r.khoi, "khoi")?.parse()?;
        let score = parse_score_range(required(&r.highest_score, "highest_score")?)?.max;
        let count = parse_count(optional(&r.so_luong))?;
        Ok((year, category, HighestScore { score, count }))
    })
}

impl FromIterator<(ExamYear, Category, HighestScore)> for HighestTable {
    fn from_iter<I: IntoIterator<Item = (ExamYear, Category, HighestScore)>>(iter: I) -> Self {
        let mut table = HighestTable::default();
        for (year, category, highest) in iter {
            table.insert(year, category, highest);
        }
        table
    }
}

// ─── Regional tables ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AverageRecord {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Subject")]
    subject: Option<String>,
    #[serde(rename = "Province_Code")]
    province: Option<String>,
    #[serde(rename = "Average_Score")]
    average: Option<String>,
}

/// Average score of one province (or a national pseudo-province).
#[derive(Debug, Clone, PartialEq)]
pub struct AverageRow {
    pub year: ExamYear,
    pub category: Category,
    pub province_code: String,
    pub average: Option<f64>,
}

pub fn load_averages(path: &Path) -> Result<Loaded<AverageRow>, InputError> {
    load_csv(path, |r: AverageRecord| {
        Ok(AverageRow {
            year: parse_year(optional(&r.year))?,
            category: required(&r.subject, "Subject")?.parse()?,
            province_code: normalize_province_code(required(&r.province, "Province_Code")?),
            average: optional(&r.average).and_then(parse_number),
        })
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProvinceScoreRecord {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Subject")]
    subject: Option<String>,
    #[serde(rename = "Province_Code")]
    province: Option<String>,
    #[serde(rename = "Score")]
    score: Option<String>,
    #[serde(rename = "Count")]
    count: Option<String>,
    #[serde(rename = "Cumulative")]
    cumulative: Option<String>,
}

/// One score row of a province's distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvinceScoreRow {
    pub year: ExamYear,
    pub category: Category,
    pub province_code: String,
    pub score: Option<f64>,
    pub count: u64,
    pub cumulative: Option<u64>,
}

pub fn load_province_scores(path: &Path) -> Result<Loaded<ProvinceScoreRow>, InputError> {
    load_csv(path, |r: ProvinceScoreRecord| {
        let score = match optional(&r.score) {
            Some(text) => Some(parse_score_range(text)?.min),
            None => None,
        };
        Ok(ProvinceScoreRow {
            year: parse_year(optional(&r.year))?,
            category: required(&r.subject, "Subject")?.parse()?,
            province_code: normalize_province_code(required(&r.province, "Province_Code")?),
            score,
            count: parse_count(optional(&r.count))?,
            cumulative: optional(&r.cumulative)
                .map(|c| parse_count(Some(c)))
                .transpose()?,
        })
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ProvinceRecord {
    #[serde(rename = "Province_Code")]
    province: Option<String>,
    ten_tinh: Option<String>,
}

/// A province of the reference list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Province {
    pub code: String,
    pub name: String,
}

pub fn load_provinces(path: &Path) -> Result<Loaded<Province>, InputError> {
    load_csv(path, |r: ProvinceRecord| {
        Ok(Province {
            code: normalize_province_code(required(&r.province, "Province_Code")?),
            name: required(&r.ten_tinh, "ten_tinh")?.to_string(),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn score_ranges_list_the_upper_bound_first() {
        let r = parse_score_range("30-29.75").unwrap();
        assert_eq!(r, ScoreRange { max: 30.0, min: 29.75 });
        let r = parse_score_range(" 7.5 ").unwrap();
        assert_eq!(r, ScoreRange::point(7.5));
        assert_eq!(parse_score_range("8,25").unwrap(), ScoreRange::point(8.25));
    }

    #[test]
    fn malformed_scores_are_typed() {
        assert_eq!(parse_score_range(""), Err(ScoreParseError::Empty));
        assert_eq!(
            parse_score_range("abc"),
            Err(ScoreParseError::InvalidNumber("abc".into()))
        );
        assert_eq!(
            parse_score_range("10-x"),
            Err(ScoreParseError::InvalidRange("10-x".into()))
        );
        assert_eq!(parse_score_range("-1").unwrap(), ScoreRange::point(-1.0));
    }

    #[test]
    fn counts_accept_spreadsheet_floats() {
        assert_eq!(parse_count(Some("12.0")), Ok(12));
        assert_eq!(parse_count(Some("")), Ok(0));
        assert_eq!(parse_count(None), Ok(0));
        assert!(parse_count(Some("-3")).is_err());
        assert!(parse_count(Some("1.5")).is_err());
        assert_eq!(parse_count(Some("1000000000000")), Ok(MAX_COUNT));
        assert!(parse_count(Some("1000000000001")).is_err());
        assert!(parse_count(Some("1e19")).is_err());
        assert!(parse_count(Some("18446744073709551616")).is_err());
        assert!(parse_count(Some("+4")).is_err());
    }

    #[test]
    fn province_codes_are_two_digits() {
        assert_eq!(normalize_province_code("1.0"), "01");
        assert_eq!(normalize_province_code("1"), "01");
        assert_eq!(normalize_province_code("42"), "42");
        assert_eq!(normalize_province_code("CaNuoc"), "CaNuoc");
    }

    #[test]
    fn khoi_loader_drops_malformed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "khoi.csv",
            "max_score,min_score,year,khoi,count,cumulative\n\
             30,29.75,2019,A,3,3\n\
             29.75,29.5,2019,A,10,13\n\
             bad,oops,2019,A,1,14\n\
             29.5,29.25,2019,Latin,1,14\n",
        );
        let loaded = load_khoi_table(&path).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.report, LoadReport { accepted: 2, dropped: 2 });
        assert_eq!(loaded.rows[0].block, Block::A);
        assert_eq!(loaded.rows[1].cumulative, 13);
    }

    #[test]
    fn mon_loader_keeps_missing_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "mon.csv",
            "Year,Subject,khoi_thi,Score,count,Cumulative,IQ15\n\
             2013,Toan,A,9.5,4,4,-\n\
             2013,Toan,A,,2,6,-\n",
        );
        let loaded = load_mon_table(&path).unwrap();
        assert_eq!(loaded.rows.len(), 2);
        assert_eq!(loaded.rows[1].score, None);
        assert_eq!(loaded.rows[0].block.as_deref(), Some("A"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_khoi_table(Path::new("/nonexistent/khoi.csv")).unwrap_err();
        assert!(matches!(err, InputError::Io { .. }));
    }
}
