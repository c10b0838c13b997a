//! Artifact export: preprocessed tables, chart statistics, regional tables.
//!
//! Formats:
//! - **CSV**: preprocessed khoi/mon tables, per-chart `score,count,cumulative,color`
//!   bars, and the regional side table
//! - **JSON**: per-chart statistics, regional tables and the batch manifest,
//!   each carrying a `schema_version`
//! - **Markdown**: a chart's title and legend block
//!
//! Unknown schema versions are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use scoredist_core::{Category, ChartStatistics, ExamEra, ThresholdMode};

use crate::input::KhoiRow;
use crate::pipeline::{BatchResult, BatchSummary, Schema};
use crate::preprocess::MonPreprocessedRow;
use crate::regional::RegionalTable;

/// Version stamped into every JSON artifact.
pub const SCHEMA_VERSION: u32 = 1;

pub const MANIFEST_FILE: &str = "manifest.json";

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Preprocessed tables ────────────────────────────────────────────

/// Columns: max_score, min_score, year, khoi, count, cumulative
pub fn export_khoi_csv(rows: &[KhoiRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["max_score", "min_score", "year", "khoi", "count", "cumulative"])?;
    for r in rows {
        wtr.write_record([
            &r.max_score.to_string(),
            &r.min_score.to_string(),
            &r.year.to_string(),
            r.block.code(),
            &r.count.to_string(),
            &r.cumulative.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

/// Columns: Year, Subject, khoi_thi, Score, count, Cumulative, IQ15
pub fn export_mon_csv(rows: &[MonPreprocessedRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["Year", "Subject", "khoi_thi", "Score", "count", "Cumulative", "IQ15"])?;
    for r in rows {
        wtr.write_record([
            &r.year.to_string(),
            &r.category.code(),
            r.block.as_deref().unwrap_or(""),
            &r.score.to_string(),
            &r.count.to_string(),
            &r.cumulative.to_string(),
            &r.iq15.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

// ─── Chart artifacts ────────────────────────────────────────────────

/// Statistics for one chart as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartArtifact {
    pub schema_version: u32,
    pub title: String,
    pub statistics: ChartStatistics,
}

impl ChartArtifact {
    pub fn new(statistics: ChartStatistics) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            title: chart_title(&statistics),
            statistics,
        }
    }
}

pub fn export_chart_json(artifact: &ChartArtifact) -> Result<String> {
    serde_json::to_string_pretty(artifact).context("failed to serialize chart statistics to JSON")
}

/// Deserialize chart statistics, rejecting unknown schema versions.
pub fn import_chart_json(json: &str) -> Result<ChartArtifact> {
    let artifact: ChartArtifact =
        serde_json::from_str(json).context("failed to deserialize chart statistics from JSON")?;
    check_version(artifact.schema_version)?;
    Ok(artifact)
}

/// Columns: score, count, cumulative, color
pub fn export_chart_csv(stats: &ChartStatistics) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["score", "count", "cumulative", "color"])?;
    for row in &stats.rows {
        wtr.write_record([
            &row.score.to_string(),
            &row.count.to_string(),
            &row.cumulative.to_string(),
            &row.color.to_hex(),
        ])?;
    }
    finish_csv(wtr)
}

/// `score_dist_{year}_{khoi}` for block charts,
/// `score_dist_mon_{year}_{subject}[_{label}]` for everything else.
pub fn chart_file_stem(stats: &ChartStatistics) -> String {
    match (&stats.category, &stats.label) {
        (Category::Block(block), _) => format!("score_dist_{}_{}", stats.year, block.code()),
        (category, Some(label)) => {
            format!("score_dist_mon_{}_{}_{}", stats.year, category.code(), label)
        }
        (category, None) => format!("score_dist_mon_{}_{}", stats.year, category.code()),
    }
}

/// Chart heading, worded after the exam in force that year.
pub fn chart_title(stats: &ChartStatistics) -> String {
    let exam = match stats.year.era() {
        ExamEra::UniversityEntrance => "Đại học",
        ExamEra::NationalHighSchool => "THPT Quốc gia",
        ExamEra::Graduation => "Tốt nghiệp THPT",
    };
    match (&stats.category, &stats.label) {
        (Category::Block(block), _) => format!(
            "Biểu đồ phổ điểm thi {exam} khối {} năm {}",
            block.code(),
            stats.year
        ),
        (category, Some(label)) => format!(
            "Biểu đồ phổ điểm thi {exam} môn {} - Khối {label} - Năm {}",
            category.display_name(),
            stats.year
        ),
        (category, None) => format!(
            "Biểu đồ phổ điểm thi {exam} môn {} năm {}",
            category.display_name(),
            stats.year
        ),
    }
}

// ─── Batch manifest ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub schema: Schema,
    pub input: PathBuf,
    /// BLAKE3 hex digest of the input file.
    pub input_hash: String,
    pub summary: BatchSummary,
    /// File stems written, in job order.
    pub charts: Vec<String>,
}

pub fn hash_file(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(blake3::hash(&bytes).to_hex().to_string())
}

/// Write a JSON and a CSV file per generated chart plus `manifest.json`.
pub fn save_chart_artifacts(
    batch: &BatchResult,
    schema: Schema,
    input: &Path,
    output_dir: &Path,
) -> Result<Manifest> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;

    let mut charts = Vec::new();
    for result in &batch.results {
        let Ok(outcome) = &result.outcome else {
            continue;
        };
        let Some(stats) = outcome.statistics() else {
            continue;
        };
        let stem = chart_file_stem(stats);
        let artifact = ChartArtifact::new(stats.clone());

        let json_path = output_dir.join(format!("{stem}.json"));
        std::fs::write(&json_path, export_chart_json(&artifact)?)
            .with_context(|| format!("failed to write {}", json_path.display()))?;
        let csv_path = output_dir.join(format!("{stem}.csv"));
        std::fs::write(&csv_path, export_chart_csv(stats)?)
            .with_context(|| format!("failed to write {}", csv_path.display()))?;
        debug!(%stem, "wrote chart artifacts");
        charts.push(stem);
    }

    let manifest = Manifest {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        schema,
        input: input.to_path_buf(),
        input_hash: hash_file(input)?,
        summary: batch.summary.clone(),
        charts,
    };
    let manifest_path = output_dir.join(MANIFEST_FILE);
    let json = serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?;
    std::fs::write(&manifest_path, json)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    info!(
        charts = manifest.charts.len(),
        dir = %output_dir.display(),
        "saved chart artifacts"
    );
    Ok(manifest)
}

/// Load `manifest.json` from an output directory.
pub fn load_manifest(dir: &Path) -> Result<Manifest> {
    let path = dir.join(MANIFEST_FILE);
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manifest: Manifest =
        serde_json::from_str(&json).context("failed to deserialize manifest")?;
    check_version(manifest.schema_version)?;
    Ok(manifest)
}

fn check_version(version: u32) -> Result<()> {
    if version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            version,
            SCHEMA_VERSION
        );
    }
    Ok(())
}

// ─── Regional tables ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalArtifact {
    pub schema_version: u32,
    pub table: RegionalTable,
}

pub fn export_regional_json(table: &RegionalTable) -> Result<String> {
    let artifact = RegionalArtifact {
        schema_version: SCHEMA_VERSION,
        table: table.clone(),
    };
    serde_json::to_string_pretty(&artifact).context("failed to serialize regional table to JSON")
}

pub fn import_regional_json(json: &str) -> Result<RegionalTable> {
    let artifact: RegionalArtifact =
        serde_json::from_str(json).context("failed to deserialize regional table from JSON")?;
    check_version(artifact.schema_version)?;
    Ok(artifact.table)
}

/// Columns: rank, province_code, province, count, average, color, then one
/// `ge_{threshold}` column per threshold. The national row comes last with
/// an empty rank and code.
pub fn export_regional_csv(table: &RegionalTable) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header: Vec<String> = ["rank", "province_code", "province", "count", "average", "color"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    header.extend(table.thresholds.iter().map(|t| format!("ge_{t}")));
    wtr.write_record(&header)?;

    let average = |a: Option<f64>| a.map(|v| format!("{v:.2}")).unwrap_or_default();
    for row in &table.rows {
        let mut record = vec![
            row.rank.to_string(),
            row.code.clone(),
            row.name.clone(),
            row.count.to_string(),
            average(row.average),
            row.color.to_hex(),
        ];
        record.extend(row.at_or_above.iter().map(u64::to_string));
        wtr.write_record(&record)?;
    }

    let national = &table.national;
    let mut record = vec![
        String::new(),
        String::new(),
        national.name.clone(),
        national.count.to_string(),
        average(national.average),
        String::new(),
    ];
    record.extend(national.at_or_above.iter().map(u64::to_string));
    wtr.write_record(&record)?;

    finish_csv(wtr)
}

/// Write `regional_{year}_{category}.json` and `.csv`; returns the JSON path.
pub fn save_regional_artifacts(table: &RegionalTable, output_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create output dir: {}", output_dir.display()))?;
    let stem = format!("regional_{}_{}", table.year, table.category.code());

    let json_path = output_dir.join(format!("{stem}.json"));
    std::fs::write(&json_path, export_regional_json(table)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    let csv_path = output_dir.join(format!("{stem}.csv"));
    std::fs::write(&csv_path, export_regional_csv(table)?)
        .with_context(|| format!("failed to write {}", csv_path.display()))?;

    info!(path = %json_path.display(), "saved regional table");
    Ok(json_path)
}

// ─── Markdown legend ────────────────────────────────────────────────

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Chart title, candidate count and the legend block as Markdown.
pub fn generate_chart_report(stats: &ChartStatistics) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str(&format!("# {}\n\n", chart_title(stats)));
    md.push_str(&format!(
        "Số lượng thí sinh: {}\n\n",
        group_thousands(stats.total)
    ));

    md.push_str("## Các tham số đặc trưng\n\n");
    md.push_str(&format!("- Điểm trung bình: {:.2}\n", stats.mean));
    if let Some(h) = stats.highest {
        md.push_str(&format!(
            "- Điểm cao nhất: {:.2} ({} thí sinh)\n",
            h.score,
            group_thousands(h.count)
        ));
    }
    md.push('\n');

    md.push_str("| Độ lệch chuẩn | Top | Điểm |\n");
    md.push_str("| ---: | ---: | ---: |\n");
    for p in &stats.percentiles {
        let sign = if p.z > 0 { "+" } else { "" };
        md.push_str(&format!("| {sign}{} | {}% | {:.2} |\n", p.z, p.label, p.score));
    }
    md.push('\n');

    md.push_str("| Điểm | Số lượng | Top |\n");
    md.push_str("| --- | ---: | ---: |\n");
    for t in &stats.thresholds {
        let op = match t.mode {
            ThresholdMode::AtOrAbove => "≥",
            ThresholdMode::Exact => "=",
        };
        md.push_str(&format!(
            "| {op} {} | {} | {:.2}% |\n",
            t.threshold,
            group_thousands(t.count),
            t.pass_rate_percent
        ));
    }

    md
}
