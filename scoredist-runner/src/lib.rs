//! Scoredist Runner — CSV input, preprocessing, batch charts, regional tables.
//!
//! This crate builds on `scoredist-core` to provide:
//! - Tolerant CSV loaders for raw, preprocessed and per-province tables
//! - Khoi (block) and mon (subject) preprocessing with cumulative counts
//! - Batch chart statistics over every (year, category) combination, on a
//!   rayon pool or sequentially
//! - Per-province regional tables for the average-score map
//! - JSON/CSV/Markdown artifacts with a hashed batch manifest
//! - TOML run configuration over the built-in tables

pub mod config;
pub mod export;
pub mod input;
pub mod pipeline;
pub mod preprocess;
pub mod regional;

pub use config::{ConfigError, RunnerConfig, StepValue};
pub use export::{
    chart_file_stem, chart_title, export_chart_csv, export_chart_json, export_khoi_csv,
    export_mon_csv, export_regional_csv, export_regional_json, generate_chart_report, hash_file,
    import_chart_json, import_regional_json, load_manifest, save_chart_artifacts,
    save_regional_artifacts, ChartArtifact, Manifest, SCHEMA_VERSION,
};
pub use input::{
    load_averages, load_highest_scores, load_khoi_table, load_mon_table, load_province_scores,
    load_provinces, load_raw_scores, normalize_province_code, parse_count, parse_score_range,
    AverageRow, HighestTable, InputError, KhoiRow, LoadReport, Loaded, MonRow, Province,
    ProvinceScoreRow, RawScoreRow, RowError, ScoreParseError, ScoreRange, MAX_COUNT,
};
pub use pipeline::{
    khoi_jobs, mon_jobs, run_batch, unlabeled_mon_rows, BatchResult, BatchSummary, ChartJob,
    ExecutionMode, JobResult, PipelineError, Schema,
};
pub use preprocess::{preprocess_khoi, preprocess_mon, MonPreprocessedRow};
pub use regional::{build_regional_table, RegionalError, RegionalInputs, RegionalTable};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn jobs_and_results_are_send_sync() {
        assert_send::<ChartJob>();
        assert_sync::<ChartJob>();
        assert_send::<JobResult>();
        assert_sync::<JobResult>();
        assert_send::<BatchResult>();
        assert_sync::<BatchResult>();
    }

    #[test]
    fn tables_are_send_sync() {
        assert_send::<RegionalTable>();
        assert_sync::<RegionalTable>();
        assert_send::<HighestTable>();
        assert_sync::<HighestTable>();
    }

    #[test]
    fn config_and_errors_are_send_sync() {
        assert_send::<RunnerConfig>();
        assert_sync::<RunnerConfig>();
        assert_send::<ConfigError>();
        assert_send::<InputError>();
        assert_send::<PipelineError>();
        assert_send::<RegionalError>();
    }
}
