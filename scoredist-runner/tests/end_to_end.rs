use std::path::{Path, PathBuf};

use scoredist_core::{Block, Category, ExamYear, StepTable, Subject, ThresholdMode};
use scoredist_runner::{
    export_khoi_csv, export_mon_csv, import_chart_json, khoi_jobs, load_highest_scores,
    load_khoi_table, load_manifest, load_mon_table, load_raw_scores, mon_jobs, preprocess_khoi,
    preprocess_mon, run_batch, save_chart_artifacts, ExecutionMode, HighestTable, RunnerConfig,
    Schema, MAX_COUNT,
};

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

const RAW_MON: &str = "\
score,year,category,block,count
9,2023,Toan,,25
5,2023,Toan,,50
1,2023,Toan,,25
6,2013,VatLy,A,10
7,2013,VatLy,A,30
4,2013,VatLy,A1,5
xx,2023,Toan,,3
8,2023,HoaNhac,,3
";

const RAW_KHOI: &str = "\
score,year,category,count
30-29.75,2019,KhoiA,2
29.75-29.5,2019,KhoiA,8
29.5-29.25,2019,A,10
20-19.75,2019,KhoiD,5
";

#[test]
fn mon_raw_table_to_chart_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let raw = write_file(dir.path(), "raw_mon.csv", RAW_MON);

    let loaded = load_raw_scores(&raw).unwrap();
    assert_eq!(loaded.report.accepted, 6);
    assert_eq!(loaded.report.dropped, 2);

    let pre = preprocess_mon(&loaded.rows);
    let pre_path = write_file(dir.path(), "pre_mon.csv", &export_mon_csv(&pre).unwrap());

    let table = load_mon_table(&pre_path).unwrap();
    assert_eq!(table.report.dropped, 0);
    assert_eq!(table.rows.len(), 6);

    let jobs = mon_jobs(&table.rows, &StepTable::builtin());
    assert_eq!(jobs.len(), 3);
    let batch = run_batch(&jobs, ExecutionMode::Parallel).unwrap();
    assert_eq!(batch.summary.generated, 3);

    let out = dir.path().join("results");
    let manifest = save_chart_artifacts(&batch, Schema::Mon, &pre_path, &out).unwrap();
    assert_eq!(
        manifest.charts,
        vec![
            "score_dist_mon_2013_VatLy_A".to_string(),
            "score_dist_mon_2013_VatLy_A1".to_string(),
            "score_dist_mon_2023_Toan".to_string(),
        ]
    );
    assert_eq!(load_manifest(&out).unwrap().input_hash, manifest.input_hash);

    let json = std::fs::read_to_string(out.join("score_dist_mon_2023_Toan.json")).unwrap();
    let chart = import_chart_json(&json).unwrap();
    let stats = &chart.statistics;
    assert_eq!(stats.total, 100);
    assert_eq!(stats.step, 0.2);
    assert!((stats.mean - 5.0).abs() < 1e-9);
    let five = stats
        .thresholds
        .iter()
        .find(|t| t.threshold == 5.0 && t.mode == ThresholdMode::AtOrAbove)
        .unwrap();
    assert_eq!(five.count, 75);

    let csv = std::fs::read_to_string(out.join("score_dist_mon_2023_Toan.csv")).unwrap();
    assert!(csv.contains("\n9,25,25,"));
}

#[test]
fn khoi_raw_table_to_chart_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let raw = write_file(dir.path(), "raw_khoi.csv", RAW_KHOI);
    let highest_path = write_file(
        dir.path(),
        "highest_score.csv",
        "year,khoi,highest_score,so_luong\n2019,A,29.95,1\n",
    );

    let pre = preprocess_khoi(&load_raw_scores(&raw).unwrap().rows);
    assert_eq!(pre.len(), 4);
    let pre_path = write_file(dir.path(), "pre_khoi.csv", &export_khoi_csv(&pre).unwrap());

    let rows = load_khoi_table(&pre_path).unwrap().rows;
    let a_cumulative: Vec<u64> = rows
        .iter()
        .filter(|r| r.block == Block::A)
        .map(|r| r.cumulative)
        .collect();
    assert_eq!(a_cumulative, vec![2, 10, 20]);

    let highest: HighestTable = load_highest_scores(&highest_path).unwrap().rows.into_iter().collect();
    assert_eq!(highest.len(), 1);

    let jobs = khoi_jobs(&rows, &StepTable::builtin(), &highest);
    let batch = run_batch(&jobs, ExecutionMode::Sequential).unwrap();
    let out = dir.path().join("results");
    let manifest = save_chart_artifacts(&batch, Schema::Khoi, &pre_path, &out).unwrap();
    assert_eq!(manifest.schema, Schema::Khoi);
    assert_eq!(
        manifest.charts,
        vec!["score_dist_2019_A".to_string(), "score_dist_2019_D".to_string()]
    );

    let json = std::fs::read_to_string(out.join("score_dist_2019_A.json")).unwrap();
    let stats = import_chart_json(&json).unwrap().statistics;
    assert_eq!(stats.year, ExamYear::new(2019));
    assert_eq!(stats.total, 20);
    assert_eq!(stats.domain_max, 30.0);
    assert_eq!(stats.highest.map(|h| h.score), Some(29.95));
}

#[test]
fn run_config_drives_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let raw = write_file(dir.path(), "raw_mon.csv", RAW_MON);
    let config_path = write_file(
        dir.path(),
        "run.toml",
        "sequential = true\n\n[steps.2023]\nToan = \"skip\"\n",
    );

    let config = RunnerConfig::from_file(&config_path).unwrap();
    assert_eq!(config.execution_mode(), ExecutionMode::Sequential);
    let steps = config.step_table().unwrap();

    let pre = preprocess_mon(&load_raw_scores(&raw).unwrap().rows);
    let pre_path = write_file(dir.path(), "pre_mon.csv", &export_mon_csv(&pre).unwrap());
    let rows = load_mon_table(&pre_path).unwrap().rows;

    let batch = run_batch(&mon_jobs(&rows, &steps), config.execution_mode()).unwrap();
    assert_eq!(batch.summary.jobs, 3);
    assert_eq!(batch.summary.generated, 2);
    assert_eq!(batch.summary.skipped_step, 1);

    let skipped = batch
        .results
        .iter()
        .find(|r| r.category == Category::from(Subject::Toan))
        .unwrap();
    assert!(skipped.outcome.as_ref().unwrap().statistics().is_none());
}

#[test]
fn oversized_counts_are_dropped_before_charting() {
    let dir = tempfile::tempdir().unwrap();
    let raw = write_file(
        dir.path(),
        "raw_mon.csv",
        &format!(
            "score,year,category,block,count\n\
             5,2023,Toan,,1e19\n\
             6,2023,Toan,,18446744073709551615\n\
             7,2023,Toan,,{}\n\
             8,2023,Toan,,4\n",
            MAX_COUNT + 1
        ),
    );

    let loaded = load_raw_scores(&raw).unwrap();
    assert_eq!(loaded.report.accepted, 1);
    assert_eq!(loaded.report.dropped, 3);

    let pre = preprocess_mon(&loaded.rows);
    let pre_path = write_file(dir.path(), "pre_mon.csv", &export_mon_csv(&pre).unwrap());
    let rows = load_mon_table(&pre_path).unwrap().rows;

    let batch = run_batch(&mon_jobs(&rows, &StepTable::builtin()), ExecutionMode::Sequential).unwrap();
    assert_eq!(batch.summary.generated, 1);
    assert_eq!(batch.summary.failed, 0);
    let stats = batch.results[0].outcome.as_ref().unwrap().statistics().unwrap();
    assert_eq!(stats.total, 4);
}
