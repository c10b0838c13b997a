//! Scoredist CLI — preprocessing, chart statistics and regional tables.
//!
//! Commands:
//! - `preprocess`: turn a raw long-format score table into the khoi or mon table
//! - `charts`: compute chart statistics for every combination and save artifacts
//! - `regional`: build the per-province table for one (year, category)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use scoredist_core::{Category, ExamYear};
use scoredist_runner::{
    build_regional_table, export_khoi_csv, export_mon_csv, generate_chart_report, khoi_jobs,
    load_averages, load_highest_scores, load_khoi_table, load_mon_table, load_province_scores,
    load_provinces, load_raw_scores, mon_jobs, preprocess_khoi, preprocess_mon, run_batch,
    save_chart_artifacts, save_regional_artifacts, unlabeled_mon_rows, BatchResult, ExecutionMode,
    HighestTable, RegionalInputs, RunnerConfig, Schema,
};

#[derive(Parser)]
#[command(
    name = "scoredist",
    about = "Scoredist CLI — exam score distributions, percentiles and regional tables"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum SchemaArg {
    /// Block (khoi) score ranges.
    Khoi,
    /// Subject (mon) scores.
    Mon,
}

impl From<SchemaArg> for Schema {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Khoi => Schema::Khoi,
            SchemaArg::Mon => Schema::Mon,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Preprocess a raw long-format table (score, year, category, count[, block]).
    Preprocess {
        #[arg(long, value_enum)]
        schema: SchemaArg,

        /// Raw CSV input.
        #[arg(long)]
        input: PathBuf,

        /// Preprocessed CSV output.
        #[arg(long)]
        output: PathBuf,
    },
    /// Compute chart statistics for every combination in a preprocessed table.
    Charts {
        #[arg(long, value_enum)]
        schema: SchemaArg,

        /// Preprocessed CSV input.
        #[arg(long)]
        input: PathBuf,

        /// Published highest scores (year, khoi, highest_score, so_luong).
        #[arg(long)]
        highest: Option<PathBuf>,

        /// TOML run configuration.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory. Overrides the config; defaults to ./results.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Run on the calling thread instead of a worker pool.
        #[arg(long, default_value_t = false)]
        sequential: bool,

        /// Also write a Markdown legend per chart.
        #[arg(long, default_value_t = false)]
        report: bool,
    },
    /// Build the per-province table behind the average-score map.
    Regional {
        /// Province averages (Year, Subject, Province_Code, Average_Score).
        #[arg(long)]
        averages: PathBuf,

        /// Province score distributions (Year, Subject, Province_Code, Score, Count, Cumulative).
        #[arg(long)]
        distribution: PathBuf,

        /// Province list (Province_Code, ten_tinh).
        #[arg(long)]
        provinces: PathBuf,

        #[arg(long)]
        year: u16,

        /// Category code, e.g. Toan, KhoiD, TongDiem.
        #[arg(long)]
        category: String,

        /// TOML run configuration (color domains, output directory).
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory. Overrides the config; defaults to ./results.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Preprocess {
            schema,
            input,
            output,
        } => run_preprocess(schema.into(), &input, &output),
        Commands::Charts {
            schema,
            input,
            highest,
            config,
            output_dir,
            sequential,
            report,
        } => run_charts(
            schema.into(),
            &input,
            highest.as_deref(),
            config.as_deref(),
            output_dir,
            sequential,
            report,
        ),
        Commands::Regional {
            averages,
            distribution,
            provinces,
            year,
            category,
            config,
            output_dir,
        } => run_regional(
            &averages,
            &distribution,
            &provinces,
            ExamYear::new(year),
            &category,
            config.as_deref(),
            output_dir,
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    match path {
        Some(path) => RunnerConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(RunnerConfig::default()),
    }
}

fn run_preprocess(schema: Schema, input: &Path, output: &Path) -> Result<()> {
    let loaded = load_raw_scores(input)?;
    if loaded.rows.is_empty() {
        bail!("no usable rows in {}", input.display());
    }

    let csv = match schema {
        Schema::Khoi => export_khoi_csv(&preprocess_khoi(&loaded.rows))?,
        Schema::Mon => export_mon_csv(&preprocess_mon(&loaded.rows))?,
    };
    std::fs::write(output, csv).with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Preprocessed {} rows ({} dropped) into {}",
        loaded.report.accepted,
        loaded.report.dropped,
        output.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_charts(
    schema: Schema,
    input: &Path,
    highest_path: Option<&Path>,
    config_path: Option<&Path>,
    output_dir: Option<PathBuf>,
    sequential: bool,
    report: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let steps = config.step_table()?;
    let mode = if sequential {
        ExecutionMode::Sequential
    } else {
        config.execution_mode()
    };
    let output_dir = output_dir.unwrap_or_else(|| config.output_dir());

    let mut unlabeled = 0;
    let jobs = match schema {
        Schema::Khoi => {
            let highest: HighestTable = match highest_path {
                Some(path) => load_highest_scores(path)?.rows.into_iter().collect(),
                None => {
                    info!("no highest-score table given, using the top populated bucket");
                    HighestTable::default()
                }
            };
            khoi_jobs(&load_khoi_table(input)?.rows, &steps, &highest)
        }
        Schema::Mon => {
            if highest_path.is_some() {
                bail!("--highest only applies to --schema khoi");
            }
            let rows = load_mon_table(input)?.rows;
            unlabeled = unlabeled_mon_rows(&rows);
            mon_jobs(&rows, &steps)
        }
    };

    let batch = run_batch(&jobs, mode)?;
    let manifest = save_chart_artifacts(&batch, schema, input, &output_dir)?;
    if report {
        write_reports(&batch, &output_dir)?;
    }

    print_summary(&batch);
    if unlabeled > 0 {
        println!("  Rows without block:  {unlabeled}");
    }
    println!("Artifacts saved to: {}", output_dir.display());
    println!("Input hash: {}", manifest.input_hash);
    Ok(())
}

fn write_reports(batch: &BatchResult, output_dir: &Path) -> Result<()> {
    for result in &batch.results {
        if let Ok(outcome) = &result.outcome {
            if let Some(stats) = outcome.statistics() {
                let path = output_dir.join(format!(
                    "{}.md",
                    scoredist_runner::chart_file_stem(stats)
                ));
                std::fs::write(&path, generate_chart_report(stats))
                    .with_context(|| format!("failed to write {}", path.display()))?;
            }
        }
    }
    Ok(())
}

fn print_summary(batch: &BatchResult) {
    let s = &batch.summary;
    println!("Combinations: {}", s.jobs);
    println!("  Generated:           {}", s.generated);
    println!("  Skipped (step):      {}", s.skipped_step);
    println!("  Skipped (no data):   {}", s.skipped_no_data);
    println!("  Failed:              {}", s.failed);
    println!("  Dropped candidates:  {}", s.dropped_candidates);

    for result in &batch.results {
        if let Err(e) = &result.outcome {
            eprintln!("  {} {}: {e}", result.year, result.category);
        }
    }
}

fn run_regional(
    averages_path: &Path,
    distribution_path: &Path,
    provinces_path: &Path,
    year: ExamYear,
    category: &str,
    config_path: Option<&Path>,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let category: Category = category
        .parse()
        .with_context(|| format!("unknown category '{category}'"))?;
    let config = load_config(config_path)?;
    let domains = config.color_domain_table()?;
    let output_dir = output_dir.unwrap_or_else(|| config.output_dir());

    let provinces = load_provinces(provinces_path)?.rows;
    let averages = load_averages(averages_path)?.rows;
    let distribution = load_province_scores(distribution_path)?.rows;

    let table = build_regional_table(
        year,
        category,
        RegionalInputs {
            provinces: &provinces,
            averages: &averages,
            distribution: &distribution,
        },
        &domains,
    )?;
    let path = save_regional_artifacts(&table, &output_dir)?;

    println!("{} {}: {} provinces", category, year, table.rows.len());
    if let Some(avg) = table.national.average {
        println!("  National average: {avg:.2}");
    }
    println!("  Candidates: {}", table.national.count);
    println!("Saved to: {}", path.display());
    Ok(())
}
