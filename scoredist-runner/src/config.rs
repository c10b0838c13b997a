//! TOML run configuration layered over the built-in tables.
//!
//! ```toml
//! output_dir = "results"
//! threads = 4
//! default_step = 0.25
//!
//! [steps.2025]
//! GDCD = "skip"
//! Toan = 0.2
//!
//! [color_domains]
//! Toan = [3.0, 8.0]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use scoredist_core::{
    Category, ColorDomainTable, ExamYear, ScoreDomain, StepDecision, StepTable, TableError,
};

use crate::pipeline::ExecutionMode;

pub const DEFAULT_OUTPUT_DIR: &str = "results";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown category code '{0}' in config")]
    UnknownCategory(String),

    #[error("invalid year '{0}' in config")]
    InvalidYear(String),

    #[error("invalid step '{value}' for {category}: expected a number or \"skip\"")]
    InvalidStepKeyword { category: String, value: String },

    #[error(transparent)]
    Table(#[from] TableError),
}

/// A step entry: a number or the keyword `"skip"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StepValue {
    Step(f64),
    Keyword(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    pub output_dir: Option<PathBuf>,
    /// Worker threads; rayon's global pool when unset.
    pub threads: Option<usize>,
    pub sequential: bool,
    pub default_step: Option<f64>,
    /// year → category code → step.
    pub steps: BTreeMap<String, BTreeMap<String, StepValue>>,
    /// category code → `[vmin, vmax]`.
    pub color_domains: BTreeMap<String, [f64; 2]>,
}

impl RunnerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        match (self.sequential, self.threads) {
            (true, _) => ExecutionMode::Sequential,
            (false, Some(n)) => ExecutionMode::Threads(n),
            (false, None) => ExecutionMode::Parallel,
        }
    }

    /// The built-in step table with this config's overrides applied.
    pub fn step_table(&self) -> Result<StepTable, ConfigError> {
        let mut table = StepTable::builtin();
        if let Some(step) = self.default_step {
            table.set_default_step(step)?;
        }

        for (year_text, entries) in &self.steps {
            let year = year_text
                .trim()
                .parse::<u16>()
                .map(ExamYear::new)
                .map_err(|_| ConfigError::InvalidYear(year_text.clone()))?;
            for (code, value) in entries {
                let category = parse_category(code)?;
                let decision = match value {
                    StepValue::Step(step) => StepDecision::Step(*step),
                    StepValue::Keyword(k) if k.eq_ignore_ascii_case("skip") => StepDecision::Skip,
                    StepValue::Keyword(k) => {
                        return Err(ConfigError::InvalidStepKeyword {
                            category: code.clone(),
                            value: k.clone(),
                        })
                    }
                };
                table.set(year, category, decision)?;
            }
        }
        Ok(table)
    }

    /// The built-in color domains with this config's overrides applied.
    pub fn color_domain_table(&self) -> Result<ColorDomainTable, ConfigError> {
        let mut table = ColorDomainTable::builtin();
        for (code, [vmin, vmax]) in &self.color_domains {
            table.set(parse_category(code)?, ScoreDomain::new(*vmin, *vmax))?;
        }
        Ok(table)
    }
}

fn parse_category(code: &str) -> Result<Category, ConfigError> {
    code.parse::<Category>()
        .map_err(|_| ConfigError::UnknownCategory(code.to_string()))
}
