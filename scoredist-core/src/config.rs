//! Lookup tables: bin step per (year, category) and color domain per category.
//!
//! Both tables resolve with an explicit fallback, so a lookup never fails.
//! The built-in contents reproduce the published chart settings; the runner
//! layers TOML overrides on top with [`StepTable::set`] and
//! [`ColorDomainTable::set`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::binning::validate_step;
use crate::color::ScoreDomain;
use crate::domain::{Block, Category, ExamYear, Subject, TotalScore};

/// Step used for any (year, category) without an entry.
pub const DEFAULT_STEP: f64 = 0.25;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TableError {
    #[error("default step must be a positive multiple of 0.001, got {0}")]
    InvalidDefaultStep(f64),

    #[error("step for {category} in {year} must be a positive multiple of 0.001, got {step}")]
    InvalidStep {
        year: ExamYear,
        category: Category,
        step: f64,
    },

    #[error("color domain for {category} must satisfy vmin < vmax, got ({vmin}, {vmax})")]
    InvalidDomain {
        category: Category,
        vmin: f64,
        vmax: f64,
    },
}

/// What to do with one (year, category) combination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepDecision {
    Step(f64),
    /// Do not chart this combination at all.
    Skip,
}

impl StepDecision {
    pub fn step(self) -> Option<f64> {
        match self {
            StepDecision::Step(s) => Some(s),
            StepDecision::Skip => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepTable {
    default_step: f64,
    entries: BTreeMap<(ExamYear, Category), StepDecision>,
}

impl StepTable {
    /// A table with no entries; every lookup resolves to `default_step`.
    pub fn with_default(default_step: f64) -> Self {
        Self {
            default_step,
            entries: BTreeMap::new(),
        }
    }

    /// Steps used by the published charts.
    ///
    /// 2016 graded maths in quarters and the foreign-language and science
    /// papers in fifths; 2017–2024 graded maths and foreign language in
    /// fifths; 2025 drops civic education from the charts.
    pub fn builtin() -> Self {
        let mut table = Self::with_default(DEFAULT_STEP);
        let y2016 = ExamYear::new(2016);
        table.insert(y2016, Subject::Toan.into(), StepDecision::Step(0.25));
        for subject in [Subject::NgoaiNgu, Subject::VatLy, Subject::HoaHoc, Subject::SinhHoc] {
            table.insert(y2016, subject.into(), StepDecision::Step(0.2));
        }
        for year in 2017..=2024 {
            for subject in [Subject::Toan, Subject::NgoaiNgu] {
                table.insert(ExamYear::new(year), subject.into(), StepDecision::Step(0.2));
            }
        }
        table.insert(ExamYear::new(2025), Subject::Gdcd.into(), StepDecision::Skip);
        table
    }

    fn insert(&mut self, year: ExamYear, category: Category, decision: StepDecision) {
        self.entries.insert((year, category), decision);
    }

    /// Add or replace one entry. Steps must pass [`validate_step`].
    pub fn set(
        &mut self,
        year: ExamYear,
        category: Category,
        decision: StepDecision,
    ) -> Result<(), TableError> {
        if let StepDecision::Step(step) = decision {
            if validate_step(step).is_err() {
                return Err(TableError::InvalidStep {
                    year,
                    category,
                    step,
                });
            }
        }
        self.insert(year, category, decision);
        Ok(())
    }

    pub fn resolve(&self, year: ExamYear, category: Category) -> StepDecision {
        self.entries
            .get(&(year, category))
            .copied()
            .unwrap_or(StepDecision::Step(self.default_step))
    }

    /// Replace the fallback step, keeping every explicit entry.
    pub fn set_default_step(&mut self, step: f64) -> Result<(), TableError> {
        if validate_step(step).is_err() {
            return Err(TableError::InvalidDefaultStep(step));
        }
        self.default_step = step;
        Ok(())
    }

    pub fn default_step(&self) -> f64 {
        self.default_step
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for StepTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Where a resolved color domain came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainSource {
    Table,
    /// No entry; `(0, theoretical_max)` was used.
    Fallback,
}

/// Per-category color ranges tuned to the spread of observed averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorDomainTable {
    entries: BTreeMap<Category, ScoreDomain>,
}

impl ColorDomainTable {
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn builtin() -> Self {
        use Subject::*;
        let subjects: [(Subject, f64, f64); 15] = [
            (DiaLy, 4.16, 8.07),
            (HoaHoc, 3.93, 7.52),
            (Khtn, 3.88, 7.29),
            (LichSu, 2.92, 7.44),
            (NgoaiNgu, 2.58, 7.23),
            (NguVan, 3.65, 8.17),
            (SinhHoc, 3.89, 7.32),
            (Toan, 2.99, 7.83),
            (VatLy, 3.81, 7.5),
            (Gdcd, 5.98, 9.11),
            (Khxh, 4.74, 8.45),
            (CongNgheCongNghiep, 4.1, 8.62),
            (CongNgheNongNghiep, 7.03, 8.5),
            (KinhTePhapLuat, 6.82, 8.43),
            (TinHoc, 5.23, 9.11),
        ];
        let blocks: [(Block, f64, f64); 8] = [
            (Block::A, 12.2, 22.93),
            (Block::A02, 12.22, 22.5),
            (Block::A1, 11.41, 22.46),
            (Block::B, 12.32, 22.52),
            (Block::C, 12.19, 23.42),
            (Block::C01, 13.08, 23.46),
            (Block::D, 10.37, 21.71),
            (Block::D07, 11.49, 22.5),
        ];
        let totals: [(TotalScore, f64, f64); 3] = [
            (TotalScore::TongDiem, 21.03, 45.88),
            (TotalScore::TongDiemKhtn, 24.26, 44.04),
            (TotalScore::TongDiemKhxh, 24.87, 46.79),
        ];

        let entries = subjects
            .into_iter()
            .map(|(s, lo, hi)| (Category::Subject(s), ScoreDomain::new(lo, hi)))
            .chain(
                blocks
                    .into_iter()
                    .map(|(b, lo, hi)| (Category::Block(b), ScoreDomain::new(lo, hi))),
            )
            .chain(
                totals
                    .into_iter()
                    .map(|(t, lo, hi)| (Category::Total(t), ScoreDomain::new(lo, hi))),
            )
            .collect();
        Self { entries }
    }

    pub fn set(&mut self, category: Category, domain: ScoreDomain) -> Result<(), TableError> {
        if !(domain.vmin.is_finite() && domain.vmax.is_finite() && domain.vmin < domain.vmax) {
            return Err(TableError::InvalidDomain {
                category,
                vmin: domain.vmin,
                vmax: domain.vmax,
            });
        }
        self.entries.insert(category, domain);
        Ok(())
    }

    pub fn get(&self, category: Category) -> Option<ScoreDomain> {
        self.entries.get(&category).copied()
    }

    /// Tuned domain for `category`, or `(0, theoretical_max)` with
    /// [`DomainSource::Fallback`].
    pub fn resolve(&self, category: Category, year: ExamYear) -> (ScoreDomain, DomainSource) {
        match self.get(category) {
            Some(domain) => (domain, DomainSource::Table),
            None => (
                ScoreDomain::full(category.theoretical_max(year)),
                DomainSource::Fallback,
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ColorDomainTable {
    fn default() -> Self {
        Self::builtin()
    }
}
