use serde::{Deserialize, Serialize};
use std::fmt;

/// Calendar year of an exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExamYear(u16);

impl ExamYear {
    pub fn new(year: u16) -> Self {
        Self(year)
    }

    pub fn get(self) -> u16 {
        self.0
    }

    pub fn era(self) -> ExamEra {
        match self.0 {
            0..=2014 => ExamEra::UniversityEntrance,
            2015..=2019 => ExamEra::NationalHighSchool,
            _ => ExamEra::Graduation,
        }
    }

    /// Before 2015 each block sat its own paper, so subject distributions are
    /// reported per (subject, block) rather than per subject.
    pub fn splits_subjects_by_block(self) -> bool {
        self.era() == ExamEra::UniversityEntrance
    }
}

impl From<u16> for ExamYear {
    fn from(year: u16) -> Self {
        Self(year)
    }
}

impl fmt::Display for ExamYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Exam format in force for a given year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamEra {
    /// University entrance exam (up to 2014).
    UniversityEntrance,
    /// National high-school exam (2015–2019).
    NationalHighSchool,
    /// High-school graduation exam (2020 onward).
    Graduation,
}
