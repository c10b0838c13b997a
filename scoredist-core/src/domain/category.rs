//! Exam category identifiers: individual subjects (mon), subject blocks (khoi),
//! and total-score aggregates.
//!
//! Every identifier round-trips through its short code (`Toan`, `KhoiA`,
//! `TongDiemKHTN`), which is the spelling used by the input tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::year::ExamYear;

/// A category code that matches no known subject, block, or total.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown category code '{0}'")]
pub struct UnknownCategory(pub String);

/// A single exam subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    NguVan,
    Toan,
    NgoaiNgu,
    VatLy,
    HoaHoc,
    SinhHoc,
    LichSu,
    DiaLy,
    Gdcd,
    /// Combined natural-science paper (averaged onto the 10-point scale).
    Khtn,
    /// Combined social-science paper (averaged onto the 10-point scale).
    Khxh,
    KinhTePhapLuat,
    TinHoc,
    CongNgheCongNghiep,
    CongNgheNongNghiep,
}

impl Subject {
    pub const ALL: [Subject; 15] = [
        Subject::NguVan,
        Subject::Toan,
        Subject::NgoaiNgu,
        Subject::VatLy,
        Subject::HoaHoc,
        Subject::SinhHoc,
        Subject::LichSu,
        Subject::DiaLy,
        Subject::Gdcd,
        Subject::Khtn,
        Subject::Khxh,
        Subject::KinhTePhapLuat,
        Subject::TinHoc,
        Subject::CongNgheCongNghiep,
        Subject::CongNgheNongNghiep,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Subject::NguVan => "NguVan",
            Subject::Toan => "Toan",
            Subject::NgoaiNgu => "NgoaiNgu",
            Subject::VatLy => "VatLy",
            Subject::HoaHoc => "HoaHoc",
            Subject::SinhHoc => "SinhHoc",
            Subject::LichSu => "LichSu",
            Subject::DiaLy => "DiaLy",
            Subject::Gdcd => "GDCD",
            Subject::Khtn => "KHTN",
            Subject::Khxh => "KHXH",
            Subject::KinhTePhapLuat => "KinhTePhapLuat",
            Subject::TinHoc => "TinHoc",
            Subject::CongNgheCongNghiep => "CongNgheCongNghiep",
            Subject::CongNgheNongNghiep => "CongNgheNongNghiep",
        }
    }

    /// Vietnamese display name used in chart titles.
    pub fn display_name(self) -> &'static str {
        match self {
            Subject::NguVan => "Ngữ văn",
            Subject::Toan => "Toán",
            Subject::NgoaiNgu => "Ngoại ngữ",
            Subject::VatLy => "Vật lí",
            Subject::HoaHoc => "Hóa học",
            Subject::SinhHoc => "Sinh học",
            Subject::LichSu => "Lịch sử",
            Subject::DiaLy => "Địa lí",
            Subject::Gdcd => "Giáo dục công dân",
            Subject::Khtn => "3 môn Khoa học tự nhiên",
            Subject::Khxh => "3 môn Khoa học xã hội",
            Subject::KinhTePhapLuat => "Kinh tế Pháp luật",
            Subject::TinHoc => "Tin học",
            Subject::CongNgheCongNghiep => "Công nghệ - Công nghiệp",
            Subject::CongNgheNongNghiep => "Công nghệ - Nông nghiệp",
        }
    }
}

impl FromStr for Subject {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|subject| subject.code() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A subject block (khoi): a fixed combination of three subjects whose
/// scores are summed onto a 30-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Block {
    A,
    A1,
    B,
    C,
    D,
    A02,
    C01,
    D07,
}

impl Block {
    pub const ALL: [Block; 8] = [
        Block::A,
        Block::A1,
        Block::B,
        Block::C,
        Block::D,
        Block::A02,
        Block::C01,
        Block::D07,
    ];

    /// Bare block letter as printed on score sheets (`A1`).
    pub fn code(self) -> &'static str {
        match self {
            Block::A => "A",
            Block::A1 => "A1",
            Block::B => "B",
            Block::C => "C",
            Block::D => "D",
            Block::A02 => "A02",
            Block::C01 => "C01",
            Block::D07 => "D07",
        }
    }
}

impl FromStr for Block {
    type Err = UnknownCategory;

    /// Accepts both the bare letter (`A1`) and the prefixed form (`KhoiA1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed.strip_prefix("Khoi").unwrap_or(trimmed);
        Self::ALL
            .iter()
            .copied()
            .find(|block| block.code() == bare)
            .ok_or_else(|| UnknownCategory(trimmed.to_string()))
    }
}

/// Sum of all papers taken by a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TotalScore {
    TongDiem,
    TongDiemKhtn,
    TongDiemKhxh,
}

impl TotalScore {
    pub const ALL: [TotalScore; 3] = [
        TotalScore::TongDiem,
        TotalScore::TongDiemKhtn,
        TotalScore::TongDiemKhxh,
    ];

    pub fn code(self) -> &'static str {
        match self {
            TotalScore::TongDiem => "TongDiem",
            TotalScore::TongDiemKhtn => "TongDiemKHTN",
            TotalScore::TongDiemKhxh => "TongDiemKHXH",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TotalScore::TongDiem => "tổng điểm thi THPT",
            TotalScore::TongDiemKhtn => "tổng điểm thi THPT Tổ hợp Khoa học tự nhiên",
            TotalScore::TongDiemKhxh => "tổng điểm thi THPT Tổ hợp Khoa học xã hội",
        }
    }
}

impl FromStr for TotalScore {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|total| total.code() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Anything a distribution or an average can be reported for.
///
/// Serialized as its code string (`"Toan"`, `"KhoiD"`, `"TongDiem"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Subject(Subject),
    Block(Block),
    Total(TotalScore),
}

impl Category {
    pub fn code(&self) -> String {
        match self {
            Category::Subject(s) => s.code().to_string(),
            Category::Block(b) => format!("Khoi{}", b.code()),
            Category::Total(t) => t.code().to_string(),
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            Category::Subject(s) => s.display_name().to_string(),
            Category::Block(b) => b.code().to_string(),
            Category::Total(t) => t.display_name().to_string(),
        }
    }

    /// Highest attainable score for this category in the given year.
    ///
    /// Totals covered six papers up to 2024 and four from 2025 on.
    pub fn theoretical_max(&self, year: ExamYear) -> f64 {
        match self {
            Category::Subject(_) => 10.0,
            Category::Block(_) => 30.0,
            Category::Total(_) if year.get() <= 2024 => 60.0,
            Category::Total(_) => 40.0,
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(subject) = s.parse::<Subject>() {
            return Ok(Category::Subject(subject));
        }
        if let Ok(total) = s.parse::<TotalScore>() {
            return Ok(Category::Total(total));
        }
        s.parse::<Block>().map(Category::Block)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.code())
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.code()
    }
}

impl TryFrom<String> for Category {
    type Error = UnknownCategory;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Subject> for Category {
    fn from(subject: Subject) -> Self {
        Category::Subject(subject)
    }
}

impl From<Block> for Category {
    fn from(block: Block) -> Self {
        Category::Block(block)
    }
}

impl From<TotalScore> for Category {
    fn from(total: TotalScore) -> Self {
        Category::Total(total)
    }
}
