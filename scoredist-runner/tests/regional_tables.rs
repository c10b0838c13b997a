use std::path::{Path, PathBuf};

use scoredist_core::{Category, ColorDomainTable, ExamYear, Rgb, Subject};
use scoredist_runner::{
    build_regional_table, import_regional_json, load_averages, load_province_scores,
    load_provinces, save_regional_artifacts, RegionalError, RegionalInputs,
};

fn write_file(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path
}

const PROVINCES: &str = "\
Province_Code,ten_tinh
1.0,Hà Nội
79,TP. Hồ Chí Minh
2,Hà Giang
";

const AVERAGES: &str = "\
Year,Subject,Province_Code,Average_Score
2024,Toan,1.0,6.5
2024,Toan,79,7.1
2024,Toan,99,6.8
2024,VatLy,1,5.0
";

const DISTRIBUTION: &str = "\
Year,Subject,Province_Code,Score,Count,Cumulative
2024,Toan,1,4.5,10,30
2024,Toan,1,6,15,20
2024,Toan,1,10,5,5
2024,Toan,79.0,5,8,
2024,Toan,79.0,9.25,4,
";

#[test]
fn province_tables_load_rank_and_save() {
    let dir = tempfile::tempdir().unwrap();
    let provinces = load_provinces(&write_file(dir.path(), "p.csv", PROVINCES)).unwrap().rows;
    let averages = load_averages(&write_file(dir.path(), "a.csv", AVERAGES)).unwrap().rows;
    let distribution =
        load_province_scores(&write_file(dir.path(), "d.csv", DISTRIBUTION)).unwrap().rows;

    let codes: Vec<&str> = provinces.iter().map(|p| p.code.as_str()).collect();
    assert_eq!(codes, vec!["01", "79", "02"]);

    let table = build_regional_table(
        ExamYear::new(2024),
        Subject::Toan.into(),
        RegionalInputs {
            provinces: &provinces,
            averages: &averages,
            distribution: &distribution,
        },
        &ColorDomainTable::builtin(),
    )
    .unwrap();

    // Hà Giang has neither an average nor a distribution
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[0].name, "TP. Hồ Chí Minh");
    assert_eq!(table.rows[1].rank, 2);
    assert_eq!(table.rows[1].count, 30);
    assert_ne!(table.rows[0].color, Rgb::MISSING);
    assert_eq!(table.national.count, 42);
    assert_eq!(table.national.average, Some(6.8));

    let out = dir.path().join("results");
    let json_path = save_regional_artifacts(&table, &out).unwrap();
    let restored = import_regional_json(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(restored.rows.len(), 2);
    assert_eq!(restored.national, table.national);

    let csv = std::fs::read_to_string(out.join("regional_2024_Toan.csv")).unwrap();
    assert_eq!(csv.lines().count(), 4);
}

#[test]
fn category_without_rows_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let provinces = load_provinces(&write_file(dir.path(), "p.csv", PROVINCES)).unwrap().rows;
    let averages = load_averages(&write_file(dir.path(), "a.csv", AVERAGES)).unwrap().rows;

    let category: Category = Subject::HoaHoc.into();
    let err = build_regional_table(
        ExamYear::new(2024),
        category,
        RegionalInputs {
            provinces: &provinces,
            averages: &averages,
            distribution: &[],
        },
        &ColorDomainTable::builtin(),
    )
    .unwrap_err();
    assert!(matches!(err, RegionalError::NoData { .. }));
}
