use anyhow::Result;
use energysheets::{
    cache::CacheStatus,
    config::Config,
    pipeline::{run, RunOutcome},
    report::{RunReport, SheetOutcome},
    source::{read_sheet, CellValue},
};
use rust_xlsxwriter::Workbook;
use std::{fs, path::Path};
use tempfile::tempdir;

#[derive(Clone, Copy)]
enum Cell {
    T(&'static str),
    N(f64),
    E,
}
use Cell::{E, N, T};

static HEADERS: [&str; 4] = ["能源类型", "表号", "实际消耗", "费用(元)"];

fn write_workbook(path: &Path, sheets: &[(&str, &[&str], Vec<Vec<Cell>>)]) -> Result<()> {
    let mut workbook = Workbook::new();
    for (name, headers, rows) in sheets {
        let sheet = workbook.add_worksheet().set_name(*name)?;
        for (c, h) in headers.iter().enumerate() {
            sheet.write_string(0, c as u16, *h)?;
        }
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = ((r + 1) as u32, c as u16);
                match cell {
                    T(s) => {
                        sheet.write_string(r, c, *s)?;
                    }
                    N(n) => {
                        sheet.write_number(r, c, *n)?;
                    }
                    E => {}
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

fn meters_a(feb_electricity: f64) -> Vec<(&'static str, &'static [&'static str], Vec<Vec<Cell>>)> {
    vec![
        (
            "2024-01",
            &HEADERS[..],
            vec![
                vec![T("电"), T("0012"), N(30.0), N(60.0)],
                // merged cell: category continues from the row above
                vec![E, N(13.0), N(20.0), N(40.0)],
                vec![T(" 自来水 "), N(14.0), N(10.0), N(20.0)],
            ],
        ),
        (
            "2024-02",
            &HEADERS[..],
            vec![
                vec![T("电"), T("0012"), N(75.0), N(feb_electricity)],
                vec![T("自来水"), N(14.0), N(0.0), N(0.0)],
            ],
        ),
    ]
}

fn setup(input: &Path, feb_electricity: f64) -> Result<()> {
    fs::create_dir_all(input)?;
    write_workbook(&input.join("a.xlsx"), &meters_a(feb_electricity))?;
    write_workbook(
        &input.join("b.xlsx"),
        &[(
            "2024-01",
            &["能源类型", "表号", "实际消耗"][..],
            vec![vec![T("电"), N(1.0), N(999.0)]],
        )],
    )?;
    write_workbook(
        &input.join("c.xlsx"),
        &[(
            "2024-02",
            &HEADERS[..],
            vec![
                vec![T("燃气"), N(7.0), N(2.0), N(5.0)],
                vec![T("蒸汽"), N(8.0), N(1.0), N(1000.0)],
            ],
        )],
    )?;
    // an editor lock file next to the real workbook
    fs::write(input.join("~$a.xlsx"), b"locked")?;
    Ok(())
}

fn config(root: &Path) -> Config {
    let mut cfg = Config::with_dirs(root.join("input"), root.join("output"));
    cfg.paths.cache_dir = Some(root.join("cache"));
    cfg
}

fn sheet_status(report: &RunReport, file: &str, sheet: &str) -> Option<CacheStatus> {
    report
        .files
        .iter()
        .find(|f| f.file == file)?
        .sheets
        .iter()
        .find(|s| s.sheet == sheet)?
        .cache
}

fn number(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) => *n,
        other => panic!("expected a number, got {:?}", other),
    }
}

#[test]
fn first_run_writes_summary_and_cache() -> Result<()> {
    let dir = tempdir()?;
    setup(&dir.path().join("input"), 150.0)?;
    let cfg = config(dir.path());

    let result = run(&cfg)?;
    assert_eq!(result.outcome, RunOutcome::Written(cfg.output_path()));

    let out = read_sheet(cfg.output_path(), "Sheet1")?;
    assert_eq!(
        out.headers,
        vec![
            "日期区间",
            "电_费用(元)",
            "采暖热表_费用(元)",
            "生活热水表_费用(元)",
            "自来水_费用(元)",
            "中水_费用(元)",
            "燃气_费用(元)",
            "总费用(元)"
        ]
    );
    assert_eq!(out.rows.len(), 2);
    assert_eq!(out.rows[0][0], CellValue::Text("2024-01".into()));
    assert_eq!(number(&out.rows[0][1]), 100.0);
    assert_eq!(number(&out.rows[0][4]), 20.0);
    assert_eq!(number(&out.rows[0][7]), 120.0);
    assert_eq!(out.rows[1][0], CellValue::Text("2024-02".into()));
    assert_eq!(number(&out.rows[1][1]), 150.0);
    assert_eq!(number(&out.rows[1][6]), 5.0);
    // unrecognized categories never reach the aggregate
    assert_eq!(number(&out.rows[1][7]), 155.0);

    let report = &result.report;
    assert_eq!(report.files.len(), 3, "lock file must be skipped");
    assert_eq!(report.summarized_sheets, 3);
    let b = report.files.iter().find(|f| f.file == "b.xlsx").unwrap();
    assert_eq!(b.sheets[0].outcome, SheetOutcome::SchemaViolation);
    assert_eq!(b.sheets[0].cache, None);
    assert_eq!(sheet_status(report, "a.xlsx", "2024-01"), Some(CacheStatus::New));

    let cache = dir.path().join("cache");
    assert!(cache.join("a_2024-01.parquet").is_file());
    assert!(cache.join("a_2024-02.parquet").is_file());
    assert!(cache.join("c_2024-02.parquet").is_file());
    assert!(!cache.join("b_2024-01.parquet").exists());
    assert!(cfg.report_path().is_file());
    Ok(())
}

#[test]
fn rerun_matches_and_mismatch_leaves_cache_alone() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("input");
    setup(&input, 150.0)?;
    let cfg = config(dir.path());

    run(&cfg)?;
    let second = run(&cfg)?;
    for (file, sheet) in [("a.xlsx", "2024-01"), ("a.xlsx", "2024-02"), ("c.xlsx", "2024-02")] {
        assert_eq!(
            sheet_status(&second.report, file, sheet),
            Some(CacheStatus::Match),
            "{} / {}",
            file,
            sheet
        );
    }

    let entry = dir.path().join("cache").join("a_2024-02.parquet");
    let before = fs::read(&entry)?;
    write_workbook(&input.join("a.xlsx"), &meters_a(160.0))?;

    let third = run(&cfg)?;
    assert_eq!(
        sheet_status(&third.report, "a.xlsx", "2024-02"),
        Some(CacheStatus::Mismatch)
    );
    assert_eq!(
        sheet_status(&third.report, "a.xlsx", "2024-01"),
        Some(CacheStatus::Match)
    );
    assert_eq!(fs::read(&entry)?, before);

    // the changed sheet still contributes its fresh totals
    let table = third.table.unwrap();
    assert_eq!(table.column("电_费用(元)"), Some(vec![100.0, 160.0]));
    Ok(())
}

#[test]
fn file_names_do_not_change_the_result() -> Result<()> {
    let dir = tempdir()?;
    let first = dir.path().join("one");
    let second = dir.path().join("two");
    setup(&first.join("input"), 150.0)?;
    fs::create_dir_all(second.join("input"))?;
    // same contents, reversed discovery order
    fs::copy(first.join("input/a.xlsx"), second.join("input/z.xlsx"))?;
    fs::copy(first.join("input/c.xlsx"), second.join("input/a.xlsx"))?;

    let left = run(&config(&first))?.table.unwrap();
    let right = run(&config(&second))?.table.unwrap();
    assert_eq!(left, right);
    Ok(())
}

#[test]
fn nothing_processed_writes_only_the_report() -> Result<()> {
    let dir = tempdir()?;
    let input = dir.path().join("input");
    fs::create_dir_all(&input)?;
    write_workbook(
        &input.join("b.xlsx"),
        &[("2024-01", &["能源类型", "实际消耗"][..], vec![vec![T("电"), N(1.0)]])],
    )?;
    fs::write(input.join("broken.xlsx"), b"not a zip archive")?;
    let cfg = config(dir.path());

    let result = run(&cfg)?;
    assert_eq!(result.outcome, RunOutcome::NothingProcessed);
    assert!(result.table.is_none());
    assert!(!cfg.output_path().exists());
    assert!(cfg.report_path().is_file());

    let broken = result
        .report
        .files
        .iter()
        .find(|f| f.file == "broken.xlsx")
        .unwrap();
    assert!(broken.error.is_some());
    assert!(broken.sheets.is_empty());
    Ok(())
}

#[test]
fn missing_input_dir_is_an_error() {
    let dir = tempdir().unwrap();
    let cfg = config(dir.path());
    assert!(run(&cfg).is_err());
}
