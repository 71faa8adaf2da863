//! Integration tests for the full extraction/growth pipeline.
//!
//! Fixture workbooks are written with rust_xlsxwriter in the province-wide
//! source layout (city in column 2 behind merged-cell semantics, county in
//! column 3, indicator header in row 1 at column 4 with stride 2), then the
//! pipeline runs against them and the generated outputs are read back with
//! calamine.

use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use county_growth_toolkit::pipeline::run_process;
use county_growth_toolkit::table::{extract_city_table, RawTable};
use county_growth_toolkit::{FixedSelection, PipelineError, ProcessConfig};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

/// One fixture data row: optional city cell, county, indicator values.
type FixtureRow<'a> = (Option<&'a str>, &'a str, &'a [Option<f64>]);

/// Write an input workbook in the source layout, with `junk_rows` extra rows
/// above it (what the --skip-rows flag is for).
fn write_input_workbook(
    path: &Path,
    junk_rows: u32,
    indicators: &[&str],
    rows: &[FixtureRow],
) {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for junk in 0..junk_rows {
        sheet.write_string(junk, 0, "说明").unwrap();
    }

    sheet.write_string(junk_rows, 0, "全省基础数据").unwrap();
    for (idx, name) in indicators.iter().enumerate() {
        sheet
            .write_string(junk_rows + 1, (4 + idx * 2) as u16, *name)
            .unwrap();
    }

    for (row_idx, (city, county, values)) in rows.iter().enumerate() {
        let row = junk_rows + 2 + row_idx as u32;
        if let Some(city) = city {
            sheet.write_string(row, 2, *city).unwrap();
        }
        sheet.write_string(row, 3, *county).unwrap();
        for (idx, value) in values.iter().enumerate() {
            if let Some(value) = value {
                sheet.write_number(row, (4 + idx * 2) as u16, *value).unwrap();
            }
        }
    }

    workbook.save(path).unwrap();
}

fn read_sheet(path: &Path) -> Range<Data> {
    let mut workbook: Xlsx<_> = open_workbook(path).unwrap();
    workbook.worksheet_range("Sheet1").unwrap()
}

fn cell_text(range: &Range<Data>, row: u32, col: u32) -> String {
    match range.get_value((row, col)) {
        Some(Data::String(s)) => s.clone(),
        other => panic!("expected text at ({row},{col}), got {other:?}"),
    }
}

fn cell_number(range: &Range<Data>, row: u32, col: u32) -> f64 {
    match range.get_value((row, col)) {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        other => panic!("expected number at ({row},{col}), got {other:?}"),
    }
}

fn config(dir: &Path, prior: &Path, current: &Path, city: &str, skip_rows: usize) -> ProcessConfig {
    ProcessConfig {
        prior_input: prior.to_path_buf(),
        current_input: current.to_path_buf(),
        output_dir: dir.to_path_buf(),
        city: city.to_string(),
        skip_rows,
    }
}

fn fixture_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join("prior.xlsx"), dir.join("current.xlsx"))
}

#[test]
fn end_to_end_growth_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let (prior_path, current_path) = fixture_paths(dir.path());

    write_input_workbook(
        &prior_path,
        0,
        &["销量（件）"],
        &[
            (Some("X"), "甲县", &[Some(10.0)]),
            (None, "乙县", &[Some(20.0)]),
        ],
    );
    write_input_workbook(
        &current_path,
        0,
        &["销量（件）"],
        &[
            (Some("X"), "甲县", &[Some(15.0)]),
            (None, "乙县", &[Some(8.0)]),
        ],
    );

    let config = config(dir.path(), &prior_path, &current_path, "X", 0);
    let report = run_process(&config, &mut FixedSelection::default(), |_| true).unwrap();

    assert_eq!(report.counties, 2);
    assert_eq!(report.indicators, 1);
    assert_eq!(report.coerced_cells, 0);
    assert!(report.prior_output.exists());
    assert!(report.current_output.exists());
    assert_eq!(
        report.comparison_output.file_name().unwrap(),
        "县级局分层分类基础数据.xlsx"
    );

    let comparison = read_sheet(&report.comparison_output);
    // Header plus exactly three rows for the one indicator, one data column
    // per county beyond the label column.
    assert_eq!(comparison.height(), 4);
    assert_eq!(comparison.width(), 3);

    assert_eq!(cell_text(&comparison, 0, 0), "指标名称");
    assert_eq!(cell_text(&comparison, 0, 1), "甲县");
    assert_eq!(cell_text(&comparison, 0, 2), "乙县");

    // Current values, with the （unit） suffix stripped from the label
    assert_eq!(cell_text(&comparison, 1, 0), "销量");
    assert_eq!(cell_number(&comparison, 1, 1), 15.0);
    assert_eq!(cell_number(&comparison, 1, 2), 8.0);

    // Prior values
    assert_eq!(cell_text(&comparison, 2, 0), "同期");
    assert_eq!(cell_number(&comparison, 2, 1), 10.0);
    assert_eq!(cell_number(&comparison, 2, 2), 20.0);

    // Growth: 10 -> 15 is +50%, 20 -> 8 is -60%
    assert_eq!(cell_text(&comparison, 3, 0), "同比增幅%");
    assert_eq!(cell_number(&comparison, 3, 1), 50.0);
    assert_eq!(cell_number(&comparison, 3, 2), -60.0);
}

#[test]
fn year_table_round_trips_the_extracted_values() {
    let dir = tempfile::tempdir().unwrap();
    let (prior_path, current_path) = fixture_paths(dir.path());

    let rows: &[FixtureRow] = &[
        (Some("X"), "甲县", &[Some(10.0), None]),
        (None, "乙县", &[Some(20.5), Some(3.0)]),
    ];
    write_input_workbook(&prior_path, 0, &["销量（件）", "收入（元）"], rows);
    write_input_workbook(&current_path, 0, &["销量（件）", "收入（元）"], rows);

    let config = config(dir.path(), &prior_path, &current_path, "X", 0);
    let report = run_process(&config, &mut FixedSelection::default(), |_| true).unwrap();

    // The in-memory table the file was written from
    let raw = RawTable::load(&prior_path, 0).unwrap();
    let expected = extract_city_table(&raw, "X").unwrap();

    let sheet = read_sheet(&report.prior_output);
    assert_eq!(cell_text(&sheet, 0, 0), "基础数据");
    assert_eq!(cell_text(&sheet, 1, 0), "单位：");
    assert_eq!(cell_text(&sheet, 2, 0), "地市");
    assert_eq!(cell_text(&sheet, 2, 1), "县级市、区");

    for (idx, name) in expected.indicators.iter().enumerate() {
        assert_eq!(&cell_text(&sheet, 2, (idx + 2) as u32), name);
    }

    for (row_idx, row) in expected.rows.iter().enumerate() {
        let sheet_row = (row_idx + 3) as u32;
        assert_eq!(cell_text(&sheet, sheet_row, 0), "X");
        assert_eq!(&cell_text(&sheet, sheet_row, 1), &row.county);
        for (idx, value) in row.values.iter().enumerate() {
            let col = (idx + 2) as u32;
            match value {
                Some(value) => assert_eq!(cell_number(&sheet, sheet_row, col), *value),
                None => assert!(matches!(
                    sheet.get_value((sheet_row, col)),
                    None | Some(Data::Empty)
                )),
            }
        }
    }
}

#[test]
fn negative_indicators_invert_the_comparison_but_not_the_year_tables() {
    let dir = tempfile::tempdir().unwrap();
    let (prior_path, current_path) = fixture_paths(dir.path());

    write_input_workbook(
        &prior_path,
        0,
        &["投诉率（%）"],
        &[(Some("X"), "甲县", &[Some(10.0)])],
    );
    write_input_workbook(
        &current_path,
        0,
        &["投诉率（%）"],
        &[(Some("X"), "甲县", &[Some(15.0)])],
    );

    let config = config(dir.path(), &prior_path, &current_path, "X", 0);
    let mut selector = FixedSelection::new(vec!["投诉率（%）".to_string()]);
    let report = run_process(&config, &mut selector, |_| true).unwrap();
    assert_eq!(report.negative_indicators, ["投诉率（%）"]);

    // Year tables keep the raw signs
    let year = read_sheet(&report.prior_output);
    assert_eq!(cell_number(&year, 3, 2), 10.0);

    // The comparison reflects the inversion
    let comparison = read_sheet(&report.comparison_output);
    assert_eq!(cell_number(&comparison, 1, 1), -15.0);
    assert_eq!(cell_number(&comparison, 2, 1), -10.0);
    assert_eq!(cell_number(&comparison, 3, 1), 50.0);
}

#[test]
fn infinite_and_undefined_growth_render_as_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let (prior_path, current_path) = fixture_paths(dir.path());

    write_input_workbook(
        &prior_path,
        0,
        &["销量（件）"],
        &[(Some("X"), "甲县", &[None]), (None, "乙县", &[None])],
    );
    write_input_workbook(
        &current_path,
        0,
        &["销量（件）"],
        &[(Some("X"), "甲县", &[Some(50.0)]), (None, "乙县", &[None])],
    );

    let config = config(dir.path(), &prior_path, &current_path, "X", 0);
    let report = run_process(&config, &mut FixedSelection::default(), |_| true).unwrap();

    let comparison = read_sheet(&report.comparison_output);
    // Absent values display as zero inside a joined record
    assert_eq!(cell_number(&comparison, 1, 1), 50.0);
    assert_eq!(cell_number(&comparison, 2, 1), 0.0);
    assert_eq!(cell_text(&comparison, 3, 1), "无限增长");
    assert_eq!(cell_text(&comparison, 3, 2), "N/A");
}

#[test]
fn skip_rows_recovers_a_shifted_layout() {
    let dir = tempfile::tempdir().unwrap();
    let (prior_path, current_path) = fixture_paths(dir.path());

    for path in [&prior_path, &current_path] {
        write_input_workbook(
            path,
            3,
            &["销量（件）"],
            &[(Some("X"), "甲县", &[Some(10.0)])],
        );
    }

    // Without skipping, the header row is junk
    let config_bad = config(dir.path(), &prior_path, &current_path, "X", 0);
    assert!(run_process(&config_bad, &mut FixedSelection::default(), |_| true).is_err());

    let config_ok = config(dir.path(), &prior_path, &current_path, "X", 3);
    let report = run_process(&config_ok, &mut FixedSelection::default(), |_| true).unwrap();
    assert_eq!(report.counties, 1);
}

#[test]
fn missing_city_is_reported_as_its_own_error_kind() {
    let dir = tempfile::tempdir().unwrap();
    let (prior_path, current_path) = fixture_paths(dir.path());

    for path in [&prior_path, &current_path] {
        write_input_workbook(
            path,
            0,
            &["销量（件）"],
            &[(Some("Y"), "甲县", &[Some(10.0)])],
        );
    }

    let config = config(dir.path(), &prior_path, &current_path, "X", 0);
    let err = run_process(&config, &mut FixedSelection::default(), |_| true).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoMatchingCityData { .. })
    ));
}

#[test]
fn cancelling_from_the_progress_callback_stops_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let (prior_path, current_path) = fixture_paths(dir.path());

    for path in [&prior_path, &current_path] {
        write_input_workbook(
            path,
            0,
            &["销量（件）"],
            &[(Some("X"), "甲县", &[Some(10.0)])],
        );
    }

    let config = config(dir.path(), &prior_path, &current_path, "X", 0);
    let err = run_process(&config, &mut FixedSelection::default(), |_| false).unwrap_err();
    assert!(err.to_string().contains("cancelled"));
    // Cancelled before the first stage ran, so nothing was written
    assert!(!dir.path().join("X_指标数据_去年.xlsx").exists());
}
