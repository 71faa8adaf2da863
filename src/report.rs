//! Formatted workbook output.
//!
//! Three artifacts per run: one extracted table per year (county rows ×
//! indicator columns, two merged banner rows) and the comparison table
//! (three rows per indicator: current value, prior value, growth rate, one
//! column per county).
//!
//! Every workbook is saved to a `.xlsx.tmp` sibling and renamed into place on
//! success, so a failed write never leaves a truncated output file behind.

use crate::error::PipelineError;
use crate::growth::{GrowthRate, GrowthTable};
use crate::table::CityTable;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::fmt;
use std::fs;
use std::path::Path;

/// Fixed name of the comparison output file.
pub const COMPARISON_FILE_NAME: &str = "县级局分层分类基础数据.xlsx";

/// Output column header for the city column.
pub const CITY_COL_NAME: &str = "地市";
/// Output column header for the county column.
pub const COUNTY_COL_NAME: &str = "县级市、区";

const BANNER_TITLE: &str = "基础数据";
const BANNER_UNIT: &str = "单位：";

const LABEL_PRIOR: &str = "同期";
const LABEL_GROWTH: &str = "同比增幅%";
const INFINITE_GROWTH: &str = "无限增长";
const NOT_AVAILABLE: &str = "N/A";

/// Which year a per-year output file covers. Used in file names and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearLabel {
    Prior,
    Current,
}

impl fmt::Display for YearLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YearLabel::Prior => "去年",
            YearLabel::Current => "今年",
        })
    }
}

/// Deterministic name of a per-year output file.
pub fn year_file_name(city: &str, year: YearLabel) -> String {
    format!("{city}_指标数据_{year}.xlsx")
}

/// Write one year's extracted table.
///
/// Layout: two banner rows merged across all columns, a header row
/// (`地市`, `县级市、区`, indicator names), then one row per county. Absent
/// values stay blank. Columns are sized to their longest content.
pub fn write_year_table(table: &CityTable, path: &Path) -> Result<(), PipelineError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let column_count = 2 + table.indicators.len();
    let last_col = (column_count - 1) as u16;
    let plain = Format::new();

    worksheet.merge_range(0, 0, 0, last_col, BANNER_TITLE, &plain)?;
    worksheet.merge_range(1, 0, 1, last_col, BANNER_UNIT, &plain)?;

    worksheet.write_string(2, 0, CITY_COL_NAME)?;
    worksheet.write_string(2, 1, COUNTY_COL_NAME)?;
    for (idx, name) in table.indicators.iter().enumerate() {
        worksheet.write_string(2, (idx + 2) as u16, name)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let out_row = (row_idx + 3) as u32;
        worksheet.write_string(out_row, 0, &table.city)?;
        worksheet.write_string(out_row, 1, &row.county)?;
        for (idx, value) in row.values.iter().enumerate() {
            if let Some(value) = value {
                worksheet.write_number(out_row, (idx + 2) as u16, *value)?;
            }
        }
    }

    size_year_columns(worksheet, table)?;
    save_workbook(&mut workbook, path)
}

/// Width = longest of header and data, in characters, plus padding.
fn size_year_columns(worksheet: &mut Worksheet, table: &CityTable) -> Result<(), PipelineError> {
    let char_len = |s: &str| s.chars().count();

    let mut widths: Vec<usize> = Vec::with_capacity(2 + table.indicators.len());
    widths.push(char_len(CITY_COL_NAME).max(char_len(&table.city)));
    widths.push(
        table
            .rows
            .iter()
            .map(|row| char_len(&row.county))
            .max()
            .unwrap_or(0)
            .max(char_len(COUNTY_COL_NAME)),
    );
    for (idx, name) in table.indicators.iter().enumerate() {
        let data_width = table
            .rows
            .iter()
            .map(|row| row.values[idx].map(|v| v.to_string().len()).unwrap_or(0))
            .max()
            .unwrap_or(0);
        widths.push(char_len(name).max(data_width));
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, (width + 2) as f64)?;
    }
    Ok(())
}

/// Write the comparison table: header row `指标名称` + one column per county,
/// then three rows per indicator (current, prior, growth).
///
/// Every cell is centered with thin borders, the header row is bold, and
/// yellow fill lands on the rows the fixed three-row cycle highlights
/// (header plus each prior and growth row). Values render as `#,##0.00`,
/// growth as `#,##0.00"%"`, with `无限增长` / `N/A` literals for infinite
/// and undefined growth.
pub fn write_comparison_table(growth: &GrowthTable, path: &Path) -> Result<(), PipelineError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let base = Format::new()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let header = base.clone().set_bold().set_background_color("#FFFF00");
    let text_hi = base.clone().set_background_color("#FFFF00");
    let value_plain = base.clone().set_num_format("#,##0.00");
    let value_hi = value_plain.clone().set_background_color("#FFFF00");
    let growth_hi = base
        .clone()
        .set_background_color("#FFFF00")
        .set_num_format("#,##0.00\"%\"");

    let text_format = |row: u32| if row_is_highlighted(row) { &text_hi } else { &base };
    let value_format = |row: u32| {
        if row_is_highlighted(row) {
            &value_hi
        } else {
            &value_plain
        }
    };

    worksheet.write_string_with_format(0, 0, "指标名称", &header)?;
    for (idx, county) in growth.counties.iter().enumerate() {
        worksheet.write_string_with_format(0, (idx + 1) as u16, county, &header)?;
    }

    for (indicator_idx, indicator) in growth.indicators.iter().enumerate() {
        let current_row = (indicator_idx * 3 + 1) as u32;
        let prior_row = current_row + 1;
        let growth_row = current_row + 2;

        worksheet.write_string_with_format(
            current_row,
            0,
            display_name(&indicator.name),
            text_format(current_row),
        )?;
        worksheet.write_string_with_format(prior_row, 0, LABEL_PRIOR, text_format(prior_row))?;
        worksheet.write_string_with_format(growth_row, 0, LABEL_GROWTH, text_format(growth_row))?;

        for (county_idx, record) in indicator.records.iter().enumerate() {
            let col = (county_idx + 1) as u16;
            match record {
                Some(record) => {
                    // Absent values display as zero inside a joined record
                    worksheet.write_number_with_format(
                        current_row,
                        col,
                        record.current.unwrap_or(0.0),
                        value_format(current_row),
                    )?;
                    worksheet.write_number_with_format(
                        prior_row,
                        col,
                        record.prior.unwrap_or(0.0),
                        value_format(prior_row),
                    )?;
                    match record.rate {
                        GrowthRate::Percent(rate) => {
                            worksheet.write_number_with_format(growth_row, col, rate, &growth_hi)?;
                        }
                        GrowthRate::Infinite => {
                            worksheet.write_string_with_format(
                                growth_row,
                                col,
                                INFINITE_GROWTH,
                                text_format(growth_row),
                            )?;
                        }
                        GrowthRate::Undefined => {
                            worksheet.write_string_with_format(
                                growth_row,
                                col,
                                NOT_AVAILABLE,
                                text_format(growth_row),
                            )?;
                        }
                    }
                }
                None => {
                    // County missing from one year's rows: no figures at all
                    for row in [current_row, prior_row, growth_row] {
                        worksheet.write_string_with_format(
                            row,
                            col,
                            NOT_AVAILABLE,
                            text_format(row),
                        )?;
                    }
                }
            }
        }
    }

    worksheet.set_column_width(0, 15)?;
    for idx in 0..growth.counties.len() {
        worksheet.set_column_width((idx + 1) as u16, 10)?;
    }

    save_workbook(&mut workbook, path)
}

/// The label column drops the `（unit）` suffix from indicator names.
fn display_name(name: &str) -> &str {
    match name.split_once('（') {
        Some((head, _)) => head,
        None => name,
    }
}

/// The three-row cycle highlights the header and each prior/growth row; only
/// current-value rows stay unfilled.
fn row_is_highlighted(row: u32) -> bool {
    row % 3 != 1
}

/// Save via a temp sibling and rename into place; remove the temp file when
/// the write itself fails.
fn save_workbook(workbook: &mut Workbook, path: &Path) -> Result<(), PipelineError> {
    let tmp = path.with_extension("xlsx.tmp");
    match workbook.save(&tmp) {
        Ok(()) => {
            fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp);
            Err(err.into())
        }
    }
}
