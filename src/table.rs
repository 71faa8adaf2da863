//! Raw workbook loading and city/county extraction.
//!
//! The province-wide source workbooks have no declared schema: city names live
//! in column index 2 (merged cells, so most rows are blank and inherit the
//! last seen city), county names in column index 3, and indicator columns
//! start at index 4 with a stride of 2. Those positions are a convention of
//! the source files, not a general parsing rule.

use crate::error::PipelineError;
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::collections::HashMap;
use std::path::Path;

/// Column index holding the city name.
pub const CITY_COL: usize = 2;
/// Column index holding the county name.
pub const COUNTY_COL: usize = 3;
/// Row index (after skipped rows) holding the indicator names.
pub const INDICATOR_HEADER_ROW: usize = 1;
/// First column holding an indicator value.
pub const FIRST_VALUE_COL: usize = 4;
/// Indicator columns repeat every this many columns.
pub const VALUE_COL_STRIDE: usize = 2;

const EMPTY_CELL: CellValue = CellValue::Empty;

/// One untyped cell of a raw input table.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
}

impl CellValue {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::Empty => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Float(f) => CellValue::Number(*f),
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::Text(s.clone()),
            Data::DurationIso(s) => CellValue::Text(s.clone()),
            // Formula errors carry no usable value
            Data::Error(_) => CellValue::Empty,
        }
    }

    /// Trimmed text content, `None` for empty and whitespace-only cells.
    pub fn as_text(&self) -> Option<String> {
        let text = match self {
            CellValue::Empty => return None,
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Bool(b) => b.to_string(),
        };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Numeric coercion: numbers pass through, numeric strings parse,
    /// booleans map to 0/1. Everything else is absent.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        }
    }

    fn is_blank(&self) -> bool {
        self.as_text().is_none()
    }
}

/// An ordered grid of untyped cells, read from the first sheet of a workbook.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Load the first worksheet of an XLSX file, dropping `skip_rows` leading
    /// rows before the fixed table layout begins.
    pub fn load(path: &Path, skip_rows: usize) -> Result<Self, PipelineError> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let sheet_names = workbook.sheet_names().to_vec();
        let first_sheet = sheet_names.first().ok_or_else(|| {
            PipelineError::InvalidFormat("workbook contains no sheets".to_string())
        })?;

        let range = workbook.worksheet_range(first_sheet)?;
        let rows = range
            .rows()
            .skip(skip_rows)
            .map(|row| row.iter().map(CellValue::from_data).collect())
            .collect();

        Ok(Self { rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Cell at (row, col); out-of-bounds reads are empty.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// An indicator name and the raw-table column its values live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorSpec {
    pub name: String,
    pub column: usize,
}

/// One extracted county row; `values` is parallel to the indicator list.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub county: String,
    pub values: Vec<Option<f64>>,
}

/// All rows extracted for one city from one raw table.
#[derive(Debug, Clone)]
pub struct CityTable {
    pub city: String,
    /// Indicator names, in source column order.
    pub indicators: Vec<String>,
    pub rows: Vec<ExtractedRow>,
    /// Cells that held non-numeric, non-empty content and were coerced to
    /// absent. Aggregated so the run can surface one warning instead of
    /// failing or staying silent.
    pub coerced_cells: usize,
}

impl CityTable {
    /// First-match lookup of a value by county name and indicator index.
    pub fn value(&self, county: &str, indicator_idx: usize) -> Option<Option<f64>> {
        self.rows
            .iter()
            .find(|row| row.county == county)
            .map(|row| row.values[indicator_idx])
    }
}

/// Discover (name, column) pairs from the header row.
///
/// Blank header cells are skipped; embedded line breaks are stripped from
/// names. Returns an empty list when `header_row` is beyond the table, which
/// callers must treat as a hard input-format error.
pub fn extract_indicators(table: &RawTable, header_row: usize) -> Vec<IndicatorSpec> {
    if header_row >= table.row_count() {
        return Vec::new();
    }

    let mut indicators = Vec::new();
    let mut column = FIRST_VALUE_COL;
    while column < table.col_count() {
        if let Some(name) = table.cell(header_row, column).as_text() {
            indicators.push(IndicatorSpec {
                name: name.replace(['\r', '\n'], ""),
                column,
            });
        }
        column += VALUE_COL_STRIDE;
    }
    indicators
}

/// Scan every row, tracking the current city with forward-fill semantics,
/// and collect the rows whose city matches `city`.
///
/// A city cell, once seen, applies to subsequent blank-city rows (the source
/// files use merged city cells). Rows with a blank county under a matching
/// city are skipped silently. Non-numeric value cells become absent, never
/// zero.
pub fn extract_city_rows(table: &RawTable, city: &str, indicators: &[IndicatorSpec]) -> CityTable {
    let mut rows = Vec::new();
    let mut coerced_cells = 0usize;
    let mut current_city: Option<String> = None;

    for row_idx in 0..table.row_count() {
        if let Some(name) = table.cell(row_idx, CITY_COL).as_text() {
            current_city = Some(name);
        }

        if current_city.as_deref() != Some(city) {
            continue;
        }

        let county = match table.cell(row_idx, COUNTY_COL).as_text() {
            Some(name) => name,
            None => continue,
        };

        let values = indicators
            .iter()
            .map(|spec| {
                let cell = table.cell(row_idx, spec.column);
                let value = cell.as_number();
                if value.is_none() && !cell.is_blank() {
                    coerced_cells += 1;
                }
                value
            })
            .collect();

        rows.push(ExtractedRow { county, values });
    }

    CityTable {
        city: city.to_string(),
        indicators: indicators.iter().map(|spec| spec.name.clone()).collect(),
        rows,
        coerced_cells,
    }
}

/// Extract indicators and county rows for one city, distinguishing the two
/// failure kinds: a header row without indicators and a table without the
/// target city.
pub fn extract_city_table(table: &RawTable, city: &str) -> Result<CityTable, PipelineError> {
    let indicators = extract_indicators(table, INDICATOR_HEADER_ROW);
    if indicators.is_empty() {
        return Err(PipelineError::MissingIndicators {
            header_row: INDICATOR_HEADER_ROW,
        });
    }

    let extracted = extract_city_rows(table, city, &indicators);
    if extracted.rows.is_empty() {
        return Err(PipelineError::NoMatchingCityData {
            city: city.to_string(),
        });
    }

    warn_on_duplicate_counties(&extracted);
    Ok(extracted)
}

/// Duplicate county names make the later join ambiguous (first match wins),
/// so flag them instead of staying silent.
fn warn_on_duplicate_counties(table: &CityTable) {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    for row in &table.rows {
        *seen.entry(row.county.as_str()).or_insert(0) += 1;
    }

    let mut duplicates: Vec<&str> = seen
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name)
        .collect();
    if !duplicates.is_empty() {
        duplicates.sort_unstable();
        log::warn!(
            "duplicate county names in {} data (first match wins): {}",
            table.city,
            duplicates.join(", ")
        );
    }
}
