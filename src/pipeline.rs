//! Pipeline orchestration for programmatic use by the CLI or an embedding
//! application.
//!
//! One call runs the whole strictly sequential pass: extract both years,
//! write the per-year tables, resolve the negative-indicator selection,
//! invert, compute growth, write the comparison table. Returns structured
//! data instead of printing to stdout.

use crate::growth::{compute_growth, invert_negative_indicators};
use crate::report::{
    write_comparison_table, write_year_table, year_file_name, YearLabel, COMPARISON_FILE_NAME,
};
use crate::selection::NegativeIndicatorSelector;
use crate::table::{extract_city_table, CityTable, RawTable};
use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

// ============================================================================
// Process
// ============================================================================

/// Configuration for one processing run.
pub struct ProcessConfig {
    /// Prior-year input workbook
    pub prior_input: PathBuf,
    /// Current-year input workbook
    pub current_input: PathBuf,
    /// Directory the three output workbooks are written into
    pub output_dir: PathBuf,
    /// City whose county rows are extracted
    pub city: String,
    /// Leading rows to drop before the fixed table layout begins
    pub skip_rows: usize,
}

/// Progress information reported between pipeline stages.
pub struct StageProgress {
    /// Rough completion percentage
    pub percent: u8,
    /// Operator-readable description of the running stage
    pub message: String,
}

/// Summary of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub prior_output: PathBuf,
    pub current_output: PathBuf,
    pub comparison_output: PathBuf,
    pub counties: usize,
    pub indicators: usize,
    /// Negative indicators actually applied (unknown names are dropped)
    pub negative_indicators: Vec<String>,
    /// Non-numeric value cells coerced to absent across both inputs
    pub coerced_cells: usize,
}

/// Run the full extraction/growth/report pipeline.
///
/// `on_progress` is called between stages. Return `false` from the callback
/// to cancel; a cancelled run stops before its next stage and reports an
/// error, leaving any outputs already renamed into place untouched.
pub fn run_process(
    config: &ProcessConfig,
    selector: &mut dyn NegativeIndicatorSelector,
    mut on_progress: impl FnMut(&StageProgress) -> bool,
) -> Result<RunReport> {
    if !config.output_dir.is_dir() {
        bail!(
            "output directory {} does not exist",
            config.output_dir.display()
        );
    }

    let mut progress = |percent: u8, message: String| -> Result<()> {
        if !on_progress(&StageProgress { percent, message }) {
            bail!("processing cancelled");
        }
        Ok(())
    };

    progress(
        10,
        format!("reading prior-year file {}", config.prior_input.display()),
    )?;
    let mut prior = load_city_table(&config.prior_input, config, YearLabel::Prior)?;

    progress(
        30,
        format!(
            "reading current-year file {}",
            config.current_input.display()
        ),
    )?;
    let mut current = load_city_table(&config.current_input, config, YearLabel::Current)?;

    // Year tables carry the raw extracted values, so they are written before
    // any sign inversion.
    progress(50, "writing per-year tables".to_string())?;
    let prior_output = config
        .output_dir
        .join(year_file_name(&config.city, YearLabel::Prior));
    write_year_table(&prior, &prior_output)
        .with_context(|| format!("failed to write {}", prior_output.display()))?;
    let current_output = config
        .output_dir
        .join(year_file_name(&config.city, YearLabel::Current));
    write_year_table(&current, &current_output)
        .with_context(|| format!("failed to write {}", current_output.display()))?;

    progress(60, "selecting negative indicators".to_string())?;
    let selected = selector
        .select(&prior.indicators)
        .context("negative-indicator selection failed")?;
    let (applied, unknown) = partition_selection(selected, &prior.indicators);
    if !unknown.is_empty() {
        log::warn!(
            "ignoring negative indicators not present in the data: {}",
            unknown.join(", ")
        );
    }

    progress(70, "applying sign inversion".to_string())?;
    invert_negative_indicators(&mut prior, &applied);
    invert_negative_indicators(&mut current, &applied);

    progress(80, "computing year-over-year growth".to_string())?;
    let growth = compute_growth(&prior, &current)?;

    progress(90, "writing comparison table".to_string())?;
    let comparison_output = config.output_dir.join(COMPARISON_FILE_NAME);
    write_comparison_table(&growth, &comparison_output)
        .with_context(|| format!("failed to write {}", comparison_output.display()))?;

    let coerced_cells = prior.coerced_cells + current.coerced_cells;
    if coerced_cells > 0 {
        log::warn!("{coerced_cells} non-numeric value cells were treated as absent");
    }

    progress(100, "done".to_string())?;

    Ok(RunReport {
        prior_output,
        current_output,
        comparison_output,
        counties: growth.counties.len(),
        indicators: growth.indicators.len(),
        negative_indicators: applied.into_iter().collect(),
        coerced_cells,
    })
}

fn load_city_table(path: &Path, config: &ProcessConfig, year: YearLabel) -> Result<CityTable> {
    let raw = RawTable::load(path, config.skip_rows)
        .with_context(|| format!("failed to read {year} file {}", path.display()))?;
    let table = extract_city_table(&raw, &config.city).with_context(|| {
        format!(
            "failed to extract {} data from {year} file {}",
            config.city,
            path.display()
        )
    })?;
    log::info!(
        "{year}: {} county rows, {} indicators",
        table.rows.len(),
        table.indicators.len()
    );
    Ok(table)
}

/// Split a selection into names present in the data and names that are not.
fn partition_selection(
    selected: BTreeSet<String>,
    indicators: &[String],
) -> (BTreeSet<String>, Vec<String>) {
    let (applied, unknown): (BTreeSet<String>, BTreeSet<String>) = selected
        .into_iter()
        .partition(|name| indicators.contains(name));
    (applied, unknown.into_iter().collect())
}

/// Discover the indicator names of a single workbook, for scripting a
/// negative-indicator list without running the full pipeline.
pub fn list_indicators(input: &Path, skip_rows: usize) -> Result<Vec<String>> {
    use crate::error::PipelineError;
    use crate::table::{extract_indicators, INDICATOR_HEADER_ROW};

    let raw = RawTable::load(input, skip_rows)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let indicators = extract_indicators(&raw, INDICATOR_HEADER_ROW);
    if indicators.is_empty() {
        return Err(PipelineError::MissingIndicators {
            header_row: INDICATOR_HEADER_ROW,
        })
        .with_context(|| format!("no indicators in {}", input.display()));
    }
    Ok(indicators.into_iter().map(|spec| spec.name).collect())
}
