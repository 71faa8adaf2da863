//! Year-over-year growth computation.
//!
//! Joins the two extracted year tables on county name, per indicator, and
//! computes a percentage growth figure with sentinel outcomes for zero or
//! absent prior values.

use crate::error::PipelineError;
use crate::table::CityTable;
use std::collections::BTreeSet;

/// Growth of one indicator value between the two years.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrowthRate {
    /// Percentage change, `(current - prior) / prior * 100`.
    Percent(f64),
    /// Prior year absent or zero, current year non-zero.
    Infinite,
    /// Neither year carries a usable figure.
    Undefined,
}

/// Joined values for one (indicator, county) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrowthRecord {
    pub prior: Option<f64>,
    pub current: Option<f64>,
    pub rate: GrowthRate,
}

/// One indicator's records, parallel to the county list of the table.
#[derive(Debug, Clone)]
pub struct IndicatorGrowth {
    pub name: String,
    /// `None` where the county is missing from either year's rows.
    pub records: Vec<Option<GrowthRecord>>,
}

/// The full comparison: counties in prior-year order, one record set per
/// indicator.
#[derive(Debug, Clone)]
pub struct GrowthTable {
    pub counties: Vec<String>,
    pub indicators: Vec<IndicatorGrowth>,
}

/// Growth-rate laws. Absent and zero priors are equivalent: both mean there
/// is nothing to divide by.
pub fn growth_rate(prior: Option<f64>, current: Option<f64>) -> GrowthRate {
    match prior {
        Some(p) if p != 0.0 => match current {
            Some(c) => GrowthRate::Percent((c - p) / p * 100.0),
            // nothing this year to compare against
            None => GrowthRate::Undefined,
        },
        _ => match current {
            Some(c) if c != 0.0 => GrowthRate::Infinite,
            _ => GrowthRate::Undefined,
        },
    }
}

/// Sign-invert every value of the indicators named in `negatives`, so that
/// "lower is better" metrics read as improvements when they fall.
///
/// `negatives` is a set, so selecting the same indicator twice cannot
/// double-invert. Names that match no indicator are ignored here; callers
/// warn about them.
pub fn invert_negative_indicators(table: &mut CityTable, negatives: &BTreeSet<String>) {
    let negative_columns: Vec<usize> = table
        .indicators
        .iter()
        .enumerate()
        .filter(|(_, name)| negatives.contains(*name))
        .map(|(idx, _)| idx)
        .collect();

    for row in &mut table.rows {
        for &idx in &negative_columns {
            if let Some(value) = row.values[idx].as_mut() {
                *value = -*value;
            }
        }
    }
}

/// Join the two years on county name and compute growth per indicator.
///
/// County order comes from the prior-year table, and lookups take the first
/// matching row in each year. A county missing from the current year's rows
/// yields an absent record rather than an error.
pub fn compute_growth(prior: &CityTable, current: &CityTable) -> Result<GrowthTable, PipelineError> {
    if prior.indicators != current.indicators {
        return Err(PipelineError::IndicatorMismatch);
    }

    let counties: Vec<String> = prior.rows.iter().map(|row| row.county.clone()).collect();

    let indicators = prior
        .indicators
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            let records = counties
                .iter()
                .map(|county| {
                    let prior_value = prior.value(county, idx)?;
                    let current_value = current.value(county, idx)?;
                    Some(GrowthRecord {
                        prior: prior_value,
                        current: current_value,
                        rate: growth_rate(prior_value, current_value),
                    })
                })
                .collect();
            IndicatorGrowth {
                name: name.clone(),
                records,
            }
        })
        .collect();

    Ok(GrowthTable {
        counties,
        indicators,
    })
}
