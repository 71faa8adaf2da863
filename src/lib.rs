//! County Growth Toolkit
//!
//! Extracts one city's county rows from two province-wide indicator
//! workbooks (prior-year and current-year), computes year-over-year growth
//! per indicator, and writes three formatted spreadsheet outputs.
//!
//! This library provides:
//! - `table`: raw workbook loading, indicator discovery, city/county extraction
//! - `growth`: sign inversion and the year-over-year growth computation
//! - `report`: the three formatted XLSX output writers
//! - `pipeline`: end-to-end orchestration with progress reporting
//!
//! Binaries:
//! - `county-growth`: CLI front end for the pipeline

pub mod error;
pub mod growth;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod table;

// Re-export commonly used types
pub use error::PipelineError;
pub use growth::{GrowthRate, GrowthRecord, GrowthTable};
pub use pipeline::{ProcessConfig, RunReport};
pub use selection::{FixedSelection, NegativeIndicatorSelector};
pub use table::{CityTable, ExtractedRow, IndicatorSpec, RawTable};
