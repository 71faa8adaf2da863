use thiserror::Error;

/// Errors raised by the extraction/growth pipeline.
///
/// The two input-format failures are separate variants on purpose: a header
/// row without indicator columns and a workbook without the target city must
/// be reported differently to the operator.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no indicator columns found in header row {header_row} (wrong layout or skip-rows?)")]
    MissingIndicators { header_row: usize },

    #[error("no county rows found for city {city:?}")]
    NoMatchingCityData { city: String },

    #[error("indicator columns differ between the two input files")]
    IndicatorMismatch,

    #[error("invalid workbook: {0}")]
    InvalidFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XLSX read error: {0}")]
    XlsxRead(#[from] calamine::XlsxError),

    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),
}
