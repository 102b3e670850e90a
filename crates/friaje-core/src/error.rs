use thiserror::Error;

/// Errors raised by the zonal-statistics core.
///
/// A district with zero valid pixels is *not* an error: it produces a normal
/// record with `count = 0` and NaN statistics. Errors are reserved for inputs
/// the engine cannot meaningfully compute over.
#[derive(Debug, Error)]
pub enum ZonalError {
    /// No boundary features, or a raster with zero bands.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Raster metadata absent or inconsistent (band buffer vs. declared
    /// shape, degenerate transform, mismatched bands).
    #[error("raster shape mismatch: {0}")]
    ShapeMismatch(String),

    /// A department scope filter matched no rows; the quantile of an empty
    /// selection is undefined.
    #[error("scope matched no rows: {0}")]
    EmptyScope(String),

    /// Percentile outside [0, 1], or a malformed district identifier.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
