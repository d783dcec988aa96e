use thiserror::Error;

/// Errors raised while loading matcher configuration.
///
/// Matching itself never fails: poor data shows up as unmatched records and
/// discrepancies, not as an `Err`.
#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// A knob is out of range (negative tolerance, threshold above 1, ...).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
}
