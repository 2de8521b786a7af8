use thiserror::Error;

/// Errors surfaced by the timing-model components.
///
/// Structural errors (index reuse, inverted bounds, family mismatch) are raised at
/// mutation time, before any query can observe a broken state. Unsupported-regime
/// errors are never recovered locally: a wrong formula must not be silently
/// substituted for the requested one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TimingError {
    #[error("solar wind dispersion not implemented for power-law index p = {0} (requires p > 1)")]
    UnsupportedPowerLawIndex(f64),

    #[error("unknown solar wind geometry selector: {0}")]
    UnsupportedSolarWindModel(String),

    #[error("segment index {0} is already in use in this model; choose another")]
    IndexInUse(u16),

    #[error("starting MJD {start} is greater than ending MJD {end}")]
    InvertedRange { start: f64, end: f64 },

    #[error("only one MJD bound is set for segment range")]
    PartialRange,

    #[error("segment parameter family '{family}' does not match the value family at index {index}")]
    SegmentFamilyMismatch { family: &'static str, index: u16 },

    #[error("no TOAs fall inside the ranges of these non-frozen parameters: {}", .0.join(", "))]
    MissingToas(Vec<String>),

    #[error("no derivative registered for parameter '{0}'")]
    UnknownParameter(String),

    #[error("model has no segment covering MJD {0}")]
    NoSegmentAtEpoch(f64),

    #[error("relativistic Kepler iteration did not converge after {iterations} steps")]
    ConvergenceFailed { iterations: usize },

    #[error("model failed validation after a structural mutation and must be rebuilt")]
    NotValidated,

    #[error("binary parameter {0} is missing or non-physical")]
    MissingBinaryParameter(&'static str),
}
