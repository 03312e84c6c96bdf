use std::fmt;

/// Configuration problems that abort a run.
///
/// Designed outcomes (no alignment coverage, a rejected wobble pairing) are
/// never reported through this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsoError {
    /// Requested gap is longer than the oligo
    GapTooLong { gap: usize, length: usize },
    /// Explicit wing/gap triple does not add up to the oligo length
    BadCoords { coords: String, length: usize },
    /// Malformed `chr(strand):start-end` string
    BadLocus(String),
    /// Other invalid settings, e.g. no target assembly
    Config(String),
}

impl fmt::Display for AsoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsoError::GapTooLong { gap, length } => {
                write!(f, "Gap length {} exceeds sequence length {}", gap, length)
            }
            AsoError::BadCoords { coords, length } => write!(
                f,
                "Gapmer coordinates {} do not fit a sequence of length {}",
                coords, length
            ),
            AsoError::BadLocus(s) => write!(f, "Invalid locus: {}", s),
            AsoError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for AsoError {}
