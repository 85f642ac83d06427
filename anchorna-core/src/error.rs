//! Error taxonomy for the anchor engine
//!
//! Per-position failures during the scan are not errors: anchor assembly
//! reports them as `Ok(None)`. Everything here halts the running operation.

use thiserror::Error;

/// Errors raised by the anchor engine
#[derive(Debug, Error)]
pub enum AnchorError {
    /// Thresholds, modes or identifiers that cannot work together
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed sequence input (zero-length sequences, mixed annotation)
    #[error("Invalid input data: {0}")]
    InputData(String),

    /// Arguments violating a function contract, e.g. unequal word lengths
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two anchors were joined although their flukes are incompatible
    #[error("Cannot merge anchors: {0}")]
    MergeIncompatibility(String),

    /// A cutout position could not be resolved for one sequence
    #[error("Cannot resolve cutout for sequence {seqid}: {reason}")]
    CutoutResolution { seqid: String, reason: String },

    /// Anchor sets that cannot be combined into one list
    #[error("Cannot combine anchors: {0}")]
    CombineConflict(String),
}

impl AnchorError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    pub fn input<S: Into<String>>(message: S) -> Self {
        Self::InputData(message.into())
    }

    pub fn cutout<S: Into<String>, R: Into<String>>(seqid: S, reason: R) -> Self {
        Self::CutoutResolution {
            seqid: seqid.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for anchor engine operations
pub type AnchorResult<T> = Result<T, AnchorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AnchorError::config("w must be positive");
        assert_eq!(err.to_string(), "Configuration error: w must be positive");

        let err = AnchorError::cutout("S1", "no fluke");
        assert!(matches!(err, AnchorError::CutoutResolution { .. }));
        assert_eq!(err.to_string(), "Cannot resolve cutout for sequence S1: no fluke");
    }
}
