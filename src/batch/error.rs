use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while assembling a batch.
///
/// All variants describe malformed caller input. A `feed` that returns one of
/// these leaves the builder's previous batch untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BatchError {
    /// A variable-length or indexed field does not fit its fixed capacity.
    #[error("{field} out of range: {value} exceeds capacity {capacity}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        capacity: usize,
    },

    /// An episode is empty, or carries no communication state past its first step.
    #[error("invalid episode {episode}: {reason}")]
    InvalidEpisode { episode: usize, reason: String },

    /// A caller-supplied batch does not match the configured shape.
    #[error("shape mismatch for {field}: expected {expected}, got {actual}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BatchError {
    pub(crate) fn out_of_range(field: &'static str, value: usize, capacity: usize) -> Self {
        BatchError::OutOfRange {
            field,
            value,
            capacity,
        }
    }

    pub(crate) fn shape(field: &'static str, expected: usize, actual: usize) -> Self {
        BatchError::ShapeMismatch {
            field,
            expected,
            actual,
        }
    }

    /// Fails with [`BatchError::ShapeMismatch`] unless `actual == expected`.
    pub(crate) fn check_len(
        field: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), BatchError> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::shape(field, expected, actual))
        }
    }
}
