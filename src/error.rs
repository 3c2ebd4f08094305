use thiserror::Error;

/// Errors raised by the vector layer, the solver, and the `lmfit` binary.
///
/// Contract violations (length mismatches, capacity overruns) are reported
/// immediately and never retried. Numerical trouble during a fit is not an
/// error: it surfaces as a [`crate::domain::Termination`] on the report.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("requested length {requested} exceeds vector capacity {capacity}")]
    CapacityExceeded { requested: usize, capacity: usize },

    #[error("model expects {expected} parameters, got {actual}")]
    ParameterCount { expected: usize, actual: usize },

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FitError {
    /// Process exit code used by the `lmfit` binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            FitError::InvalidSettings(_) => 2,
            FitError::LengthMismatch { .. }
            | FitError::CapacityExceeded { .. }
            | FitError::ParameterCount { .. }
            | FitError::EmptyDataset => 3,
            FitError::Unsupported(_) => 4,
            FitError::Io(_) | FitError::Json(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_group_by_category() {
        assert_eq!(FitError::InvalidSettings("x".into()).exit_code(), 2);
        assert_eq!(FitError::LengthMismatch { left: 1, right: 2 }.exit_code(), 3);
        assert_eq!(FitError::Unsupported("exp").exit_code(), 4);
    }

    #[test]
    fn messages_name_the_offending_sizes() {
        let err = FitError::CapacityExceeded {
            requested: 3000,
            capacity: 2048,
        };
        assert_eq!(
            err.to_string(),
            "requested length 3000 exceeds vector capacity 2048"
        );
    }
}
