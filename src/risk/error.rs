//! Errors raised when classifier output breaks the engine's input contract

use crate::error::AppError;

/// Result type for risk engine operations
pub type RiskResult<T> = std::result::Result<T, RiskError>;

/// Classifier contract violations detected by the engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RiskError {
    /// Distribution does not have one entry per tier
    #[error("expected {expected} class probabilities, got {actual}")]
    WrongLength { expected: usize, actual: usize },

    /// A probability is NaN or outside [0, 1]
    #[error("probability for class {class} is outside [0, 1]: {value}")]
    OutOfRange { class: usize, value: f64 },

    /// Probabilities do not sum to 1
    #[error("class probabilities sum to {sum}, expected 1")]
    BadSum { sum: f64 },

    /// Predicted class index is not Low (0), Medium (1) or High (2)
    #[error("unrecognized predicted class index {0}")]
    UnknownClass(usize),
}

impl From<RiskError> for AppError {
    fn from(err: RiskError) -> Self {
        AppError::ClassifierContract(err.to_string())
    }
}
