use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IndicatorError {
    #[error("{indicator} needs {required} closes, got {available}")]
    InsufficientData {
        indicator: &'static str,
        required: usize,
        available: usize,
    },
    #[error("non-finite close at index {index}")]
    NonFiniteInput { index: usize },
    #[error("{indicator} period must be positive")]
    InvalidPeriod { indicator: &'static str },
}

impl IndicatorError {
    pub fn kind(&self) -> &'static str {
        match self {
            IndicatorError::InsufficientData { .. } => "insufficient_data",
            IndicatorError::NonFiniteInput { .. } => "non_finite_input",
            IndicatorError::InvalidPeriod { .. } => "invalid_period",
        }
    }
}

/// Reject NaN or infinite closes before any arithmetic runs
pub fn ensure_finite(values: &[f64]) -> Result<(), IndicatorError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(IndicatorError::NonFiniteInput { index }),
        None => Ok(()),
    }
}
