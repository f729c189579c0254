// =============================================================================
// Validation errors for the pure signal pipeline
// =============================================================================

/// Raised by the indicator and smoothing code when the input series cannot be
/// used. Network and broker failures are reported through `anyhow` or through
/// the broker outcome enums instead.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SignalError {
    #[error("input series is empty")]
    EmptySeries,

    #[error("input series contains a non-finite value at index {index}")]
    NonFinite { index: usize },

    #[error("insufficient data: have {have} values, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("invalid parameters: {0}")]
    InvalidParams(String),
}

/// Reject empty series and series holding NaN or infinities.
pub fn ensure_finite(values: &[f64]) -> Result<(), SignalError> {
    if values.is_empty() {
        return Err(SignalError::EmptySeries);
    }
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(SignalError::NonFinite { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_rejected() {
        assert_eq!(ensure_finite(&[]), Err(SignalError::EmptySeries));
    }

    #[test]
    fn reports_first_bad_index() {
        let err = ensure_finite(&[1.0, f64::INFINITY, f64::NAN]).unwrap_err();
        assert_eq!(err, SignalError::NonFinite { index: 1 });
        assert_eq!(err.to_string(), "input series contains a non-finite value at index 1");
    }

    #[test]
    fn finite_series_passes() {
        assert!(ensure_finite(&[0.0, -1.5, 3.25]).is_ok());
    }
}
