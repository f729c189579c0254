// =============================================================================
// MACD (Moving Average Convergence Divergence)
// =============================================================================
//
//   macd      = EMA(close, fast) - EMA(close, slow)
//   signal    = EMA(macd, signal)
//   histogram = macd - signal
//
// All three series are aligned 1:1 with the input closes.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, SignalError};
use crate::indicators::ema::calculate_ema;

fn default_fast() -> usize {
    12
}

fn default_slow() -> usize {
    26
}

fn default_signal() -> usize {
    9
}

/// EMA spans for the MACD computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacdParams {
    #[serde(default = "default_fast")]
    pub fast: usize,

    #[serde(default = "default_slow")]
    pub slow: usize,

    #[serde(default = "default_signal")]
    pub signal: usize,
}

impl Default for MacdParams {
    fn default() -> Self {
        Self {
            fast: default_fast(),
            slow: default_slow(),
            signal: default_signal(),
        }
    }
}

impl MacdParams {
    /// Spans must be positive and the fast span strictly shorter than the slow one.
    pub fn validate(&self) -> Result<(), SignalError> {
        if self.fast == 0 || self.slow == 0 || self.signal == 0 {
            return Err(SignalError::InvalidParams(format!(
                "MACD spans must be positive (fast={}, slow={}, signal={})",
                self.fast, self.slow, self.signal
            )));
        }
        if self.fast >= self.slow {
            return Err(SignalError::InvalidParams(format!(
                "fast span {} must be shorter than slow span {}",
                self.fast, self.slow
            )));
        }
        Ok(())
    }
}

/// MACD line, signal line and histogram for one close series.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// Compute the MACD series for `closes`.
///
/// Fails on an empty or non-finite series and on invalid spans.
pub fn calculate_macd(closes: &[f64], params: &MacdParams) -> Result<MacdSeries, SignalError> {
    params.validate()?;
    ensure_finite(closes)?;

    let fast = calculate_ema(closes, params.fast);
    let slow = calculate_ema(closes, params.slow);

    let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = calculate_ema(&macd, params.signal);
    let histogram = macd.iter().zip(&signal).map(|(m, s)| m - s).collect();

    Ok(MacdSeries {
        macd,
        signal,
        histogram,
    })
}
