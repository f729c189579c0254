// =============================================================================
// Crossover Rule — smoothed MACD vs. signal line
// =============================================================================
//
//   diff_t = smoothed_macd_t - signal_t
//
//   prev < 0 && curr > 0 && position == 0  => BUY
//   prev > 0 && curr < 0 && position > 0   => SELL
//   anything else                          => HOLD
//
// An exact zero on either side is not a crossing. The series are aligned by
// their last element, so they may differ in length.
// =============================================================================

use serde::Serialize;

use crate::error::SignalError;
use crate::types::Decision;

/// Direction of a sign change in `smoothed - signal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CrossDirection {
    Bullish,
    Bearish,
}

/// The two trailing differences the rule is evaluated on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crossover {
    pub prev_diff: f64,
    pub curr_diff: f64,
}

impl Crossover {
    /// Take the last two differences of `smoothed - signal`.
    pub fn from_series(smoothed: &[f64], signal: &[f64]) -> Result<Self, SignalError> {
        let have = smoothed.len().min(signal.len());
        if have < 2 {
            return Err(SignalError::InsufficientData { have, need: 2 });
        }
        let (s, g) = (&smoothed[smoothed.len() - 2..], &signal[signal.len() - 2..]);
        Ok(Self {
            prev_diff: s[0] - g[0],
            curr_diff: s[1] - g[1],
        })
    }

    pub fn direction(&self) -> Option<CrossDirection> {
        if self.prev_diff < 0.0 && self.curr_diff > 0.0 {
            Some(CrossDirection::Bullish)
        } else if self.prev_diff > 0.0 && self.curr_diff < 0.0 {
            Some(CrossDirection::Bearish)
        } else {
            None
        }
    }

    /// Apply the position gate to this crossover.
    pub fn decision(&self, position: i64, quantity: u32) -> Decision {
        match self.direction() {
            Some(CrossDirection::Bullish) if position == 0 => Decision::Buy { quantity },
            Some(CrossDirection::Bearish) if position > 0 => Decision::Sell { quantity },
            _ => Decision::Hold,
        }
    }
}

/// Decide what to do given the smoothed MACD line, the signal line and the
/// currently held share count.
pub fn decide(
    smoothed_macd: &[f64],
    signal: &[f64],
    position: i64,
    quantity: u32,
) -> Result<Decision, SignalError> {
    Ok(Crossover::from_series(smoothed_macd, signal)?.decision(position, quantity))
}
