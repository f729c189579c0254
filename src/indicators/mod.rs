// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator code. Every output series is aligned 1:1
// with its input.

pub mod ema;
pub mod macd;

pub use macd::{calculate_macd, MacdParams, MacdSeries};
