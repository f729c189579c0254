// =============================================================================
// Signals Module
// =============================================================================
//
// - Wavelet denoising of the MACD line
// - Crossover rule turning smoothed MACD vs. signal into a trade decision

pub mod crossover;
pub mod wavelet;

pub use crossover::{decide, Crossover};
pub use wavelet::{denoise, Wavelet};
