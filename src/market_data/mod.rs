// =============================================================================
// Market Data — daily close series and the source trait
// =============================================================================

pub mod yahoo;

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use yahoo::YahooClient;

/// One trading day's close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub close: f64,
}

/// Daily closes for one symbol, strictly ascending by date with every close
/// finite. The constructor enforces both.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self> {
        let symbol = symbol.into();
        if bars.is_empty() {
            anyhow::bail!("no price data for {symbol}");
        }
        if let Some(bar) = bars.iter().find(|b| !b.close.is_finite()) {
            anyhow::bail!("non-finite close {} on {} for {symbol}", bar.close, bar.date);
        }
        if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            anyhow::bail!(
                "price series for {symbol} is not strictly ascending: {} followed by {}",
                w[0].date,
                w[1].date
            );
        }
        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn last(&self) -> Option<&PriceBar> {
        self.bars.last()
    }
}

/// Anything that can supply a daily close series.
pub trait PriceSource {
    /// Closes for roughly the last `lookback_days` calendar days.
    async fn daily_closes(&self, symbol: &str, lookback_days: u32) -> Result<PriceSeries>;
}
