// =============================================================================
// Strategy — one fetch / compute / decide / trade cycle
// =============================================================================
//
// Pipeline:
//   1. Fetch daily closes
//   2. MACD line and signal line (EMA 12/26/9 by default)
//   3. Wavelet-denoise the MACD line
//   4. Sign of (smoothed - signal) at t-1 and t
//   5. Read the live position from the broker
//   6. Crossover rule => BUY / SELL / HOLD
//   7. Execute and record a CycleReport
//
// Any failure in 1-5 abandons the cycle. An unknown position (lookup failed)
// is never treated as flat.
// =============================================================================

use std::sync::Arc;

use tracing::{debug, info};

use crate::broker::{Brokerage, PositionLookup};
use crate::cycle_report::{CycleReport, CycleStage};
use crate::error::SignalError;
use crate::execution::ExecutionEngine;
use crate::indicators::{calculate_macd, MacdParams, MacdSeries};
use crate::market_data::PriceSource;
use crate::runtime_config::BotConfig;
use crate::signals::{decide, denoise, Crossover, Wavelet};

// =============================================================================
// Pure evaluation
// =============================================================================

/// Everything computed from one close series.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub macd: MacdSeries,
    pub smoothed: Vec<f64>,
    pub crossover: Crossover,
}

/// Compute MACD, smooth it and extract the trailing crossover.
pub fn evaluate(
    closes: &[f64],
    params: &MacdParams,
    wavelet: Wavelet,
) -> Result<Evaluation, SignalError> {
    let macd = calculate_macd(closes, params)?;
    let smoothed = denoise(&macd.macd, wavelet)?;
    let crossover = Crossover::from_series(&smoothed, &macd.signal)?;
    Ok(Evaluation {
        macd,
        smoothed,
        crossover,
    })
}

// =============================================================================
// Trading bot
// =============================================================================

pub struct TradingBot<P, B> {
    config: BotConfig,
    source: P,
    broker: Arc<B>,
    engine: ExecutionEngine<B>,
}

impl<P: PriceSource, B: Brokerage> TradingBot<P, B> {
    pub fn new(config: BotConfig, source: P, broker: Arc<B>) -> Self {
        let engine = ExecutionEngine::new(broker.clone(), config.time_in_force, config.dry_run);
        Self {
            config,
            source,
            broker,
            engine,
        }
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Run one cycle. Never fails; problems are recorded in the report,
    /// which is also logged.
    pub async fn run_cycle(&self) -> CycleReport {
        let report = self.cycle().await;
        report.log();
        report
    }

    async fn cycle(&self) -> CycleReport {
        let symbol = self.config.symbol.as_str();
        let mut report = CycleReport::start(symbol);
        info!(symbol, cycle_id = %report.id, "running strategy");

        // ── 1. Market data ──────────────────────────────────────────────
        let series = match self
            .source
            .daily_closes(symbol, self.config.lookback_days)
            .await
        {
            Ok(series) => series,
            Err(e) => return report.abandon(CycleStage::MarketData, format!("{e:#}")),
        };
        report.bars = Some(series.len());
        report.last_close = series.last().map(|b| b.close);
        if let (Some(first), Some(last)) = (series.bars().first(), series.last()) {
            debug!(symbol = series.symbol(), bars = series.len(), from = %first.date, to = %last.date, "price history loaded");
        }

        // ── 2-4. Signal ─────────────────────────────────────────────────
        let eval = match evaluate(&series.closes(), &self.config.macd, self.config.wavelet) {
            Ok(eval) => eval,
            Err(e) => return report.abandon(CycleStage::Signal, e.to_string()),
        };
        report.macd = eval.macd.macd.last().copied();
        report.smoothed_macd = eval.smoothed.last().copied();
        report.signal = eval.macd.signal.last().copied();
        report.prev_diff = Some(eval.crossover.prev_diff);
        report.curr_diff = Some(eval.crossover.curr_diff);
        debug!(
            symbol,
            prev_diff = eval.crossover.prev_diff,
            curr_diff = eval.crossover.curr_diff,
            "crossover evaluated"
        );

        // ── 5. Position ─────────────────────────────────────────────────
        let position = match self.broker.position(symbol).await {
            PositionLookup::Failed(reason) => {
                return report.abandon(CycleStage::Position, format!("position lookup failed: {reason}"))
            }
            lookup => lookup.shares().unwrap_or_default(),
        };
        report.position = Some(position);

        // ── 6-7. Decide and execute ─────────────────────────────────────
        let decision = match decide(&eval.smoothed, &eval.macd.signal, position, self.config.quantity) {
            Ok(decision) => decision,
            Err(e) => return report.abandon(CycleStage::Signal, e.to_string()),
        };
        report.decision = Some(decision);
        if decision.order().is_none() {
            info!(symbol, position, "no crossover, holding");
        }

        let result = self.engine.execute(symbol, decision).await;
        report.execution = Some(result);
        report
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::OrderOutcome;
    use crate::execution::tests::FakeBroker;
    use crate::market_data::{PriceBar, PriceSeries};
    use crate::execution::ExecutionResult;
    use crate::types::{Decision, Side};
    use anyhow::Result;
    use chrono::{Duration, NaiveDate};

    /// Serves a fixed close series, or an error when `closes` is empty.
    struct FakeSource {
        closes: Vec<f64>,
    }

    impl PriceSource for FakeSource {
        async fn daily_closes(&self, symbol: &str, _lookback_days: u32) -> Result<PriceSeries> {
            if self.closes.is_empty() {
                anyhow::bail!("YFinance returned no data for symbol: {symbol}");
            }
            let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
            let bars = self
                .closes
                .iter()
                .enumerate()
                .map(|(i, &close)| PriceBar {
                    date: start + Duration::days(i as i64),
                    close,
                })
                .collect();
            PriceSeries::new(symbol, bars)
        }
    }

    /// Oscillating closes with a 20-bar cycle. Its prefixes end on both
    /// kinds of crossover within the first 100 bars.
    fn oscillating_path() -> Vec<f64> {
        (0..200)
            .map(|i| 100.0 + 10.0 * (2.0 * std::f64::consts::PI * i as f64 / 20.0).sin())
            .collect()
    }

    /// Shortest prefix whose final two diffs satisfy `cond`.
    fn prefix_ending_with(cond: impl Fn(&Crossover) -> bool) -> Vec<f64> {
        let path = oscillating_path();
        (30..=path.len())
            .map(|n| path[..n].to_vec())
            .find(|closes| {
                evaluate(closes, &MacdParams::default(), Wavelet::Db4)
                    .map(|e| cond(&e.crossover))
                    .unwrap_or(false)
            })
            .expect("oscillating path should contain the crossover")
    }

    fn bullish_cross_closes() -> Vec<f64> {
        prefix_ending_with(|c| c.prev_diff < 0.0 && c.curr_diff > 0.0)
    }

    fn bearish_cross_closes() -> Vec<f64> {
        prefix_ending_with(|c| c.prev_diff > 0.0 && c.curr_diff < 0.0)
    }

    fn bot(closes: Vec<f64>, broker: FakeBroker) -> TradingBot<FakeSource, FakeBroker> {
        TradingBot::new(BotConfig::default(), FakeSource { closes }, Arc::new(broker))
    }

    #[test]
    fn evaluate_aligns_all_series() {
        let closes: Vec<f64> = (0..69).map(|i| 100.0 + (i as f64 * 0.2).sin()).collect();
        let eval = evaluate(&closes, &MacdParams::default(), Wavelet::Db4).unwrap();
        assert_eq!(eval.smoothed.len(), 69);
        assert_eq!(eval.macd.signal.len(), 69);
        let expected = eval.smoothed[68] - eval.macd.signal[68];
        assert!((eval.crossover.curr_diff - expected).abs() < 1e-12);
    }

    #[test]
    fn evaluate_rejects_bad_input() {
        assert_eq!(
            evaluate(&[], &MacdParams::default(), Wavelet::Db4).unwrap_err(),
            SignalError::EmptySeries
        );
        assert!(matches!(
            evaluate(&[1.0], &MacdParams::default(), Wavelet::Db4),
            Err(SignalError::InsufficientData { .. })
        ));
    }

    #[tokio::test]
    async fn bullish_cross_when_flat_places_buy() {
        let b = bot(bullish_cross_closes(), FakeBroker::new(PositionLookup::Flat));
        let report = b.run_cycle().await;

        assert_eq!(report.abandoned_at, None, "{report:?}");
        assert_eq!(report.decision, Some(Decision::Buy { quantity: 1 }));
        assert_eq!(report.position, Some(0));
        let orders = b.broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].symbol, "SPY");
    }

    #[tokio::test]
    async fn bullish_cross_when_already_long_holds() {
        let b = bot(bullish_cross_closes(), FakeBroker::new(PositionLookup::Held(1)));
        let report = b.run_cycle().await;
        assert_eq!(report.decision, Some(Decision::Hold));
        assert_eq!(report.execution, Some(ExecutionResult::Skipped));
        assert!(b.broker.orders().is_empty());
    }

    #[tokio::test]
    async fn bearish_cross_when_long_places_sell() {
        let b = bot(bearish_cross_closes(), FakeBroker::new(PositionLookup::Held(5)));
        let report = b.run_cycle().await;
        assert_eq!(report.decision, Some(Decision::Sell { quantity: 1 }));
        let orders = b.broker.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Sell);
    }

    #[tokio::test]
    async fn failed_position_lookup_abandons_without_trading() {
        let b = bot(
            bullish_cross_closes(),
            FakeBroker::new(PositionLookup::Failed("503 Service Unavailable".into())),
        );
        let report = b.run_cycle().await;
        assert_eq!(report.abandoned_at, Some(CycleStage::Position));
        assert!(report.error.as_deref().unwrap().contains("503"));
        assert!(report.decision.is_none());
        assert!(b.broker.orders().is_empty());
    }

    #[tokio::test]
    async fn market_data_failure_abandons_before_broker_calls() {
        let b = bot(Vec::new(), FakeBroker::new(PositionLookup::Flat));
        let report = b.run_cycle().await;
        assert_eq!(report.abandoned_at, Some(CycleStage::MarketData));
        assert!(report.error.as_deref().unwrap().contains("no data"));
        assert_eq!(*b.broker.lookups.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn too_short_series_abandons_at_signal_stage() {
        let b = bot(vec![100.0], FakeBroker::new(PositionLookup::Flat));
        let report = b.run_cycle().await;
        assert_eq!(report.abandoned_at, Some(CycleStage::Signal));
        assert_eq!(report.bars, Some(1));
    }

    #[tokio::test]
    async fn rejected_order_still_completes_cycle() {
        let broker = FakeBroker::new(PositionLookup::Flat).with_outcome(OrderOutcome::Rejected {
            status: 422,
            message: "qty must be > 0".into(),
        });
        let b = bot(bullish_cross_closes(), broker);
        let report = b.run_cycle().await;
        assert_eq!(report.abandoned_at, None);
        assert_eq!(
            report.execution,
            Some(ExecutionResult::Rejected("422: qty must be > 0".into()))
        );
    }

    #[tokio::test]
    async fn dry_run_decides_but_does_not_trade() {
        let mut config = BotConfig::default();
        config.dry_run = true;
        let b = TradingBot::new(
            config,
            FakeSource {
                closes: bullish_cross_closes(),
            },
            Arc::new(FakeBroker::new(PositionLookup::Flat)),
        );
        let report = b.run_cycle().await;
        assert_eq!(report.decision, Some(Decision::Buy { quantity: 1 }));
        assert!(matches!(report.execution, Some(ExecutionResult::Simulated(_))));
        assert!(b.broker.orders().is_empty());
    }

    #[tokio::test]
    async fn steady_trend_holds() {
        let closes: Vec<f64> = (0..70).map(|i| 100.0 + i as f64).collect();
        let b = bot(closes, FakeBroker::new(PositionLookup::Flat));
        let report = b.run_cycle().await;
        assert_eq!(report.abandoned_at, None);
        assert_eq!(report.bars, Some(70));
        assert_eq!(report.last_close, Some(169.0));
        assert!(report.prev_diff.is_some() && report.curr_diff.is_some());
    }
}
