// =============================================================================
// Wavelet MACD Bot — Main Entry Point
// =============================================================================
//
// Trades one symbol on a fixed interval: daily closes from Yahoo Finance,
// wavelet-smoothed MACD crossover, market orders through Alpaca. Paper
// trading is the default account mode.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod broker;
mod cycle_report;
mod error;
mod execution;
mod indicators;
mod market_data;
mod runtime_config;
mod scheduler;
mod signals;
mod strategy;
mod types;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::broker::AlpacaClient;
use crate::market_data::YahooClient;
use crate::runtime_config::{BotConfig, Credentials, DEFAULT_CONFIG_PATH};
use crate::strategy::TradingBot;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Wavelet MACD Bot starting up");

    let config_path =
        std::env::var("BOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = BotConfig::load(&config_path)?;
    config.apply_env_overrides(|key| std::env::var(key).ok())?;
    config.validate()?;

    let credentials = Credentials::from_env(|key| std::env::var(key).ok())?;

    info!(
        symbol = %config.symbol,
        quantity = config.quantity,
        interval_secs = config.trade_interval_secs,
        lookback_days = config.lookback_days,
        wavelet = %config.wavelet,
        account_mode = %config.account_mode,
        dry_run = config.dry_run,
        "configuration ready"
    );

    // ── 2. Broker ────────────────────────────────────────────────────────
    let broker = Arc::new(AlpacaClient::new(&credentials, config.broker_base_url())?);
    info!(base_url = %broker.base_url(), "broker client ready");

    match broker.get_account().await {
        Ok(account) if account.trading_blocked => error!(
            account = %account.account_number,
            status = %account.status,
            "account is blocked from trading; orders will be rejected"
        ),
        Ok(account) => info!(
            account = %account.account_number,
            status = %account.status,
            buying_power = %account.buying_power,
            "account verified"
        ),
        Err(e) => warn!(error = %format!("{e:#}"), "account check failed, continuing"),
    }
    let limits = broker.rate_limits().snapshot();
    info!(limit = limits.limit, remaining = limits.remaining, "broker request budget");

    // ── 3. Market data & strategy ────────────────────────────────────────
    let source = YahooClient::new()?;
    let interval = config.trade_interval();
    let bot = TradingBot::new(config, source, broker);

    // ── 4. Shutdown signal ───────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Shutdown signal received, finishing current cycle");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                error!(error = %e, "failed to listen for Ctrl+C");
                // Keep the sender alive so the scheduler is not cancelled.
                let _tx = shutdown_tx;
                std::future::pending::<()>().await;
            }
        }
    });

    // ── 5. Scheduling loop ───────────────────────────────────────────────
    info!(symbol = %bot.config().symbol, "Trading loop running. Press Ctrl+C to stop.");
    let bot = &bot;
    let cycles = scheduler::run(interval, shutdown_rx, move || bot.run_cycle()).await;

    info!(cycles, "Wavelet MACD Bot shut down complete.");
    Ok(())
}
