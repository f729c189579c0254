// =============================================================================
// Bot Configuration — JSON file with environment overrides
// =============================================================================
//
// Every tunable lives in `BotConfig`, which is passed explicitly into the bot
// and the scheduler. All fields carry `#[serde(default)]` so a partial or
// missing file still yields a usable configuration. `BOT_*` environment
// variables override individual fields after the file is read.
//
// Credentials are kept apart in `Credentials` and only ever come from the
// environment.
// =============================================================================

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::broker::alpaca::{LIVE_BASE_URL, PAPER_BASE_URL};
use crate::broker::TimeInForce;
use crate::indicators::MacdParams;
use crate::signals::Wavelet;
use crate::types::AccountMode;

pub const DEFAULT_CONFIG_PATH: &str = "bot_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbol() -> String {
    "SPY".to_string()
}

fn default_quantity() -> u32 {
    1
}

fn default_trade_interval_secs() -> u64 {
    4 * 60 * 60
}

fn default_lookback_days() -> u32 {
    100
}

// =============================================================================
// BotConfig
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Symbol traded by the bot.
    #[serde(default = "default_symbol")]
    pub symbol: String,

    /// Shares per order.
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Seconds between the end of one cycle and the start of the next.
    #[serde(default = "default_trade_interval_secs")]
    pub trade_interval_secs: u64,

    /// Calendar days of daily history requested each cycle.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    #[serde(default)]
    pub macd: MacdParams,

    /// Wavelet used to denoise the MACD line.
    #[serde(default)]
    pub wavelet: Wavelet,

    /// Paper or live brokerage endpoint.
    #[serde(default)]
    pub account_mode: AccountMode,

    /// Overrides the endpoint implied by `account_mode`.
    #[serde(default)]
    pub broker_base_url: Option<String>,

    #[serde(default)]
    pub time_in_force: TimeInForce,

    /// Decide and log, but never send orders.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            quantity: default_quantity(),
            trade_interval_secs: default_trade_interval_secs(),
            lookback_days: default_lookback_days(),
            macd: MacdParams::default(),
            wavelet: Wavelet::default(),
            account_mode: AccountMode::default(),
            broker_base_url: None,
            time_in_force: TimeInForce::default(),
            dry_run: false,
        }
    }
}

impl BotConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// A missing or unreadable file yields the defaults with a warning. A file
    /// that exists but does not parse is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "bot config not readable, using defaults");
                return Ok(Self::default());
            }
        };

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse bot config from {}", path.display()))?;

        info!(path = %path.display(), symbol = %config.symbol, "bot config loaded");
        Ok(config)
    }

    /// Apply `BOT_*` overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(symbol) = lookup("BOT_SYMBOL") {
            self.symbol = symbol.trim().to_uppercase();
        }
        if let Some(v) = lookup("BOT_QUANTITY") {
            self.quantity = v
                .trim()
                .parse()
                .with_context(|| format!("BOT_QUANTITY '{v}' is not a positive integer"))?;
        }
        if let Some(v) = lookup("BOT_TRADE_INTERVAL_SECS") {
            self.trade_interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("BOT_TRADE_INTERVAL_SECS '{v}' is not an integer"))?;
        }
        if let Some(v) = lookup("BOT_LOOKBACK_DAYS") {
            self.lookback_days = v
                .trim()
                .parse()
                .with_context(|| format!("BOT_LOOKBACK_DAYS '{v}' is not an integer"))?;
        }
        if let Some(v) = lookup("BOT_DRY_RUN") {
            self.dry_run = parse_flag(&v)
                .with_context(|| format!("BOT_DRY_RUN '{v}' is not a boolean"))?;
        }
        if let Some(v) = lookup("BOT_ACCOUNT_MODE") {
            self.account_mode = v.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.symbol.trim().is_empty() {
            anyhow::bail!("symbol must not be empty");
        }
        if self.quantity == 0 {
            anyhow::bail!("quantity must be at least 1");
        }
        if self.trade_interval_secs == 0 {
            anyhow::bail!("trade_interval_secs must be positive");
        }
        if self.lookback_days == 0 {
            anyhow::bail!("lookback_days must be positive");
        }
        self.macd.validate().context("invalid macd settings")?;
        Ok(())
    }

    pub fn trade_interval(&self) -> Duration {
        Duration::from_secs(self.trade_interval_secs)
    }

    /// Broker endpoint: the explicit override, else the account-mode default.
    pub fn broker_base_url(&self) -> String {
        match (&self.broker_base_url, self.account_mode) {
            (Some(url), _) => url.clone(),
            (None, AccountMode::Paper) => PAPER_BASE_URL.to_string(),
            (None, AccountMode::Live) => LIVE_BASE_URL.to_string(),
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// Broker API keys.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret_key: String,
}

impl Credentials {
    /// Read `ALPACA_API_KEY` / `ALPACA_SECRET_KEY`. Both must be present and
    /// non-empty.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{name} is not set"))
        };
        Ok(Self {
            api_key: read("ALPACA_API_KEY")?,
            secret_key: read("ALPACA_SECRET_KEY")?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
