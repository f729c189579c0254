// =============================================================================
// Alpaca Trading API v2 client
// =============================================================================
//
// SECURITY: keys travel only as the APCA-API-KEY-ID / APCA-API-SECRET-KEY
// default headers, marked sensitive, and are never logged. `Debug` prints the
// base URL only.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::rate_limit::RateLimitTracker;
use super::{Brokerage, OrderAck, OrderOutcome, OrderRequest, PositionLookup};
use crate::runtime_config::Credentials;

pub const PAPER_BASE_URL: &str = "https://paper-api.alpaca.markets";
pub const LIVE_BASE_URL: &str = "https://api.alpaca.markets";

/// Subset of `GET /v2/account` the bot reports at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountSnapshot {
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub buying_power: String,
    #[serde(default)]
    pub trading_blocked: bool,
}

#[derive(Debug, Deserialize)]
struct PositionBody {
    qty: String,
    #[serde(default)]
    side: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    symbol: &'a str,
    qty: String,
    side: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    time_in_force: &'a str,
    client_order_id: &'a str,
}

/// Alpaca REST client for positions, orders and the account summary.
pub struct AlpacaClient {
    base_url: String,
    client: reqwest::Client,
    rate_limits: RateLimitTracker,
}

impl AlpacaClient {
    pub fn new(credentials: &Credentials, base_url: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key_id = HeaderValue::from_str(&credentials.api_key)
            .context("ALPACA_API_KEY is not a valid header value")?;
        key_id.set_sensitive(true);
        let mut secret = HeaderValue::from_str(&credentials.secret_key)
            .context("ALPACA_SECRET_KEY is not a valid header value")?;
        secret.set_sensitive(true);
        headers.insert("APCA-API-KEY-ID", key_id);
        headers.insert("APCA-API-SECRET-KEY", secret);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build broker HTTP client")?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        endpoint(&base_url, &[])?;
        debug!(base_url = %base_url, "AlpacaClient initialised");

        Ok(Self {
            base_url,
            client,
            rate_limits: RateLimitTracker::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn rate_limits(&self) -> &RateLimitTracker {
        &self.rate_limits
    }

    // -------------------------------------------------------------------------
    // Account
    // -------------------------------------------------------------------------

    /// GET /v2/account
    #[instrument(skip(self), name = "alpaca::get_account")]
    pub async fn get_account(&self) -> Result<AccountSnapshot> {
        let url = endpoint(&self.base_url, &["v2", "account"])?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("GET /v2/account request failed")?;
        self.rate_limits.update_from_headers(resp.headers());

        let status = resp.status();
        let body = resp.text().await.context("failed to read account response")?;
        if !status.is_success() {
            anyhow::bail!("Alpaca GET /v2/account returned {}: {}", status, body);
        }

        serde_json::from_str(&body).context("failed to parse account response")
    }

    // -------------------------------------------------------------------------
    // Positions
    // -------------------------------------------------------------------------

    /// GET /v2/positions/{symbol}. `Ok(None)` when the broker reports no
    /// open position.
    #[instrument(skip(self), name = "alpaca::get_position")]
    pub async fn get_position(&self, symbol: &str) -> Result<Option<i64>> {
        let url = endpoint(&self.base_url, &["v2", "positions", symbol])?;
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET /v2/positions/{symbol} request failed"))?;
        self.rate_limits.update_from_headers(resp.headers());

        let status = resp.status();
        let body = resp
            .text()
            .await
            .context("failed to read position response")?;

        position_from_response(symbol, status, &body)
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// POST /v2/orders with a market order.
    #[instrument(skip(self, order), fields(symbol = %order.symbol, side = %order.side, qty = order.quantity), name = "alpaca::submit_order")]
    pub async fn submit_order(&self, order: &OrderRequest) -> OrderOutcome {
        let url = match endpoint(&self.base_url, &["v2", "orders"]) {
            Ok(url) => url,
            Err(e) => return OrderOutcome::Failed(format!("{e:#}")),
        };
        let body = OrderBody {
            symbol: &order.symbol,
            qty: order.quantity.to_string(),
            side: order.side.as_str(),
            order_type: "market",
            time_in_force: order.time_in_force.as_str(),
            client_order_id: &order.client_order_id,
        };

        let resp = match self.client.post(url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) => return OrderOutcome::Failed(format!("POST /v2/orders request failed: {e}")),
        };
        self.rate_limits.update_from_headers(resp.headers());

        let status = resp.status();
        let text = match resp.text().await {
            Ok(text) => text,
            Err(e) => return OrderOutcome::Failed(format!("failed to read order response: {e}")),
        };

        order_outcome(status, &text)
    }
}

impl Brokerage for AlpacaClient {
    async fn position(&self, symbol: &str) -> PositionLookup {
        match self.get_position(symbol).await {
            Ok(None) | Ok(Some(0)) => PositionLookup::Flat,
            Ok(Some(qty)) => PositionLookup::Held(qty),
            Err(e) => {
                warn!(symbol, error = %format!("{e:#}"), "position lookup failed");
                PositionLookup::Failed(format!("{e:#}"))
            }
        }
    }

    async fn submit_market_order(&self, order: &OrderRequest) -> OrderOutcome {
        self.submit_order(order).await
    }
}

impl std::fmt::Debug for AlpacaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlpacaClient")
            .field("credentials", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// -----------------------------------------------------------------------------
// Response helpers
// -----------------------------------------------------------------------------

/// `base_url` joined with `segments`, each percent-encoded as a single path
/// segment so a symbol such as `BTC/USD` stays one segment.
fn endpoint(base_url: &str, segments: &[&str]) -> Result<Url> {
    let mut url =
        Url::parse(base_url).with_context(|| format!("invalid broker base URL '{base_url}'"))?;
    url.path_segments_mut()
        .map_err(|_| anyhow::anyhow!("broker base URL '{base_url}' cannot take a path"))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// 404 means no open position; any other non-success status is an error.
fn position_from_response(symbol: &str, status: StatusCode, body: &str) -> Result<Option<i64>> {
    if status == StatusCode::NOT_FOUND {
        debug!(symbol, "no open position");
        return Ok(None);
    }
    if !status.is_success() {
        anyhow::bail!("Alpaca GET /v2/positions/{} returned {}: {}", symbol, status, body);
    }
    parse_position(body).map(Some)
}

/// Signed share count from a position payload. Fractional quantities are
/// truncated toward zero; a short position is reported with a negative sign.
fn parse_position(body: &str) -> Result<i64> {
    let pos: PositionBody = serde_json::from_str(body).context("failed to parse position response")?;
    let qty: f64 = pos
        .qty
        .trim()
        .parse()
        .with_context(|| format!("position qty '{}' is not a number", pos.qty))?;
    if !qty.is_finite() {
        anyhow::bail!("position qty '{}' is not finite", pos.qty);
    }

    let shares = qty.trunc() as i64;
    let shares = match pos.side.as_deref() {
        Some("short") if shares > 0 => -shares,
        _ => shares,
    };
    Ok(shares)
}

/// Classify an order response by status.
fn order_outcome(status: StatusCode, body: &str) -> OrderOutcome {
    if status.is_success() {
        return match serde_json::from_str::<OrderAck>(body) {
            Ok(ack) => {
                info!(order_id = %ack.id, status = %ack.status, "order accepted");
                OrderOutcome::Accepted(ack)
            }
            Err(e) => OrderOutcome::Failed(format!("order accepted but response unreadable: {e}")),
        };
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    if status.is_client_error() {
        OrderOutcome::Rejected {
            status: status.as_u16(),
            message,
        }
    } else {
        OrderOutcome::Failed(format!("broker returned {status}: {message}"))
    }
}
