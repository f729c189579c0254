// =============================================================================
// Yahoo Finance chart API client — daily closes
// =============================================================================
//
// GET /v8/finance/chart/{symbol}?range={n}d&interval=1d
//
// The raw (unadjusted) close is used. Rows with a null close are dropped. The
// provider occasionally repeats the latest session as a second row; when two
// rows land on the same exchange-local date the later one wins.
// =============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate};
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use super::{PriceBar, PriceSeries, PriceSource};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

// ---------------------------------------------------------------------------
// Response shape
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Daily price history from Yahoo Finance.
#[derive(Debug, Clone)]
pub struct YahooClient {
    client: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .context("failed to build market data HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn chart_url(&self, symbol: &str, lookback_days: u32) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid market data base URL '{}'", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("market data base URL '{}' cannot take a path", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        url.query_pairs_mut()
            .append_pair("range", &format!("{lookback_days}d"))
            .append_pair("interval", "1d")
            .append_pair("includePrePost", "false");
        Ok(url)
    }
}

impl PriceSource for YahooClient {
    #[instrument(skip(self), name = "yahoo::daily_closes")]
    async fn daily_closes(&self, symbol: &str, lookback_days: u32) -> Result<PriceSeries> {
        let url = self.chart_url(symbol, lookback_days)?;
        debug!(url = %url, "requesting chart");

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET chart for {symbol} failed"))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .with_context(|| format!("failed to read chart response for {symbol}"))?;

        // Yahoo reports unknown symbols as 404 with a JSON error object, so try
        // to surface that description before falling back to the raw status.
        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<ChartResponse>(&body) {
                if let Some(err) = parsed.chart.error {
                    anyhow::bail!(
                        "chart API returned {status} for {symbol}: {}: {}",
                        err.code,
                        err.description
                    );
                }
            }
            anyhow::bail!("chart API returned {status} for {symbol}: {body}");
        }

        let series = parse_chart(symbol, &body)?;
        info!(symbol, bars = series.len(), "got daily price data");
        Ok(series)
    }
}

/// Parse a chart API payload into a validated close series.
fn parse_chart(symbol: &str, body: &str) -> Result<PriceSeries> {
    let parsed: ChartResponse = serde_json::from_str(body)
        .with_context(|| format!("malformed chart response for {symbol}"))?;

    if let Some(err) = parsed.chart.error {
        anyhow::bail!("chart API error for {symbol}: {}: {}", err.code, err.description);
    }

    let data = parsed
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .with_context(|| format!("chart response for {symbol} has no result"))?;

    let offset = data.meta.as_ref().map_or(0, |m| m.gmtoffset);
    let timestamps = data.timestamp.unwrap_or_default();
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .with_context(|| format!("chart response for {symbol} has no quote block"))?;

    if closes.len() != timestamps.len() {
        warn!(
            symbol,
            timestamps = timestamps.len(),
            closes = closes.len(),
            "timestamp and close arrays differ in length"
        );
    }

    let mut bars: Vec<PriceBar> = Vec::with_capacity(timestamps.len());
    let mut dropped = 0usize;
    for (&ts, close) in timestamps.iter().zip(closes) {
        let Some(close) = close.filter(|c| c.is_finite()) else {
            dropped += 1;
            continue;
        };
        let date = session_date(ts, offset)
            .with_context(|| format!("invalid timestamp {ts} in chart for {symbol}"))?;

        match bars.last_mut() {
            Some(last) if last.date == date => last.close = close,
            _ => bars.push(PriceBar { date, close }),
        }
    }

    if dropped > 0 {
        debug!(symbol, dropped, "dropped rows with missing close");
    }
    if bars.is_empty() {
        anyhow::bail!("chart API returned no usable closes for {symbol}");
    }

    PriceSeries::new(symbol, bars)
}

/// Exchange-local calendar date of a bar timestamp.
fn session_date(ts: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts + gmtoffset, 0).map(|dt| dt.date_naive())
}
