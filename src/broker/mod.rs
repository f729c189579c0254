// =============================================================================
// Broker — position lookup and order submission
// =============================================================================
//
// Both calls report their outcome as a value instead of an error: a missing
// position, a failed lookup, an accepted order and a rejected order are all
// distinct, so the caller can decide what each one means for the cycle.
// =============================================================================

pub mod alpaca;
pub mod rate_limit;

use serde::{Deserialize, Serialize};

use crate::types::Side;

pub use alpaca::AlpacaClient;

/// How long a submitted order stays working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::Gtc
    }
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Gtc => "gtc",
            Self::Ioc => "ioc",
            Self::Fok => "fok",
        }
    }
}

/// Result of reading the current position for a symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionLookup {
    /// The broker holds no position in the symbol.
    Flat,
    /// Signed share count; negative for a short position.
    Held(i64),
    /// The lookup itself failed; the position is unknown.
    Failed(String),
}

impl PositionLookup {
    /// Share count when known.
    pub fn shares(&self) -> Option<i64> {
        match self {
            Self::Flat => Some(0),
            Self::Held(qty) => Some(*qty),
            Self::Failed(_) => None,
        }
    }
}

impl std::fmt::Display for PositionLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flat => write!(f, "Flat"),
            Self::Held(qty) => write!(f, "Held({qty})"),
            Self::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}

/// A market order ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: u32,
    pub time_in_force: TimeInForce,
    pub client_order_id: String,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: Side, quantity: u32, time_in_force: TimeInForce) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            quantity,
            time_in_force,
            client_order_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Broker acknowledgement of an accepted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    pub id: String,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub side: String,
    #[serde(default)]
    pub qty: Option<String>,
}

/// Result of submitting an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderOutcome {
    Accepted(OrderAck),
    /// The broker answered and refused the order.
    Rejected { status: u16, message: String },
    /// The request never got a usable answer.
    Failed(String),
}

/// The brokerage operations a trading cycle needs.
pub trait Brokerage {
    async fn position(&self, symbol: &str) -> PositionLookup;

    async fn submit_market_order(&self, order: &OrderRequest) -> OrderOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_distinguishes_flat_from_failed() {
        assert_eq!(PositionLookup::Flat.shares(), Some(0));
        assert_eq!(PositionLookup::Held(-2).shares(), Some(-2));
        assert_eq!(PositionLookup::Failed("timeout".into()).shares(), None);
    }

    #[test]
    fn market_orders_get_unique_client_ids() {
        let a = OrderRequest::market("SPY", Side::Buy, 1, TimeInForce::Gtc);
        let b = OrderRequest::market("SPY", Side::Buy, 1, TimeInForce::Gtc);
        assert_ne!(a.client_order_id, b.client_order_id);
        assert_eq!(a.symbol, "SPY");
    }

    #[test]
    fn time_in_force_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&TimeInForce::Day).unwrap(), "\"day\"");
        let tif: TimeInForce = serde_json::from_str("\"fok\"").unwrap();
        assert_eq!(tif, TimeInForce::Fok);
    }
}
