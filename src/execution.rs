// =============================================================================
// Execution Engine — turns a decision into a broker order, or simulates it
// =============================================================================
//
// Failures never propagate past this module: every path ends in an
// `ExecutionResult` that the cycle records and logs. There is no retry; the
// next scheduled cycle re-evaluates from scratch.
// =============================================================================

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::broker::{Brokerage, OrderAck, OrderOutcome, OrderRequest, TimeInForce};
use crate::types::Decision;

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// Outcome of an execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ExecutionResult {
    /// The decision was HOLD; nothing to send.
    Skipped,
    /// Dry-run mode: the order was logged but not sent.
    Simulated(String),
    /// The broker accepted the order.
    Placed(OrderAck),
    /// The broker refused the order.
    Rejected(String),
    /// The order could not be submitted.
    Error(String),
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => write!(f, "Skipped"),
            Self::Simulated(msg) => write!(f, "Simulated({msg})"),
            Self::Placed(ack) => write!(f, "Placed(order_id={}, status={})", ack.id, ack.status),
            Self::Rejected(reason) => write!(f, "Rejected({reason})"),
            Self::Error(err) => write!(f, "Error({err})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct ExecutionEngine<B> {
    pub client: Arc<B>,
    pub time_in_force: TimeInForce,
    pub dry_run: bool,
}

impl<B: Brokerage> ExecutionEngine<B> {
    pub fn new(client: Arc<B>, time_in_force: TimeInForce, dry_run: bool) -> Self {
        Self {
            client,
            time_in_force,
            dry_run,
        }
    }

    /// Execute `decision` for `symbol` as a market order.
    pub async fn execute(&self, symbol: &str, decision: Decision) -> ExecutionResult {
        let Some((side, quantity)) = decision.order() else {
            return ExecutionResult::Skipped;
        };

        let order = OrderRequest::market(symbol, side, quantity, self.time_in_force);

        if self.dry_run {
            let msg = format!(
                "dry run: {side} {quantity} {symbol} client_order_id={}",
                order.client_order_id
            );
            info!("{}", msg);
            return ExecutionResult::Simulated(msg);
        }

        match self.client.submit_market_order(&order).await {
            OrderOutcome::Accepted(ack) => {
                info!(
                    symbol,
                    side = %side,
                    quantity,
                    order_id = %ack.id,
                    "executed {} order for {} {}",
                    side,
                    quantity,
                    symbol
                );
                ExecutionResult::Placed(ack)
            }
            OrderOutcome::Rejected { status, message } => {
                warn!(symbol, side = %side, quantity, status, reason = %message, "order rejected by broker");
                ExecutionResult::Rejected(format!("{status}: {message}"))
            }
            OrderOutcome::Failed(reason) => {
                warn!(symbol, side = %side, quantity, error = %reason, "order submission failed");
                ExecutionResult::Error(reason)
            }
        }
    }
}

impl<B> std::fmt::Debug for ExecutionEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("client", &"<Brokerage>")
            .field("time_in_force", &self.time_in_force)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::broker::PositionLookup;
    use crate::types::Side;
    use std::sync::Mutex;

    /// In-memory broker that records submitted orders.
    pub(crate) struct FakeBroker {
        pub position: Mutex<PositionLookup>,
        pub outcome: Mutex<OrderOutcome>,
        pub orders: Mutex<Vec<OrderRequest>>,
        pub lookups: Mutex<usize>,
    }

    impl FakeBroker {
        pub fn new(position: PositionLookup) -> Self {
            Self {
                position: Mutex::new(position),
                outcome: Mutex::new(OrderOutcome::Accepted(ack("ord-1"))),
                orders: Mutex::new(Vec::new()),
                lookups: Mutex::new(0),
            }
        }

        pub fn with_outcome(self, outcome: OrderOutcome) -> Self {
            *self.outcome.lock().unwrap() = outcome;
            self
        }

        pub fn orders(&self) -> Vec<OrderRequest> {
            self.orders.lock().unwrap().clone()
        }
    }

    impl Brokerage for FakeBroker {
        async fn position(&self, _symbol: &str) -> PositionLookup {
            *self.lookups.lock().unwrap() += 1;
            self.position.lock().unwrap().clone()
        }

        async fn submit_market_order(&self, order: &OrderRequest) -> OrderOutcome {
            self.orders.lock().unwrap().push(order.clone());
            self.outcome.lock().unwrap().clone()
        }
    }

    pub(crate) fn ack(id: &str) -> OrderAck {
        OrderAck {
            id: id.into(),
            client_order_id: String::new(),
            status: "accepted".into(),
            symbol: "SPY".into(),
            side: "buy".into(),
            qty: Some("1".into()),
        }
    }

    fn engine(broker: FakeBroker, dry_run: bool) -> ExecutionEngine<FakeBroker> {
        ExecutionEngine::new(Arc::new(broker), TimeInForce::Gtc, dry_run)
    }

    #[tokio::test]
    async fn hold_sends_nothing() {
        let e = engine(FakeBroker::new(PositionLookup::Flat), false);
        assert_eq!(e.execute("SPY", Decision::Hold).await, ExecutionResult::Skipped);
        assert!(e.client.orders().is_empty());
    }

    #[tokio::test]
    async fn buy_is_submitted_as_market_order() {
        let e = engine(FakeBroker::new(PositionLookup::Flat), false);
        let result = e.execute("SPY", Decision::Buy { quantity: 2 }).await;
        assert!(matches!(result, ExecutionResult::Placed(ref ack) if ack.id == "ord-1"));

        let orders = e.client.orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].side, Side::Buy);
        assert_eq!(orders[0].quantity, 2);
        assert_eq!(orders[0].symbol, "SPY");
        assert_eq!(orders[0].time_in_force, TimeInForce::Gtc);
    }

    #[tokio::test]
    async fn dry_run_never_reaches_broker() {
        let e = engine(FakeBroker::new(PositionLookup::Held(1)), true);
        let result = e.execute("SPY", Decision::Sell { quantity: 1 }).await;
        assert!(matches!(result, ExecutionResult::Simulated(ref msg) if msg.contains("SELL 1 SPY")));
        assert!(e.client.orders().is_empty());
    }

    #[tokio::test]
    async fn rejection_is_reported_not_raised() {
        let broker = FakeBroker::new(PositionLookup::Flat).with_outcome(OrderOutcome::Rejected {
            status: 403,
            message: "insufficient buying power".into(),
        });
        let e = engine(broker, false);
        let result = e.execute("SPY", Decision::Buy { quantity: 1 }).await;
        assert_eq!(
            result,
            ExecutionResult::Rejected("403: insufficient buying power".into())
        );
    }

    #[tokio::test]
    async fn transport_failure_is_reported_not_raised() {
        let broker = FakeBroker::new(PositionLookup::Flat)
            .with_outcome(OrderOutcome::Failed("connection reset".into()));
        let e = engine(broker, false);
        let result = e.execute("SPY", Decision::Buy { quantity: 1 }).await;
        assert_eq!(result, ExecutionResult::Error("connection reset".into()));
        assert_eq!(result.to_string(), "Error(connection reset)");
    }
}
