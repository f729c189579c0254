// =============================================================================
// Cycle Report — auditable record of every trade/no-trade cycle
// =============================================================================
//
// One report per scheduled cycle, filled in as the cycle progresses. A cycle
// that stops early carries the stage it stopped at and the reason.
// =============================================================================

use serde::Serialize;
use tracing::{info, warn};

use crate::execution::ExecutionResult;
use crate::types::Decision;

/// How far a cycle got.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleStage {
    MarketData,
    Signal,
    Position,
}

impl std::fmt::Display for CycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MarketData => write!(f, "MarketData"),
            Self::Signal => write!(f, "Signal"),
            Self::Position => write!(f, "Position"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// Unique identifier for this cycle (UUID v4).
    pub id: String,

    pub symbol: String,

    /// ISO 8601 start time.
    pub created_at: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bars: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_close: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub macd: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoothed_macd: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prev_diff: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub curr_diff: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,

    /// Stage at which the cycle was abandoned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abandoned_at: Option<CycleStage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleReport {
    pub fn start(symbol: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            bars: None,
            last_close: None,
            macd: None,
            smoothed_macd: None,
            signal: None,
            prev_diff: None,
            curr_diff: None,
            position: None,
            decision: None,
            execution: None,
            abandoned_at: None,
            error: None,
        }
    }

    /// Mark the cycle as stopped at `stage`.
    pub fn abandon(mut self, stage: CycleStage, reason: impl Into<String>) -> Self {
        self.abandoned_at = Some(stage);
        self.error = Some(reason.into());
        self
    }

    /// Emit the report: a summary line plus the full JSON record.
    pub fn log(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        if let Some(stage) = self.abandoned_at {
            warn!(
                cycle_id = %self.id,
                symbol = %self.symbol,
                stage = %stage,
                error = self.error.as_deref().unwrap_or_default(),
                report = %json,
                "cycle abandoned"
            );
        } else {
            info!(
                cycle_id = %self.id,
                symbol = %self.symbol,
                decision = %self.decision.unwrap_or(Decision::Hold),
                execution = %self.execution.as_ref().map_or_else(|| "Skipped".to_string(), ToString::to_string),
                report = %json,
                "cycle complete"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_report_serialises_without_empty_fields() {
        let report = CycleReport::start("SPY");
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["symbol"], "SPY");
        assert!(v.get("decision").is_none());
        assert!(v.get("error").is_none());
        assert_eq!(report.id.len(), 36);
    }

    #[test]
    fn abandon_records_stage_and_reason() {
        let report = CycleReport::start("SPY").abandon(CycleStage::MarketData, "no data");
        assert!(report.abandoned_at.is_some());
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["abandoned_at"], "MarketData");
        assert_eq!(v["error"], "no data");
    }

    #[test]
    fn decision_and_execution_serialise_as_structured_values() {
        let mut report = CycleReport::start("SPY");
        report.decision = Some(Decision::Buy { quantity: 2 });
        report.execution = Some(ExecutionResult::Rejected("403: insufficient buying power".into()));
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["decision"]["Buy"]["quantity"], 2);
        assert_eq!(v["execution"]["Rejected"], "403: insufficient buying power");

        report.decision = Some(Decision::Hold);
        report.execution = Some(ExecutionResult::Skipped);
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["decision"], "Hold");
        assert_eq!(v["execution"], "Skipped");
    }

    #[test]
    fn reports_get_distinct_ids() {
        assert_ne!(CycleReport::start("SPY").id, CycleReport::start("SPY").id);
    }
}
