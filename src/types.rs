// =============================================================================
// Shared types used across the bot
// =============================================================================

use serde::{Deserialize, Serialize};

/// Order side as understood by the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Wire representation used by the Alpaca order endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Which brokerage environment the bot talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountMode {
    Paper,
    Live,
}

impl Default for AccountMode {
    fn default() -> Self {
        Self::Paper
    }
}

impl std::fmt::Display for AccountMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Paper => write!(f, "Paper"),
            Self::Live => write!(f, "Live"),
        }
    }
}

impl std::str::FromStr for AccountMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paper" => Ok(Self::Paper),
            "live" => Ok(Self::Live),
            other => Err(format!("unknown account mode '{other}' (expected paper or live)")),
        }
    }
}

/// Outcome of the crossover rule for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Buy { quantity: u32 },
    Sell { quantity: u32 },
    Hold,
}

impl Decision {
    /// The order this decision asks for, if any.
    pub fn order(&self) -> Option<(Side, u32)> {
        match *self {
            Self::Buy { quantity } => Some((Side::Buy, quantity)),
            Self::Sell { quantity } => Some((Side::Sell, quantity)),
            Self::Hold => None,
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy { quantity } => write!(f, "BUY {quantity}"),
            Self::Sell { quantity } => write!(f, "SELL {quantity}"),
            Self::Hold => write!(f, "HOLD"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_mode_parses_case_insensitively() {
        assert_eq!("PAPER".parse::<AccountMode>(), Ok(AccountMode::Paper));
        assert_eq!(" live ".parse::<AccountMode>(), Ok(AccountMode::Live));
        assert!("demo".parse::<AccountMode>().is_err());
    }

    #[test]
    fn decision_maps_to_order() {
        assert_eq!(Decision::Buy { quantity: 3 }.order(), Some((Side::Buy, 3)));
        assert_eq!(Decision::Sell { quantity: 1 }.order(), Some((Side::Sell, 1)));
        assert_eq!(Decision::Hold.order(), None);
    }

    #[test]
    fn side_wire_format_is_lowercase() {
        assert_eq!(Side::Buy.as_str(), "buy");
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");
    }
}
