//! Engine error kinds.
//!
//! Strategy-triggered kinds (`InvalidPrice` through `ShortDisallowed`) are
//! returned to the strategy caller and never abort the run. Feed and
//! accounting violations are fatal and terminate the run.

use crate::domain::{MarketId, MarketPhase, OrderId, OrderSide, Timestamp};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid price {price} for market {market_id} (tick size {tick_size})")]
    InvalidPrice {
        market_id: MarketId,
        price: f64,
        tick_size: f64,
    },

    #[error("invalid quantity {quantity} for market {market_id}")]
    InvalidQuantity { market_id: MarketId, quantity: f64 },

    #[error("unknown market {market_id}")]
    UnknownMarket { market_id: MarketId },

    #[error("market {market_id} is not tradable ({phase})")]
    MarketNotTradable {
        market_id: MarketId,
        phase: MarketPhase,
    },

    #[error("order {order_id} is not active")]
    OrderNotActive { order_id: OrderId },

    #[error("{side} {market_id} would cross zero with shorts disabled")]
    ShortDisallowed {
        market_id: MarketId,
        side: OrderSide,
    },

    #[error("feed order violation: trade at {timestamp} after event at {last_timestamp}")]
    FeedOrderViolation {
        timestamp: Timestamp,
        last_timestamp: Timestamp,
    },

    #[error("accounting violation at {timestamp}: {detail}")]
    AccountingViolation { timestamp: Timestamp, detail: String },

    #[error("event log write failed: {0}")]
    EventLog(#[from] std::io::Error),
}

impl EngineError {
    /// Fatal errors terminate the run; the rest surface to the strategy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            EngineError::FeedOrderViolation { .. }
                | EngineError::AccountingViolation { .. }
                | EngineError::EventLog(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        let feed = EngineError::FeedOrderViolation {
            timestamp: 5,
            last_timestamp: 9,
        };
        let cancel = EngineError::OrderNotActive { order_id: OrderId(3) };
        assert!(feed.is_fatal());
        assert!(!cancel.is_fatal());
    }

    #[test]
    fn messages_carry_context() {
        let err = EngineError::MarketNotTradable {
            market_id: "KX-RAIN".into(),
            phase: MarketPhase::Resolved,
        };
        let msg = err.to_string();
        assert!(msg.contains("KX-RAIN"));
        assert!(msg.contains("resolved"));
    }
}
