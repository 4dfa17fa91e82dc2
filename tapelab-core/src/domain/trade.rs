//! Trade prints from the historical tape.

use super::{MarketId, Timestamp};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};

/// Which side crossed the spread in a print.
///
/// `TakerBoughtYes` means a YES buyer lifted an ask; `TakerBoughtNo` means
/// a NO buyer (equivalently a YES seller) hit a bid. The resting
/// counterparty was the maker on the opposite side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TakerSide {
    TakerBoughtYes,
    TakerBoughtNo,
}

/// A single trade from the tape. Prices are for the YES leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub market_id: MarketId,
    pub timestamp: Timestamp,
    pub yes_price: f64,
    pub size: f64,
    pub taker_side: TakerSide,
}

impl TradeEvent {
    pub fn no_price(&self) -> f64 {
        1.0 - self.yes_price
    }

    /// Reject malformed prints before they touch engine state.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.yes_price.is_finite() || self.yes_price <= 0.0 || self.yes_price >= 1.0 {
            return Err(EngineError::InvalidPrice {
                market_id: self.market_id.clone(),
                price: self.yes_price,
                tick_size: 0.0,
            });
        }
        if !self.size.is_finite() || self.size <= 0.0 {
            return Err(EngineError::InvalidQuantity {
                market_id: self.market_id.clone(),
                quantity: self.size,
            });
        }
        Ok(())
    }
}
