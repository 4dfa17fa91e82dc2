//! Limit orders resting with the broker.

use super::{MarketId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker-assigned order identifier, monotone in acceptance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four ways to rest liquidity in a binary market.
///
/// `BuyYes` and `SellNo` both express YES-buying interest and rest on the
/// bid side of the book; `SellYes` and `BuyNo` rest on the ask side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    BuyYes,
    SellYes,
    BuyNo,
    SellNo,
}

impl OrderSide {
    /// True for orders that pay cash when filled.
    pub fn is_buy(&self) -> bool {
        matches!(self, OrderSide::BuyYes | OrderSide::BuyNo)
    }

    /// True for orders quoted in YES prices.
    pub fn is_yes_leg(&self) -> bool {
        matches!(self, OrderSide::BuyYes | OrderSide::SellYes)
    }

    /// True for orders resting on the bid side of the book.
    pub fn is_bid(&self) -> bool {
        matches!(self, OrderSide::BuyYes | OrderSide::SellNo)
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::BuyYes => write!(f, "buy_yes"),
            OrderSide::SellYes => write!(f, "sell_yes"),
            OrderSide::BuyNo => write!(f, "buy_no"),
            OrderSide::SellNo => write!(f, "sell_no"),
        }
    }
}

/// Order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    Filled,
    Canceled,
}

/// A good-till-canceled limit order.
///
/// `price` is quoted in the order's own leg: NO-side orders carry NO
/// prices. An order rests in the book iff `status == Open` and
/// `remaining > 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub market_id: MarketId,
    pub side: OrderSide,
    pub price: f64,
    pub remaining: f64,
    pub created_at: Timestamp,
    pub status: OrderStatus,
}

impl Order {
    /// The limit expressed as a YES price, regardless of leg.
    pub fn yes_equivalent_price(&self) -> f64 {
        if self.side.is_yes_leg() {
            self.price
        } else {
            1.0 - self.price
        }
    }

    pub fn is_resting(&self) -> bool {
        self.status == OrderStatus::Open && self.remaining > 0.0
    }
}
