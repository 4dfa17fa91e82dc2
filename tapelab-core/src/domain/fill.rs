//! Fill — a resting order executing against a tape print.

use super::{MarketId, OrderId, OrderSide, Timestamp};
use serde::{Deserialize, Serialize};

/// Record of an order filling, fully or partially.
///
/// `price` is the slippage-adjusted execution price in the order's own leg
/// terms; `timestamp` equals the triggering trade's timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub order_id: OrderId,
    pub market_id: MarketId,
    pub side: OrderSide,
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub timestamp: Timestamp,
}

impl Fill {
    /// Gross notional of the fill.
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// Signed cash impact: negative for buys, positive for sells, net of
    /// commission either way.
    pub fn cash_delta(&self) -> f64 {
        let gross = self.notional();
        let signed = if self.side.is_buy() { -gross } else { gross };
        signed - self.commission
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(side: OrderSide, price: f64, quantity: f64, commission: f64) -> Fill {
        Fill {
            order_id: OrderId(7),
            market_id: "MKT".into(),
            side,
            price,
            quantity,
            commission,
            timestamp: 42,
        }
    }

    #[test]
    fn buy_cash_delta_is_negative() {
        let f = fill(OrderSide::BuyYes, 0.40, 10.0, 0.04);
        assert!((f.cash_delta() - (-4.04)).abs() < 1e-12);
    }

    #[test]
    fn sell_cash_delta_nets_commission() {
        let f = fill(OrderSide::SellNo, 0.25, 8.0, 0.02);
        assert!((f.cash_delta() - (2.0 - 0.02)).abs() < 1e-12);
    }
}
