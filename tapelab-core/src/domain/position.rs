//! Position — YES and NO holdings in one market.

use super::{MarketId, OrderSide, QTY_EPS};
use serde::{Deserialize, Serialize};

/// One leg of a binary position: a signed contract count and its average
/// cost. Positive quantity is long; negative (shorts enabled only) is a
/// sold contract the book has not bought back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Leg {
    pub quantity: f64,
    pub avg_cost: f64,
}

impl Leg {
    pub fn is_flat(&self) -> bool {
        self.quantity.abs() < QTY_EPS
    }

    /// Apply a signed quantity delta at a price. Returns realized P&L.
    ///
    /// Adding in the same direction blends the average cost. Reducing
    /// realizes `closed_qty * (price - avg_cost)` (sign flipped for short
    /// legs) and leaves the average untouched. A delta large enough to flip
    /// direction re-opens at the new price; the broker splits fills so this
    /// only happens when shorts are enabled.
    pub fn apply(&mut self, delta: f64, price: f64) -> f64 {
        if self.is_flat() {
            self.quantity = delta;
            self.avg_cost = price;
            return 0.0;
        }

        let same_direction = (self.quantity > 0.0) == (delta > 0.0);
        if same_direction {
            let total_cost = self.quantity.abs() * self.avg_cost + delta.abs() * price;
            self.quantity += delta;
            self.avg_cost = total_cost / self.quantity.abs();
            return 0.0;
        }

        let closing_qty = delta.abs().min(self.quantity.abs());
        let pnl = if self.quantity > 0.0 {
            closing_qty * (price - self.avg_cost)
        } else {
            closing_qty * (self.avg_cost - price)
        };

        let leftover = delta.abs() - closing_qty;
        self.quantity += delta;

        if self.quantity.abs() < QTY_EPS {
            self.quantity = 0.0;
            self.avg_cost = 0.0;
        } else if leftover > 0.0 {
            // Flipped through zero: the remainder is a fresh position.
            self.avg_cost = price;
        }

        pnl
    }

    /// Settle the leg at a terminal contract value. Returns
    /// `(cash payout, realized P&L)` and leaves the leg flat.
    pub fn settle(&mut self, contract_value: f64) -> (f64, f64) {
        if self.is_flat() {
            *self = Leg::default();
            return (0.0, 0.0);
        }
        let payout = self.quantity * contract_value;
        let cost_basis = self.quantity * self.avg_cost;
        *self = Leg::default();
        (payout, payout - cost_basis)
    }

    /// Current value of the leg at a price for its own contract.
    pub fn mark_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized(&self, price: f64) -> f64 {
        self.quantity * (price - self.avg_cost)
    }
}

/// Both legs of a market plus the P&L realized in it so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub market_id: MarketId,
    pub yes: Leg,
    pub no: Leg,
    pub realized_pnl: f64,
}

impl Position {
    pub fn new(market_id: impl Into<MarketId>) -> Self {
        Self {
            market_id: market_id.into(),
            yes: Leg::default(),
            no: Leg::default(),
            realized_pnl: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.yes.is_flat() && self.no.is_flat()
    }

    /// The leg an order side trades against.
    pub fn leg(&self, side: OrderSide) -> &Leg {
        if side.is_yes_leg() {
            &self.yes
        } else {
            &self.no
        }
    }

    pub fn leg_mut(&mut self, side: OrderSide) -> &mut Leg {
        if side.is_yes_leg() {
            &mut self.yes
        } else {
            &mut self.no
        }
    }

    /// Combined mark value at a YES price; the NO leg marks at its
    /// complement.
    pub fn mark_value(&self, yes_price: f64) -> f64 {
        self.yes.mark_value(yes_price) + self.no.mark_value(1.0 - yes_price)
    }

    pub fn unrealized(&self, yes_price: f64) -> f64 {
        self.yes.unrealized(yes_price) + self.no.unrealized(1.0 - yes_price)
    }
}
