//! Portfolio accounting — cash, two-leg positions, settlement, snapshots.
//!
//! Positions hold YES and NO legs separately; the NO leg marks at the
//! complement of the last-seen YES price. The accounting identity
//! `cash + Σ mark_value == initial_cash + realized + unrealized` is
//! enforced by `verify_accounting` and breaks the run when violated.

use crate::domain::{Fill, MarketId, Position, PositionSummary, Resolution, Snapshot, Timestamp};
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    initial_cash: f64,
    realized_pnl: f64,
    positions: BTreeMap<MarketId, Position>,
    last_prices: BTreeMap<MarketId, f64>,
    fills: Vec<Fill>,
    resolved_markets: BTreeSet<MarketId>,
}

impl Portfolio {
    pub fn new(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            initial_cash,
            realized_pnl: 0.0,
            positions: BTreeMap::new(),
            last_prices: BTreeMap::new(),
            fills: Vec::new(),
            resolved_markets: BTreeSet::new(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    /// Ordered log of every fill applied to this portfolio.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn position(&self, market_id: &str) -> Option<&Position> {
        self.positions.get(market_id)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn is_resolved(&self, market_id: &str) -> bool {
        self.resolved_markets.contains(market_id)
    }

    /// Record the latest YES print for mark-to-market valuation.
    pub fn record_price(&mut self, market_id: &str, yes_price: f64) {
        self.last_prices.insert(market_id.to_string(), yes_price);
    }

    /// Apply a fill: move cash, update the touched leg, realize P&L on
    /// reductions, and append to the fill log.
    pub fn apply_fill(&mut self, fill: &Fill) {
        let pos = self
            .positions
            .entry(fill.market_id.clone())
            .or_insert_with(|| Position::new(fill.market_id.clone()));

        let delta = if fill.side.is_buy() {
            fill.quantity
        } else {
            -fill.quantity
        };
        let realized = pos.leg_mut(fill.side).apply(delta, fill.price);

        self.cash += fill.cash_delta();
        pos.realized_pnl += realized - fill.commission;
        self.realized_pnl += realized - fill.commission;
        self.fills.push(fill.clone());
    }

    /// Settle every leg in a market at its terminal value and clear the
    /// position. Idempotent; returns the realized P&L delta.
    pub fn resolve_market(&mut self, market_id: &str, outcome: Resolution) -> f64 {
        let Some(yes_value) = outcome.yes_settlement() else {
            return 0.0;
        };
        if !self.resolved_markets.insert(market_id.to_string()) {
            return 0.0;
        }
        let Some(pos) = self.positions.get_mut(market_id) else {
            return 0.0;
        };

        let (yes_payout, yes_pnl) = pos.yes.settle(yes_value);
        let (no_payout, no_pnl) = pos.no.settle(1.0 - yes_value);
        let pnl = yes_pnl + no_pnl;

        self.cash += yes_payout + no_payout;
        pos.realized_pnl += pnl;
        self.realized_pnl += pnl;
        pnl
    }

    /// YES price used to mark a position: last print, falling back to the
    /// position's own cost basis when the market has never printed.
    fn mark_price(&self, pos: &Position) -> f64 {
        if let Some(&price) = self.last_prices.get(&pos.market_id) {
            return price;
        }
        if !pos.yes.is_flat() {
            pos.yes.avg_cost
        } else {
            1.0 - pos.no.avg_cost
        }
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| p.unrealized(self.mark_price(p)))
            .sum()
    }

    /// Equity: cash plus the mark value of every open position.
    pub fn equity(&self) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter(|p| !p.is_flat())
            .map(|p| p.mark_value(self.mark_price(p)))
            .sum();
        self.cash + position_value
    }

    pub fn snapshot(&self, timestamp: Timestamp) -> Snapshot {
        let mut positions = BTreeMap::new();
        for (mid, pos) in &self.positions {
            if pos.is_flat() {
                continue;
            }
            positions.insert(
                mid.clone(),
                PositionSummary {
                    yes_quantity: pos.yes.quantity,
                    yes_avg_cost: pos.yes.avg_cost,
                    no_quantity: pos.no.quantity,
                    no_avg_cost: pos.no.avg_cost,
                },
            );
        }
        Snapshot {
            timestamp,
            cash: self.cash,
            equity: self.equity(),
            realized_pnl: self.realized_pnl,
            unrealized_pnl: self.unrealized_pnl(),
            open_positions: positions.len(),
            positions,
        }
    }

    /// Check the accounting identity to within 1e-6. A breach means a bug
    /// somewhere upstream and is fatal.
    pub fn verify_accounting(&self, timestamp: Timestamp) -> Result<(), EngineError> {
        let lhs = self.equity();
        let rhs = self.initial_cash + self.realized_pnl + self.unrealized_pnl();
        if (lhs - rhs).abs() > 1e-6 {
            return Err(EngineError::AccountingViolation {
                timestamp,
                detail: format!(
                    "cash={:.9} equity={:.9} vs initial={:.9} + realized={:.9} + unrealized={:.9}",
                    self.cash,
                    lhs,
                    self.initial_cash,
                    self.realized_pnl,
                    self.unrealized_pnl()
                ),
            });
        }
        Ok(())
    }

    /// Realized P&L per market, for per-trade statistics.
    pub fn market_pnls(&self) -> BTreeMap<MarketId, f64> {
        self.positions
            .iter()
            .map(|(mid, pos)| (mid.clone(), pos.realized_pnl))
            .collect()
    }

    /// Markets the portfolio has ever filled in.
    pub fn traded_markets(&self) -> BTreeSet<MarketId> {
        self.fills.iter().map(|f| f.market_id.clone()).collect()
    }
}
