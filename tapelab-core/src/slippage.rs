//! Slippage: a spread-vs-price curve times a square-root impact term.
//!
//! Execution cost has two multipliers on top of the configured base:
//! - Spread factor: books thin out near the price boundaries, so the
//!   effective spread widens as the YES price approaches 0 or 1.
//! - Size factor: fills large relative to the market's typical trade size
//!   pay more, square-root style (Almgren-Chriss / Kyle-lambda shape).
//!
//! Typical trade size is an exponential moving average maintained per
//! market, updated on every print *before* matching so the incoming trade
//! influences its own impact.

use crate::domain::{MarketId, Order};
use std::collections::HashMap;

/// Floor for the EMA denominator in the impact term.
const EMA_FLOOR: f64 = 1e-6;

/// Spread multiplier over the YES-equivalent price.
///
/// `0.25 / (p * (1 - p))`, clamped to [1, 6]: 1.0 at p = 0.5, ~1.96 at
/// p = 0.15 or 0.85, ~5.26 at p = 0.05 or 0.95, monotone in |p - 0.5|.
pub fn spread_multiplier(yes_price: f64) -> f64 {
    let variance = (yes_price * (1.0 - yes_price)).max(1e-12);
    (0.25 / variance).clamp(1.0, 6.0)
}

/// Size multiplier: sqrt of fill quantity over typical trade size.
///
/// A fill 4x typical size pays 2x base impact; 100x pays 10x. Sub-typical
/// fills pay proportionally less.
pub fn impact_multiplier(quantity: f64, avg_trade_size: f64) -> f64 {
    (quantity / avg_trade_size.max(EMA_FLOOR)).sqrt()
}

/// Per-market slippage state and the combined price adjustment.
#[derive(Debug, Clone)]
pub struct SlippageModel {
    base: f64,
    alpha: f64,
    ema_trade_size: HashMap<MarketId, f64>,
}

impl SlippageModel {
    pub fn new(base: f64, alpha: f64) -> Self {
        Self {
            base,
            alpha,
            ema_trade_size: HashMap::new(),
        }
    }

    /// Fold a print into the market's trade-size EMA. The first
    /// observation seeds the EMA at the observed size.
    pub fn observe_trade(&mut self, market_id: &str, size: f64) {
        match self.ema_trade_size.get_mut(market_id) {
            Some(ema) => *ema = *ema * (1.0 - self.alpha) + size * self.alpha,
            None => {
                self.ema_trade_size.insert(market_id.to_string(), size);
            }
        }
    }

    /// Current trade-size EMA for a market, if any print has been seen.
    pub fn ema(&self, market_id: &str) -> Option<f64> {
        self.ema_trade_size.get(market_id).copied()
    }

    /// Total price adjustment for a fill of `quantity` against `order`.
    ///
    /// The spread factor is computed from the order's YES-equivalent limit
    /// (one curve for both legs).
    pub fn price_adjustment(&self, order: &Order, quantity: f64) -> f64 {
        if self.base == 0.0 {
            return 0.0;
        }
        let ema = self
            .ema_trade_size
            .get(&order.market_id)
            .copied()
            .unwrap_or(quantity);
        self.base * spread_multiplier(order.yes_equivalent_price()) * impact_multiplier(quantity, ema)
    }

    /// Execution price for a fill: the order's own limit moved against the
    /// trader and clamped into the valid price range.
    pub fn adjusted_price(&self, order: &Order, quantity: f64, tick_size: f64) -> f64 {
        let delta = self.price_adjustment(order, quantity);
        let raw = if order.side.is_buy() {
            order.price + delta
        } else {
            order.price - delta
        };
        raw.clamp(tick_size, 1.0 - tick_size)
    }
}
