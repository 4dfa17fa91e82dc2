//! Buy-low — buys YES contracts below a threshold, holds to resolution.

use crate::domain::{MarketId, TradeEvent};
use crate::strategy::{Strategy, StrategyContext};
use std::collections::HashSet;

/// Buys YES when the price drops below a threshold, one order per market,
/// and holds to resolution.
///
/// A simple mean-reversion idea: contracts printing very low may be
/// undervalued relative to their true probability of resolving YES.
pub struct BuyLow {
    threshold: f64,
    quantity: f64,
    ordered: HashSet<MarketId>,
}

impl BuyLow {
    pub fn new(threshold: f64, quantity: f64) -> Self {
        Self {
            threshold,
            quantity,
            ordered: HashSet::new(),
        }
    }
}

impl Default for BuyLow {
    fn default() -> Self {
        Self::new(0.20, 10.0)
    }
}

impl Strategy for BuyLow {
    fn name(&self) -> &str {
        "buy_low"
    }

    fn on_trade(&mut self, ctx: &mut StrategyContext<'_>, trade: &TradeEvent) {
        if self.ordered.contains(&trade.market_id) {
            return;
        }
        if trade.yes_price < self.threshold {
            // Placement failures (e.g. market just closed) are not acted on.
            let _ = ctx.buy_yes(&trade.market_id, self.threshold, self.quantity);
            self.ordered.insert(trade.market_id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{Broker, MatchPolicy};
    use crate::domain::{Market, Platform, TakerSide};
    use crate::portfolio::Portfolio;
    use std::collections::BTreeMap;

    fn trade(price: f64) -> TradeEvent {
        TradeEvent {
            market_id: "MKT".into(),
            timestamp: 5,
            yes_price: price,
            size: 1.0,
            taker_side: TakerSide::TakerBoughtYes,
        }
    }

    #[test]
    fn orders_once_below_threshold() {
        let market = Market::new("MKT", Platform::Kalshi, 0, 1000);
        let mut broker = Broker::new(MatchPolicy::default());
        broker.register_market(&market);
        let portfolio = Portfolio::new(1000.0);
        let mut markets = BTreeMap::new();
        markets.insert(market.id.clone(), market);

        let mut strategy = BuyLow::new(0.20, 10.0);
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, 5);

        strategy.on_trade(&mut ctx, &trade(0.50));
        assert_eq!(ctx.open_orders(None).len(), 0);

        strategy.on_trade(&mut ctx, &trade(0.15));
        assert_eq!(ctx.open_orders(None).len(), 1);
        assert_eq!(ctx.open_orders(None)[0].price, 0.20);

        // Second dip in the same market: no duplicate order.
        strategy.on_trade(&mut ctx, &trade(0.10));
        assert_eq!(ctx.open_orders(None).len(), 1);
    }
}
