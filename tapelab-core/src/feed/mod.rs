//! Feed abstraction — where the historical tape comes from.
//!
//! Readers for real venue exports (parquet dumps, websocket captures)
//! live outside the core; the engine only requires this trait.

pub mod synthetic;

use crate::domain::{Market, TradeEvent};

/// Source of market metadata and a timestamp-sorted trade tape.
pub trait Feed {
    /// Market metadata, read once at startup.
    fn markets(&self) -> Vec<Market>;

    /// Next trade in timestamp order. Not restartable.
    fn next_trade(&mut self) -> Option<TradeEvent>;

    /// Approximate number of trades, for progress reporting.
    fn trade_count(&self) -> usize;
}

/// In-memory feed over pre-built vectors. The workhorse for tests and for
/// tapes small enough to materialize.
#[derive(Debug, Clone)]
pub struct VecFeed {
    markets: Vec<Market>,
    trades: std::collections::VecDeque<TradeEvent>,
    total: usize,
}

impl VecFeed {
    pub fn new(markets: Vec<Market>, trades: Vec<TradeEvent>) -> Self {
        let total = trades.len();
        Self {
            markets,
            trades: trades.into(),
            total,
        }
    }
}

impl Feed for VecFeed {
    fn markets(&self) -> Vec<Market> {
        self.markets.clone()
    }

    fn next_trade(&mut self) -> Option<TradeEvent> {
        self.trades.pop_front()
    }

    fn trade_count(&self) -> usize {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Platform, TakerSide};

    #[test]
    fn vec_feed_drains_in_order() {
        let markets = vec![Market::new("A", Platform::Kalshi, 0, 100)];
        let trades = vec![
            TradeEvent {
                market_id: "A".into(),
                timestamp: 1,
                yes_price: 0.5,
                size: 1.0,
                taker_side: TakerSide::TakerBoughtYes,
            },
            TradeEvent {
                market_id: "A".into(),
                timestamp: 2,
                yes_price: 0.6,
                size: 2.0,
                taker_side: TakerSide::TakerBoughtNo,
            },
        ];
        let mut feed = VecFeed::new(markets, trades);
        assert_eq!(feed.trade_count(), 2);
        assert_eq!(feed.markets().len(), 1);
        assert_eq!(feed.next_trade().unwrap().timestamp, 1);
        assert_eq!(feed.next_trade().unwrap().timestamp, 2);
        assert!(feed.next_trade().is_none());
        // trade_count stays at the original total.
        assert_eq!(feed.trade_count(), 2);
    }
}
