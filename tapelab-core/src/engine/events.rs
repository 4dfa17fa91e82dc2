//! Lifecycle derivation and the time-ordered event merge.
//!
//! The engine sees one merged stream: lifecycle events derived from market
//! metadata plus the feed's trades. At equal timestamps the class order is
//! open < trade < close < resolve; within a class, feed order is kept.

use crate::domain::{MarketId, Resolution, Timestamp, TradeEvent};
use crate::error::EngineError;
use crate::feed::Feed;

/// One event in the merged stream.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    MarketOpen {
        market_id: MarketId,
        timestamp: Timestamp,
    },
    Trade(TradeEvent),
    MarketClose {
        market_id: MarketId,
        timestamp: Timestamp,
    },
    MarketResolve {
        market_id: MarketId,
        timestamp: Timestamp,
        outcome: Resolution,
    },
}

impl EngineEvent {
    pub fn timestamp(&self) -> Timestamp {
        match self {
            EngineEvent::MarketOpen { timestamp, .. } => *timestamp,
            EngineEvent::Trade(t) => t.timestamp,
            EngineEvent::MarketClose { timestamp, .. } => *timestamp,
            EngineEvent::MarketResolve { timestamp, .. } => *timestamp,
        }
    }

    /// Tie-break rank at equal timestamps.
    fn class_rank(&self) -> u8 {
        match self {
            EngineEvent::MarketOpen { .. } => 0,
            EngineEvent::Trade(_) => 1,
            EngineEvent::MarketClose { .. } => 2,
            EngineEvent::MarketResolve { .. } => 3,
        }
    }
}

/// Market metadata needed to build the lifecycle schedule.
pub struct MarketSchedule {
    pub market_id: MarketId,
    pub open_time: Timestamp,
    pub close_time: Timestamp,
    pub resolution: Resolution,
}

/// Pulls lifecycle events and feed trades in merged timestamp order,
/// enforcing the feed's monotonicity contract.
pub struct EventMerger<'a> {
    lifecycle: Vec<EngineEvent>,
    next_lifecycle: usize,
    feed: &'a mut dyn Feed,
    pending_trade: Option<TradeEvent>,
    last_trade_ts: Option<Timestamp>,
}

impl<'a> EventMerger<'a> {
    pub fn new(schedules: Vec<MarketSchedule>, feed: &'a mut dyn Feed) -> Self {
        let mut lifecycle = Vec::with_capacity(schedules.len() * 3);
        for schedule in schedules {
            lifecycle.push(EngineEvent::MarketOpen {
                market_id: schedule.market_id.clone(),
                timestamp: schedule.open_time,
            });
            lifecycle.push(EngineEvent::MarketClose {
                market_id: schedule.market_id.clone(),
                timestamp: schedule.close_time,
            });
            if schedule.resolution.is_resolved() {
                // The feed carries no separate resolution timestamp:
                // resolution fires at close, after the close event.
                lifecycle.push(EngineEvent::MarketResolve {
                    market_id: schedule.market_id,
                    timestamp: schedule.close_time,
                    outcome: schedule.resolution,
                });
            }
        }
        // Stable sort preserves registration order within a class.
        lifecycle.sort_by_key(|e| (e.timestamp(), e.class_rank()));

        Self {
            lifecycle,
            next_lifecycle: 0,
            feed,
            pending_trade: None,
            last_trade_ts: None,
        }
    }

    fn refill_pending(&mut self) -> Result<(), EngineError> {
        if self.pending_trade.is_some() {
            return Ok(());
        }
        if let Some(trade) = self.feed.next_trade() {
            if let Some(last) = self.last_trade_ts {
                if trade.timestamp < last {
                    return Err(EngineError::FeedOrderViolation {
                        timestamp: trade.timestamp,
                        last_timestamp: last,
                    });
                }
            }
            self.last_trade_ts = Some(trade.timestamp);
            self.pending_trade = Some(trade);
        }
        Ok(())
    }

    /// Next event in merged order, or `None` when both sources are dry.
    pub fn next_event(&mut self) -> Result<Option<EngineEvent>, EngineError> {
        self.refill_pending()?;

        let lifecycle = self.lifecycle.get(self.next_lifecycle);
        let take_trade = match (&self.pending_trade, lifecycle) {
            (Some(trade), Some(event)) => {
                (trade.timestamp, 1u8) < (event.timestamp(), event.class_rank())
            }
            (Some(_), None) => true,
            (None, _) => false,
        };

        if take_trade {
            return Ok(self.pending_trade.take().map(EngineEvent::Trade));
        }
        if lifecycle.is_some() {
            let event = self.lifecycle[self.next_lifecycle].clone();
            self.next_lifecycle += 1;
            return Ok(Some(event));
        }
        Ok(None)
    }
}
