//! The event loop — merge, match, account, notify.
//!
//! Per trade: (1) fold the print into the slippage EMA, (2) let the broker
//! match resting orders, (3) apply fills to the portfolio firing `on_fill`,
//! (4) snapshot if a sampling boundary was crossed, (5) fire `on_trade`.
//! Lifecycle events mutate market state before their strategy hooks run.
//!
//! The loop is single-threaded and runs each event to completion; the only
//! suspension point is the cooperative stop flag checked between events.

use super::config::{EngineConfig, SnapshotInterval};
use super::event_log::{EventRecord, EventSink};
use super::events::{EngineEvent, EventMerger, MarketSchedule};
use crate::broker::{Broker, MatchPolicy};
use crate::domain::{Fill, Market, MarketId, MarketPhase, Snapshot, Timestamp};
use crate::error::EngineError;
use crate::feed::Feed;
use crate::portfolio::Portfolio;
use crate::slippage::SlippageModel;
use crate::strategy::{Strategy, StrategyContext};
use std::collections::BTreeMap;

/// Everything a run produces besides the streamed event log.
#[derive(Debug)]
pub struct RunResult {
    pub portfolio: Portfolio,
    pub snapshots: Vec<Snapshot>,
    pub events_processed: u64,
    pub trades_processed: u64,
    pub stopped_early: bool,
}

impl RunResult {
    /// Ordered log of every fill in the run.
    pub fn fills(&self) -> &[Fill] {
        self.portfolio.fills()
    }
}

/// Decides when a trade crosses a snapshot boundary.
struct SnapshotSampler {
    interval: Option<SnapshotInterval>,
    trades_seen: u64,
    last_snapshot_ts: Option<Timestamp>,
}

impl SnapshotSampler {
    fn new(interval: Option<SnapshotInterval>) -> Self {
        Self {
            interval,
            trades_seen: 0,
            last_snapshot_ts: None,
        }
    }

    fn on_trade(&mut self, ts: Timestamp) -> bool {
        self.trades_seen += 1;
        match self.interval {
            None => false,
            Some(SnapshotInterval::Events(n)) => n > 0 && self.trades_seen % n == 0,
            Some(SnapshotInterval::Millis(window)) => match self.last_snapshot_ts {
                None => {
                    self.last_snapshot_ts = Some(ts);
                    false
                }
                Some(last) => {
                    if ts - last >= window {
                        self.last_snapshot_ts = Some(ts);
                        true
                    } else {
                        false
                    }
                }
            },
        }
    }
}

/// Run a strategy over a feed. The engine is pure in
/// `(feed, config, strategy) -> (result, event log)`.
pub fn run_backtest(
    feed: &mut dyn Feed,
    strategy: &mut dyn Strategy,
    config: &EngineConfig,
    sink: &mut dyn EventSink,
) -> Result<RunResult, EngineError> {
    let market_list = feed.markets();
    let approx_trades = feed.trade_count();

    let mut markets: BTreeMap<MarketId, Market> = BTreeMap::new();
    let mut broker = Broker::new(MatchPolicy {
        allow_short: config.allow_short,
        commission_rate: config.commission_rate,
    });
    for market in &market_list {
        broker.register_market(market);
        markets.insert(market.id.clone(), market.clone());
    }

    let mut portfolio = Portfolio::new(config.initial_cash);
    let mut slippage = SlippageModel::new(config.base_slippage, config.ema_alpha);
    let mut sampler = SnapshotSampler::new(config.snapshot_interval);
    let mut snapshots = Vec::new();

    let schedules = market_list
        .iter()
        .map(|m| MarketSchedule {
            market_id: m.id.clone(),
            open_time: m.open_time,
            close_time: m.close_time,
            resolution: m.resolution,
        })
        .collect();
    let mut merger = EventMerger::new(schedules, feed);

    tracing::info!(
        strategy = strategy.name(),
        markets = markets.len(),
        approx_trades,
        initial_cash = config.initial_cash,
        "backtest start"
    );

    let start_ts = markets.values().map(|m| m.open_time).min().unwrap_or(0);
    {
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, start_ts);
        strategy.initialize(&mut ctx);
    }

    let mut events_processed = 0u64;
    let mut trades_processed = 0u64;
    let mut stopped_early = false;
    let mut last_ts = start_ts;

    while let Some(event) = merger.next_event().inspect_err(log_fatal)? {
        if config.stop.as_ref().is_some_and(|s| s.is_set()) {
            stopped_early = true;
            tracing::info!(events_processed, "stop signal received");
            break;
        }

        let ts = event.timestamp();
        last_ts = ts;

        match event {
            EngineEvent::MarketOpen {
                market_id,
                timestamp,
            } => {
                sink.record(&EventRecord::open(timestamp, &market_id))?;
                tracing::debug!(market = %market_id, time = %fmt_ts(timestamp), "market open");
                if let Some(market) = markets.get(&market_id) {
                    let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, ts);
                    strategy.on_market_open(&mut ctx, market);
                }
            }

            EngineEvent::Trade(trade) => {
                if !markets.contains_key(&trade.market_id) {
                    tracing::warn!(market = %trade.market_id, "trade for unregistered market, skipping");
                    continue;
                }
                if let Err(err) = trade.validate() {
                    tracing::warn!(error = %err, "malformed trade, skipping");
                    continue;
                }

                trades_processed += 1;
                slippage.observe_trade(&trade.market_id, trade.size);
                portfolio.record_price(&trade.market_id, trade.yes_price);
                sink.record(&EventRecord::trade(&trade))?;

                let fills = broker.match_trade(&trade, &slippage, &portfolio);
                for fill in &fills {
                    portfolio.apply_fill(fill);
                    sink.record(&EventRecord::fill(fill))?;
                    tracing::debug!(
                        order_id = fill.order_id.0,
                        market = %fill.market_id,
                        side = %fill.side,
                        price = fill.price,
                        quantity = fill.quantity,
                        "order filled"
                    );
                    let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, ts);
                    strategy.on_fill(&mut ctx, fill);
                }

                if sampler.on_trade(ts) {
                    portfolio.verify_accounting(ts).inspect_err(log_fatal)?;
                    let snapshot = portfolio.snapshot(ts);
                    sink.record(&EventRecord::snapshot(&snapshot))?;
                    snapshots.push(snapshot);
                }

                let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, ts);
                strategy.on_trade(&mut ctx, &trade);

                if trades_processed % 250_000 == 0 {
                    tracing::debug!(trades_processed, approx_trades, "progress");
                }
            }

            EngineEvent::MarketClose {
                market_id,
                timestamp,
            } => {
                let canceled = broker.cancel_all(Some(&market_id));
                broker.set_phase(&market_id, MarketPhase::Closed);
                sink.record(&EventRecord::close(timestamp, &market_id))?;
                tracing::debug!(market = %market_id, canceled, time = %fmt_ts(timestamp), "market close");

                let resolves_now = markets
                    .get(&market_id)
                    .map(|m| m.resolution.is_resolved())
                    .unwrap_or(false);
                if !resolves_now {
                    if let Some(market) = markets.get(&market_id) {
                        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, ts);
                        strategy.on_market_close(&mut ctx, market);
                    }
                }
                // Resolving markets fire their close hook from the resolve
                // event at this same timestamp, after the payout posts.
            }

            EngineEvent::MarketResolve {
                market_id,
                timestamp,
                outcome,
            } => {
                let pnl = portfolio.resolve_market(&market_id, outcome);
                broker.set_phase(&market_id, MarketPhase::Resolved);
                sink.record(&EventRecord::resolve(timestamp, &market_id, outcome, pnl))?;
                portfolio.verify_accounting(timestamp).inspect_err(log_fatal)?;
                tracing::info!(
                    market = %market_id,
                    outcome = ?outcome,
                    pnl,
                    "market resolved"
                );

                if let Some(market) = markets.get(&market_id) {
                    let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, ts);
                    strategy.on_market_close(&mut ctx, market);
                    strategy.on_market_resolve(&mut ctx, market, outcome);
                }
            }
        }

        events_processed += 1;
    }

    if events_processed > 0 {
        portfolio.verify_accounting(last_ts).inspect_err(log_fatal)?;
        let snapshot = portfolio.snapshot(last_ts);
        sink.record(&EventRecord::snapshot(&snapshot))?;
        snapshots.push(snapshot);
    }

    {
        let mut ctx = StrategyContext::new(&mut broker, &portfolio, &markets, last_ts);
        strategy.finalize(&mut ctx);
    }

    tracing::info!(
        events_processed,
        trades_processed,
        fills = portfolio.fills().len(),
        final_cash = portfolio.cash(),
        final_equity = portfolio.equity(),
        "backtest complete"
    );

    Ok(RunResult {
        portfolio,
        snapshots,
        events_processed,
        trades_processed,
        stopped_early,
    })
}

fn log_fatal(err: &EngineError) {
    tracing::error!(error = %err, "fatal engine error");
}

fn fmt_ts(ts: Timestamp) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}
