//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. No negative legs when shorts are disabled
//! 2. The accounting identity holds at every snapshot
//! 3. Strategies observe nondecreasing timestamps
//! 4. Fills are never better than the order's limit
//! 5. The taker-side rule holds for every fill
//! 6. Cancellation is idempotent
//! 7. Slippage is monotone in size and in distance from 0.5
//! 8. Replays are byte-identical

use proptest::prelude::*;
// proptest's Strategy trait clashes with the engine's; alias it.
use proptest::strategy::Strategy as ArbStrategy;
use std::collections::HashMap;
use tapelab_core::broker::{Broker, MatchPolicy};
use tapelab_core::domain::{
    Fill, Market, OrderSide, Platform, Resolution, TakerSide, TradeEvent,
};
use tapelab_core::engine::{
    run_backtest, EngineConfig, EventPayload, NdjsonSink, SnapshotInterval, VecSink,
};
use tapelab_core::feed::synthetic::synthetic_feed;
use tapelab_core::feed::VecFeed;
use tapelab_core::portfolio::Portfolio;
use tapelab_core::slippage::{impact_multiplier, spread_multiplier};
use tapelab_core::strategy::examples::BuyLow;
use tapelab_core::strategy::{Strategy, StrategyContext};

// ── Tape generation ──────────────────────────────────────────────────

fn arb_tape() -> impl ArbStrategy<Value = (Vec<TradeEvent>, Resolution)> {
    let print = (0.02f64..0.98, 1.0f64..20.0, any::<bool>());
    (prop::collection::vec(print, 1..80), any::<bool>()).prop_map(|(prints, yes)| {
        let trades = prints
            .into_iter()
            .enumerate()
            .map(|(i, (price, size, taker))| TradeEvent {
                market_id: "M".into(),
                timestamp: 10 * (i as i64 + 1),
                yes_price: price,
                size,
                taker_side: if taker {
                    TakerSide::TakerBoughtYes
                } else {
                    TakerSide::TakerBoughtNo
                },
            })
            .collect();
        let resolution = if yes {
            Resolution::ResolvedYes
        } else {
            Resolution::ResolvedNo
        };
        (trades, resolution)
    })
}

/// Deterministic trading pattern that buys, sells what it holds, and
/// periodically cancels, while recording everything it sees.
struct GridTrader {
    counter: u64,
    limits: HashMap<u64, (OrderSide, f64)>,
    fills: Vec<Fill>,
    observed_ts: Vec<i64>,
    leg_violations: usize,
}

impl GridTrader {
    fn new() -> Self {
        Self {
            counter: 0,
            limits: HashMap::new(),
            fills: Vec::new(),
            observed_ts: Vec::new(),
            leg_violations: 0,
        }
    }

    fn snap(price: f64) -> f64 {
        ((price / 0.01).round() * 0.01).clamp(0.01, 0.99)
    }
}

impl Strategy for GridTrader {
    fn name(&self) -> &str {
        "grid_trader"
    }

    fn on_trade(&mut self, ctx: &mut StrategyContext<'_>, trade: &TradeEvent) {
        self.observed_ts.push(ctx.timestamp());
        self.counter += 1;
        let price = Self::snap(trade.yes_price);

        if self.counter % 7 == 0 {
            ctx.cancel_all(None);
            return;
        }

        let held = ctx
            .portfolio()
            .position(&trade.market_id)
            .map(|p| p.yes.quantity)
            .unwrap_or(0.0);

        if self.counter % 3 == 0 && held >= 5.0 {
            if let Ok(id) = ctx.sell_yes(&trade.market_id, price, 3.0) {
                self.limits.insert(id.0, (OrderSide::SellYes, price));
            }
        } else if ctx.open_orders(None).len() < 4 {
            if let Ok(id) = ctx.buy_yes(&trade.market_id, price, 2.0) {
                self.limits.insert(id.0, (OrderSide::BuyYes, price));
            }
        }
    }

    fn on_fill(&mut self, ctx: &mut StrategyContext<'_>, fill: &Fill) {
        self.fills.push(fill.clone());
        if let Some(pos) = ctx.portfolio().position(&fill.market_id) {
            if pos.yes.quantity < -1e-9 || pos.no.quantity < -1e-9 {
                self.leg_violations += 1;
            }
        }
    }
}

// ── 1–5: engine invariants over random tapes ─────────────────────────

proptest! {
    #[test]
    fn engine_invariants_hold_over_random_tapes((trades, resolution) in arb_tape()) {
        let close = trades.last().map(|t| t.timestamp + 10).unwrap_or(100);
        let markets = vec![
            Market::new("M", Platform::Kalshi, 0, close).with_resolution(resolution)
        ];
        let mut feed = VecFeed::new(markets, trades);
        let mut strategy = GridTrader::new();
        let mut sink = VecSink::new();
        let config = EngineConfig::new(1_000.0)
            .with_commission(0.001)
            .with_snapshot_interval(SnapshotInterval::Events(8));

        // The engine self-checks the accounting identity: a violation
        // would surface here as an error.
        let result = run_backtest(&mut feed, &mut strategy, &config, &mut sink).unwrap();

        // 1. No negative legs, observed at every fill and at the end.
        prop_assert_eq!(strategy.leg_violations, 0);
        for pos in result.portfolio.positions() {
            prop_assert!(pos.yes.quantity >= -1e-9);
            prop_assert!(pos.no.quantity >= -1e-9);
        }

        // 2. Accounting identity at every sampled snapshot.
        for snap in &result.snapshots {
            let gap = snap.equity - (1_000.0 + snap.realized_pnl + snap.unrealized_pnl);
            prop_assert!(gap.abs() < 1e-6, "identity gap {gap} at ts {}", snap.timestamp);
        }

        // 3. Strategy saw nondecreasing timestamps.
        for pair in strategy.observed_ts.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }

        // 4. Never filled better than the limit.
        for fill in &strategy.fills {
            let (side, limit) = strategy.limits[&fill.order_id.0];
            prop_assert_eq!(side, fill.side);
            if side.is_buy() {
                prop_assert!(fill.price >= limit - 1e-9, "buy at {} under limit {limit}", fill.price);
            } else {
                prop_assert!(fill.price <= limit + 1e-9, "sell at {} over limit {limit}", fill.price);
            }
        }

        // 5. Every fill respects the taker-side rule.
        let mut last_taker = None;
        for record in &sink.records {
            match &record.payload {
                EventPayload::Trade { taker_side, .. } => last_taker = Some(*taker_side),
                EventPayload::Fill(fill) => {
                    let taker = last_taker.expect("fill before any trade");
                    if fill.side.is_bid() {
                        prop_assert_eq!(taker, TakerSide::TakerBoughtNo);
                    } else {
                        prop_assert_eq!(taker, TakerSide::TakerBoughtYes);
                    }
                }
                _ => {}
            }
        }
    }
}

// ── 6. Cancel idempotence ────────────────────────────────────────────

proptest! {
    #[test]
    fn cancel_is_idempotent(price_ticks in 1u32..99, qty in 0.5f64..50.0) {
        let market = Market::new("M", Platform::Kalshi, 0, 1_000);
        let mut broker = Broker::new(MatchPolicy::default());
        broker.register_market(&market);
        let portfolio = Portfolio::new(1_000.0);

        let price = price_ticks as f64 * 0.01;
        let id = broker.place("M", OrderSide::BuyYes, price, qty, 0, &portfolio).unwrap();

        prop_assert!(broker.cancel(id).is_ok());
        let after_first = broker.open_order_count();
        prop_assert!(broker.cancel(id).is_err());
        prop_assert_eq!(broker.open_order_count(), after_first);
        prop_assert_eq!(after_first, 0);
    }
}

// ── 7. Slippage monotonicity ─────────────────────────────────────────

proptest! {
    #[test]
    fn impact_monotone_in_size(q1 in 0.1f64..100.0, q2 in 0.1f64..100.0, ema in 0.1f64..50.0) {
        let (small, large) = if q1 <= q2 { (q1, q2) } else { (q2, q1) };
        prop_assert!(impact_multiplier(small, ema) <= impact_multiplier(large, ema));
    }

    #[test]
    fn spread_monotone_in_distance_from_half(p1 in 0.01f64..0.99, p2 in 0.01f64..0.99) {
        let (near, far) = if (p1 - 0.5).abs() <= (p2 - 0.5).abs() {
            (p1, p2)
        } else {
            (p2, p1)
        };
        prop_assert!(spread_multiplier(near) <= spread_multiplier(far) + 1e-12);
    }
}

// ── 8. Replay determinism ────────────────────────────────────────────

proptest! {
    #[test]
    fn replays_are_byte_identical(seed in any::<u64>()) {
        let run = || {
            let mut feed = synthetic_feed(seed, 2, 30);
            let mut strategy = BuyLow::new(0.45, 5.0);
            let mut sink = NdjsonSink::new(Vec::new());
            let config = EngineConfig::new(5_000.0)
                .with_snapshot_interval(SnapshotInterval::Events(10));
            run_backtest(&mut feed, &mut strategy, &config, &mut sink).unwrap();
            sink.into_inner()
        };
        prop_assert_eq!(run(), run());
    }
}
