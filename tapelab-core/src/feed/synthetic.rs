//! Seeded random-walk tape generator.
//!
//! Produces a reproducible multi-market tape for benches, property tests,
//! and smoke runs. The same seed always yields the same tape.

use super::VecFeed;
use crate::domain::{Market, Platform, Resolution, TakerSide, TradeEvent};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Build a deterministic synthetic feed.
///
/// Each market gets a bounded random walk starting near 0.5 with prints
/// every second; markets resolve YES when the walk ends above 0.5. Trades
/// across markets are interleaved in strict timestamp order.
pub fn synthetic_feed(seed: u64, num_markets: usize, trades_per_market: usize) -> VecFeed {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut markets = Vec::with_capacity(num_markets);
    let mut trades = Vec::with_capacity(num_markets * trades_per_market);

    let open_time = 0i64;
    let step_ms = 1_000i64;
    let close_time = (trades_per_market as i64 + 1) * step_ms;

    for m in 0..num_markets {
        let market_id = format!("SYN-{m:03}");
        let platform = if m % 2 == 0 {
            Platform::Kalshi
        } else {
            Platform::Polymarket
        };

        let mut price: f64 = rng.gen_range(0.30..0.70);
        for t in 0..trades_per_market {
            price = (price + rng.gen_range(-0.02..0.02)).clamp(0.02, 0.98);
            trades.push(TradeEvent {
                market_id: market_id.clone(),
                // Offset per market so prints interleave without ties.
                timestamp: open_time + (t as i64 + 1) * step_ms + m as i64,
                yes_price: price,
                size: rng.gen_range(1.0..50.0),
                taker_side: if rng.gen_bool(0.5) {
                    TakerSide::TakerBoughtYes
                } else {
                    TakerSide::TakerBoughtNo
                },
            });
        }

        let resolution = if price > 0.5 {
            Resolution::ResolvedYes
        } else {
            Resolution::ResolvedNo
        };
        markets.push(
            Market::new(market_id.clone(), platform, open_time, close_time)
                .with_title(format!("Synthetic market {m}"))
                .with_resolution(resolution),
        );
    }

    trades.sort_by_key(|t| t.timestamp);
    VecFeed::new(markets, trades)
}
