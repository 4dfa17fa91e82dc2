//! Order management and taker-side fill matching.
//!
//! Resting limit orders live in per-market books: a bid ladder (BuyYes,
//! SellNo) and an ask ladder (SellYes, BuyNo), both keyed by
//! YES-equivalent price. An incoming print fills only the side opposite
//! its taker: a YES taker lifted an ask, so it can consume resting asks;
//! a NO taker hit a bid and consumes bids. Ignoring the taker side
//! double-counts liquidity and inflates backtest returns.
//!
//! Fills execute at the order's own limit adjusted by the slippage model,
//! not at the tape price, so a strategy pays its quoted edge plus impact.

mod ladder;

pub use ladder::Ladder;

use crate::domain::{
    Fill, Market, MarketId, MarketPhase, Order, OrderId, OrderSide, OrderStatus, TakerSide,
    Timestamp, TradeEvent, PRICE_EPS, QTY_EPS,
};
use crate::error::EngineError;
use crate::portfolio::Portfolio;
use crate::slippage::SlippageModel;
use std::collections::{BTreeMap, HashMap};

/// Matching behavior shared by every book.
#[derive(Debug, Clone, Copy)]
pub struct MatchPolicy {
    pub allow_short: bool,
    pub commission_rate: f64,
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self {
            allow_short: false,
            commission_rate: 0.0,
        }
    }
}

#[derive(Debug)]
struct MarketBook {
    tick_size: f64,
    /// Number of ticks in 1.0; the valid grid is [1, max_ticks - 1].
    max_ticks: u32,
    phase: MarketPhase,
    bids: Ladder,
    asks: Ladder,
    /// Resting orders only; terminal orders are dropped immediately.
    orders: BTreeMap<u64, Order>,
}

impl MarketBook {
    fn new(tick_size: f64) -> Self {
        Self {
            tick_size,
            max_ticks: (1.0 / tick_size).round() as u32,
            phase: MarketPhase::Trading,
            bids: Ladder::default(),
            asks: Ladder::default(),
            orders: BTreeMap::new(),
        }
    }

    /// Ladder level for an order, in YES-equivalent ticks.
    fn level_for(&self, side: OrderSide, price_ticks: u32) -> u32 {
        if side.is_yes_leg() {
            price_ticks
        } else {
            self.max_ticks - price_ticks
        }
    }
}

/// The simulated broker: accepts, cancels, and matches limit orders.
pub struct Broker {
    policy: MatchPolicy,
    books: BTreeMap<MarketId, MarketBook>,
    /// Order id -> market, for O(1) cancels.
    order_index: HashMap<u64, MarketId>,
    next_order_id: u64,
}

impl Broker {
    pub fn new(policy: MatchPolicy) -> Self {
        Self {
            policy,
            books: BTreeMap::new(),
            order_index: HashMap::new(),
            next_order_id: 1,
        }
    }

    /// Create a book for a market. Re-registration is a no-op.
    pub fn register_market(&mut self, market: &Market) {
        self.books
            .entry(market.id.clone())
            .or_insert_with(|| MarketBook::new(market.tick_size()));
    }

    pub fn market_phase(&self, market_id: &str) -> Option<MarketPhase> {
        self.books.get(market_id).map(|b| b.phase)
    }

    pub fn set_phase(&mut self, market_id: &str, phase: MarketPhase) {
        if let Some(book) = self.books.get_mut(market_id) {
            book.phase = phase;
        }
    }

    /// Validate and rest a new limit order. Returns its id.
    pub fn place(
        &mut self,
        market_id: &str,
        side: OrderSide,
        price: f64,
        quantity: f64,
        timestamp: Timestamp,
        portfolio: &Portfolio,
    ) -> Result<OrderId, EngineError> {
        let book = self
            .books
            .get_mut(market_id)
            .ok_or_else(|| EngineError::UnknownMarket {
                market_id: market_id.to_string(),
            })?;

        if book.phase != MarketPhase::Trading {
            return Err(EngineError::MarketNotTradable {
                market_id: market_id.to_string(),
                phase: book.phase,
            });
        }
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(EngineError::InvalidQuantity {
                market_id: market_id.to_string(),
                quantity,
            });
        }

        let price_ticks = validate_price(market_id, price, book.tick_size, book.max_ticks)?;

        if !self.policy.allow_short && !side.is_buy() {
            let held = portfolio
                .position(market_id)
                .map(|p| p.leg(side).quantity)
                .unwrap_or(0.0);
            if held <= QTY_EPS {
                return Err(EngineError::ShortDisallowed {
                    market_id: market_id.to_string(),
                    side,
                });
            }
        }

        let id = self.next_order_id;
        self.next_order_id += 1;

        let order = Order {
            id: OrderId(id),
            market_id: market_id.to_string(),
            side,
            price,
            remaining: quantity,
            created_at: timestamp,
            status: OrderStatus::Open,
        };

        let level = book.level_for(side, price_ticks);
        if side.is_bid() {
            book.bids.insert(level, id);
        } else {
            book.asks.insert(level, id);
        }
        book.orders.insert(id, order);
        self.order_index.insert(id, market_id.to_string());

        tracing::debug!(
            order_id = id,
            market = market_id,
            side = %side,
            price,
            quantity,
            "order resting"
        );
        Ok(OrderId(id))
    }

    /// Cancel a resting order. Terminal or unknown ids return
    /// `OrderNotActive`; repeating a cancel is harmless.
    pub fn cancel(&mut self, order_id: OrderId) -> Result<Order, EngineError> {
        let not_active = || EngineError::OrderNotActive { order_id };

        let market_id = self.order_index.remove(&order_id.0).ok_or_else(not_active)?;
        let book = self.books.get_mut(&market_id).ok_or_else(not_active)?;
        let mut order = book.orders.remove(&order_id.0).ok_or_else(not_active)?;

        let price_ticks = (order.price / book.tick_size).round() as u32;
        let level = book.level_for(order.side, price_ticks);
        if order.side.is_bid() {
            book.bids.remove(level, order_id.0);
        } else {
            book.asks.remove(level, order_id.0);
        }

        order.status = OrderStatus::Canceled;
        tracing::debug!(order_id = order_id.0, market = %market_id, "order canceled");
        Ok(order)
    }

    /// Cancel every open order, optionally restricted to one market.
    /// Returns the number of orders canceled. O(open orders).
    pub fn cancel_all(&mut self, market_id: Option<&str>) -> usize {
        let mut canceled = 0;
        for (mid, book) in self.books.iter_mut() {
            if market_id.is_some_and(|m| m != mid.as_str()) {
                continue;
            }
            canceled += book.orders.len();
            for id in book.orders.keys() {
                self.order_index.remove(id);
            }
            book.orders.clear();
            book.bids.clear();
            book.asks.clear();
        }
        if canceled > 0 {
            tracing::debug!(count = canceled, market = ?market_id, "canceled open orders");
        }
        canceled
    }

    /// Open orders in (market, acceptance) order.
    pub fn open_orders(&self, market_id: Option<&str>) -> Vec<&Order> {
        self.books
            .iter()
            .filter(|(mid, _)| market_id.map_or(true, |m| m == mid.as_str()))
            .flat_map(|(_, book)| book.orders.values())
            .collect()
    }

    pub fn open_order_count(&self) -> usize {
        self.books.values().map(|b| b.orders.len()).sum()
    }

    /// Match an incoming print against the opposite-side ladder.
    ///
    /// Walks price priority (FIFO within a level), capping each fill by
    /// the trade's remaining size, the strategy's closable inventory when
    /// shorts are off, and available cash for buys. Leftover trade size is
    /// discarded — the historical tape already consumed it.
    pub fn match_trade(
        &mut self,
        trade: &TradeEvent,
        slippage: &SlippageModel,
        portfolio: &Portfolio,
    ) -> Vec<Fill> {
        let policy = self.policy;
        let Broker {
            books, order_index, ..
        } = self;
        let Some(book) = books.get_mut(&trade.market_id) else {
            return Vec::new();
        };
        if book.orders.is_empty() {
            return Vec::new();
        }

        let use_bids = trade.taker_side == TakerSide::TakerBoughtNo;
        let tick_size = book.tick_size;
        let levels = if use_bids {
            book.bids.levels_desc()
        } else {
            book.asks.levels_asc()
        };

        let mut fills = Vec::new();
        let mut filled_out: Vec<(u32, u64)> = Vec::new();
        let mut trade_remaining = trade.size;
        let mut cash = portfolio.cash();
        let position = portfolio.position(&trade.market_id);
        let mut yes_held = position.map(|p| p.yes.quantity).unwrap_or(0.0);
        let mut no_held = position.map(|p| p.no.quantity).unwrap_or(0.0);

        'levels: for level in levels {
            let level_price = level as f64 * tick_size;
            let eligible = if use_bids {
                trade.yes_price <= level_price + PRICE_EPS
            } else {
                trade.yes_price >= level_price - PRICE_EPS
            };
            if !eligible {
                break;
            }

            let queue = if use_bids {
                book.bids.queue(level)
            } else {
                book.asks.queue(level)
            };
            for id in queue {
                if trade_remaining <= QTY_EPS {
                    break 'levels;
                }
                let Some(order) = book.orders.get_mut(&id) else {
                    continue;
                };

                let held = if order.side.is_yes_leg() {
                    &mut yes_held
                } else {
                    &mut no_held
                };
                let direction = if order.side.is_buy() { 1.0 } else { -1.0 };

                let mut qty = order.remaining.min(trade_remaining);
                if !policy.allow_short && direction < 0.0 {
                    // Split-or-reject at zero: sell only what the leg holds.
                    qty = qty.min((*held).max(0.0));
                }
                if qty <= QTY_EPS {
                    continue;
                }

                let exec_price = slippage.adjusted_price(order, qty, tick_size);

                if direction > 0.0 {
                    let affordable = cash / (exec_price * (1.0 + policy.commission_rate));
                    if qty > affordable {
                        qty = affordable;
                        if qty <= QTY_EPS {
                            continue;
                        }
                    }
                }

                let make_fill = |fill_qty: f64| Fill {
                    order_id: order.id,
                    market_id: order.market_id.clone(),
                    side: order.side,
                    price: exec_price,
                    quantity: fill_qty,
                    commission: exec_price * fill_qty * policy.commission_rate,
                    timestamp: trade.timestamp,
                };

                // Crossing zero with shorts enabled splits into a closing
                // fill and an opening fill at the same price.
                let crosses = *held * direction < 0.0 && qty > held.abs() + QTY_EPS;
                if crosses && policy.allow_short {
                    fills.push(make_fill(held.abs()));
                    fills.push(make_fill(qty - held.abs()));
                } else {
                    fills.push(make_fill(qty));
                }

                *held += direction * qty;
                let gross = exec_price * qty;
                let commission = gross * policy.commission_rate;
                if direction > 0.0 {
                    cash -= gross + commission;
                } else {
                    cash += gross - commission;
                }

                order.remaining -= qty;
                trade_remaining -= qty;
                if order.remaining <= QTY_EPS {
                    order.status = OrderStatus::Filled;
                    filled_out.push((level, id));
                }
            }
        }

        for (level, id) in filled_out {
            if use_bids {
                book.bids.remove(level, id);
            } else {
                book.asks.remove(level, id);
            }
            book.orders.remove(&id);
            order_index.remove(&id);
        }

        fills
    }
}

fn validate_price(
    market_id: &str,
    price: f64,
    tick_size: f64,
    max_ticks: u32,
) -> Result<u32, EngineError> {
    let invalid = || EngineError::InvalidPrice {
        market_id: market_id.to_string(),
        price,
        tick_size,
    };

    if !price.is_finite() || price <= 0.0 || price >= 1.0 {
        return Err(invalid());
    }
    let ticks = (price / tick_size).round();
    if (price - ticks * tick_size).abs() > PRICE_EPS {
        return Err(invalid());
    }
    let ticks = ticks as u32;
    if ticks == 0 || ticks >= max_ticks {
        return Err(invalid());
    }
    Ok(ticks)
}
