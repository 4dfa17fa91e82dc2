//! Strategy callback surface and the order-entry context.
//!
//! The engine drives a `Strategy` through lifecycle hooks, handing each
//! one a `StrategyContext` for order placement and read-only state. Every
//! hook has a no-op default so strategies implement only what they need.
//!
//! Orders placed inside a callback rest with the broker immediately but
//! cannot fill against the event being processed — they were not resting
//! when it arrived.

pub mod examples;

use crate::broker::Broker;
use crate::domain::{
    Fill, Market, MarketId, Order, OrderId, OrderSide, Resolution, Timestamp, TradeEvent,
};
use crate::error::EngineError;
use crate::portfolio::Portfolio;
use std::collections::BTreeMap;

/// User-defined trading logic, driven by the event loop.
pub trait Strategy {
    /// Short name used in logs and reports.
    fn name(&self) -> &str;

    /// Once, before the first event.
    fn initialize(&mut self, _ctx: &mut StrategyContext<'_>) {}

    /// At each market's open timestamp.
    fn on_market_open(&mut self, _ctx: &mut StrategyContext<'_>, _market: &Market) {}

    /// After broker matching and portfolio application, for every trade.
    fn on_trade(&mut self, _ctx: &mut StrategyContext<'_>, _trade: &TradeEvent) {}

    /// Immediately after each fill is applied, before `on_trade`.
    fn on_fill(&mut self, _ctx: &mut StrategyContext<'_>, _fill: &Fill) {}

    /// At the close timestamp, after open orders are auto-canceled.
    fn on_market_close(&mut self, _ctx: &mut StrategyContext<'_>, _market: &Market) {}

    /// After the resolution payout is applied.
    fn on_market_resolve(
        &mut self,
        _ctx: &mut StrategyContext<'_>,
        _market: &Market,
        _outcome: Resolution,
    ) {
    }

    /// Once, after the last event.
    fn finalize(&mut self, _ctx: &mut StrategyContext<'_>) {}
}

/// Order placement and read-only views, scoped to one callback.
pub struct StrategyContext<'a> {
    broker: &'a mut Broker,
    portfolio: &'a Portfolio,
    markets: &'a BTreeMap<MarketId, Market>,
    timestamp: Timestamp,
}

impl<'a> StrategyContext<'a> {
    pub(crate) fn new(
        broker: &'a mut Broker,
        portfolio: &'a Portfolio,
        markets: &'a BTreeMap<MarketId, Market>,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            broker,
            portfolio,
            markets,
            timestamp,
        }
    }

    /// Timestamp of the event currently being processed.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn portfolio(&self) -> &Portfolio {
        self.portfolio
    }

    pub fn market(&self, market_id: &str) -> Option<&Market> {
        self.markets.get(market_id)
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.markets.values()
    }

    /// Open orders, optionally restricted to one market.
    pub fn open_orders(&self, market_id: Option<&str>) -> Vec<&Order> {
        self.broker.open_orders(market_id)
    }

    pub fn buy_yes(
        &mut self,
        market_id: &str,
        price: f64,
        quantity: f64,
    ) -> Result<OrderId, EngineError> {
        self.submit(market_id, OrderSide::BuyYes, price, quantity)
    }

    pub fn sell_yes(
        &mut self,
        market_id: &str,
        price: f64,
        quantity: f64,
    ) -> Result<OrderId, EngineError> {
        self.submit(market_id, OrderSide::SellYes, price, quantity)
    }

    pub fn buy_no(
        &mut self,
        market_id: &str,
        price: f64,
        quantity: f64,
    ) -> Result<OrderId, EngineError> {
        self.submit(market_id, OrderSide::BuyNo, price, quantity)
    }

    pub fn sell_no(
        &mut self,
        market_id: &str,
        price: f64,
        quantity: f64,
    ) -> Result<OrderId, EngineError> {
        self.submit(market_id, OrderSide::SellNo, price, quantity)
    }

    fn submit(
        &mut self,
        market_id: &str,
        side: OrderSide,
        price: f64,
        quantity: f64,
    ) -> Result<OrderId, EngineError> {
        self.broker
            .place(market_id, side, price, quantity, self.timestamp, self.portfolio)
    }

    /// Cancel a resting order, returning its final state.
    pub fn cancel_order(&mut self, order_id: OrderId) -> Result<Order, EngineError> {
        self.broker.cancel(order_id)
    }

    /// Cancel all open orders, optionally scoped to one market. Returns
    /// the number canceled.
    pub fn cancel_all(&mut self, market_id: Option<&str>) -> usize {
        self.broker.cancel_all(market_id)
    }
}
