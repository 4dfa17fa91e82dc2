//! Example strategies exercising the callback surface.

pub mod buy_low;

pub use buy_low::BuyLow;
