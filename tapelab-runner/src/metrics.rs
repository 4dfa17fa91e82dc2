//! Performance metrics — pure functions over snapshots and fills.
//!
//! Every metric is a pure function: equity curve and/or fill list in,
//! scalar out. Annualization uses tape wall-clock time from snapshot
//! timestamps, not a fixed trading calendar — prediction markets trade
//! around the clock.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tapelab_core::domain::{Fill, MarketId, Snapshot};

const MS_PER_YEAR: f64 = 365.25 * 86_400.0 * 1_000.0;
const MS_PER_DAY: f64 = 86_400.0 * 1_000.0;

/// Aggregate performance statistics for a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub final_equity: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_duration_days: f64,
    pub num_fills: usize,
    pub total_commission: f64,
    pub num_market_trades: usize,
    pub win_rate: f64,
    pub avg_trade_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub total_realized_pnl: f64,
}

impl PerformanceMetrics {
    /// Compute all metrics.
    ///
    /// `market_pnls` is the portfolio-tracked realized P&L per market
    /// (resolution payouts included); only markets that actually filled
    /// count as trades.
    pub fn compute(
        snapshots: &[Snapshot],
        fills: &[Fill],
        market_pnls: &BTreeMap<MarketId, f64>,
        initial_cash: f64,
    ) -> Self {
        if snapshots.is_empty() {
            return Self::empty();
        }

        let equities: Vec<f64> = snapshots.iter().map(|s| s.equity).collect();
        let final_equity = *equities.last().unwrap();
        let total_return = if initial_cash != 0.0 {
            (final_equity - initial_cash) / initial_cash
        } else {
            0.0
        };

        let span_ms = (snapshots.last().unwrap().timestamp
            - snapshots[0].timestamp) as f64;
        let years = span_ms / MS_PER_YEAR;

        let annualized_return = if years < 1e-9 {
            0.0
        } else if total_return <= -1.0 {
            -1.0
        } else {
            (1.0 + total_return).powf(1.0 / years) - 1.0
        };

        let (sharpe_ratio, sortino_ratio) = ratios(&equities, years);
        let (max_drawdown, max_drawdown_duration_days) = drawdown(snapshots, &equities);

        let traded: Vec<f64> = {
            let mut markets: Vec<&MarketId> = fills.iter().map(|f| &f.market_id).collect();
            markets.sort();
            markets.dedup();
            markets
                .into_iter()
                .filter_map(|mid| market_pnls.get(mid).copied())
                .collect()
        };

        let wins: Vec<f64> = traded.iter().copied().filter(|&p| p > 0.0).collect();
        let losses: Vec<f64> = traded.iter().copied().filter(|&p| p < 0.0).collect();
        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();

        Self {
            total_return,
            final_equity,
            annualized_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration_days,
            num_fills: fills.len(),
            total_commission: fills.iter().map(|f| f.commission).sum(),
            num_market_trades: traded.len(),
            win_rate: if traded.is_empty() {
                0.0
            } else {
                wins.len() as f64 / traded.len() as f64
            },
            avg_trade_pnl: mean(&traded),
            avg_win: mean(&wins),
            avg_loss: mean(&losses),
            profit_factor: if gross_loss > 0.0 {
                gross_profit / gross_loss
            } else if gross_profit > 0.0 {
                f64::INFINITY
            } else {
                0.0
            },
            total_realized_pnl: traded.iter().sum(),
        }
    }

    fn empty() -> Self {
        Self {
            total_return: 0.0,
            final_equity: 0.0,
            annualized_return: 0.0,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            max_drawdown: 0.0,
            max_drawdown_duration_days: 0.0,
            num_fills: 0,
            total_commission: 0.0,
            num_market_trades: 0,
            win_rate: 0.0,
            avg_trade_pnl: 0.0,
            avg_win: 0.0,
            avg_loss: 0.0,
            profit_factor: 0.0,
            total_realized_pnl: 0.0,
        }
    }
}

/// Annualized Sharpe and Sortino from snapshot-to-snapshot returns.
fn ratios(equities: &[f64], years: f64) -> (f64, f64) {
    if equities.len() < 2 {
        return (0.0, 0.0);
    }
    let returns: Vec<f64> = equities
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let avg = mean(&returns);
    let std = std_dev(&returns);
    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std = std_dev(&downside);

    let snapshots_per_year = equities.len() as f64 / years.max(1e-9);
    let sqrt_factor = snapshots_per_year.max(0.0).sqrt();

    let sharpe = if std > 0.0 { avg / std * sqrt_factor } else { 0.0 };
    let sortino = if downside_std > 0.0 {
        avg / downside_std * sqrt_factor
    } else {
        0.0
    };
    (sharpe, sortino)
}

/// Max peak-to-trough drawdown as a positive fraction, plus its duration.
pub fn drawdown(snapshots: &[Snapshot], equities: &[f64]) -> (f64, f64) {
    let mut peak = equities[0];
    let mut peak_ts = snapshots[0].timestamp;
    let mut max_dd = 0.0f64;
    let mut max_duration_ms = 0.0f64;

    for (snap, &eq) in snapshots.iter().zip(equities) {
        if eq > peak {
            peak = eq;
            peak_ts = snap.timestamp;
        }
        let dd = if peak > 0.0 { (peak - eq) / peak } else { 0.0 };
        if dd > max_dd {
            max_dd = dd;
            max_duration_ms = (snap.timestamp - peak_ts) as f64;
        }
    }
    (max_dd, max_duration_ms / MS_PER_DAY)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap as Map;
    use tapelab_core::domain::{OrderId, OrderSide};

    fn snap(ts: i64, equity: f64) -> Snapshot {
        Snapshot {
            timestamp: ts,
            cash: equity,
            equity,
            realized_pnl: 0.0,
            unrealized_pnl: 0.0,
            open_positions: 0,
            positions: Map::new(),
        }
    }

    fn fill(market: &str, commission: f64) -> Fill {
        Fill {
            order_id: OrderId(1),
            market_id: market.into(),
            side: OrderSide::BuyYes,
            price: 0.5,
            quantity: 1.0,
            commission,
            timestamp: 0,
        }
    }

    #[test]
    fn empty_inputs_give_zero_metrics() {
        let metrics = PerformanceMetrics::compute(&[], &[], &Map::new(), 1000.0);
        assert_eq!(metrics.final_equity, 0.0);
        assert_eq!(metrics.num_fills, 0);
        assert_eq!(metrics.win_rate, 0.0);
    }

    #[test]
    fn total_return_from_equity_curve() {
        let day = 86_400_000i64;
        let snapshots = vec![snap(0, 1000.0), snap(day, 1100.0)];
        let metrics = PerformanceMetrics::compute(&snapshots, &[], &Map::new(), 1000.0);
        assert!((metrics.total_return - 0.10).abs() < 1e-12);
        assert!((metrics.final_equity - 1100.0).abs() < 1e-12);
        // A 10% day annualizes to something enormous but finite.
        assert!(metrics.annualized_return > 1.0);
        assert!(metrics.annualized_return.is_finite());
    }

    #[test]
    fn drawdown_depth_and_duration() {
        let day = 86_400_000i64;
        let snapshots = vec![
            snap(0, 1000.0),
            snap(day, 1200.0),
            snap(2 * day, 900.0),
            snap(3 * day, 1250.0),
        ];
        let equities: Vec<f64> = snapshots.iter().map(|s| s.equity).collect();
        let (dd, duration) = drawdown(&snapshots, &equities);
        assert!((dd - 0.25).abs() < 1e-12);
        assert!((duration - 1.0).abs() < 1e-9);
    }

    #[test]
    fn win_rate_and_profit_factor_over_markets() {
        let snapshots = vec![snap(0, 1000.0), snap(86_400_000, 1010.0)];
        let fills = vec![fill("A", 0.1), fill("B", 0.2), fill("A", 0.1)];
        let mut pnls = Map::new();
        pnls.insert("A".to_string(), 8.0);
        pnls.insert("B".to_string(), -4.0);
        pnls.insert("UNTRADED".to_string(), 99.0);

        let metrics = PerformanceMetrics::compute(&snapshots, &fills, &pnls, 1000.0);
        assert_eq!(metrics.num_market_trades, 2);
        assert!((metrics.win_rate - 0.5).abs() < 1e-12);
        assert!((metrics.avg_win - 8.0).abs() < 1e-12);
        assert!((metrics.avg_loss - (-4.0)).abs() < 1e-12);
        assert!((metrics.profit_factor - 2.0).abs() < 1e-12);
        assert!((metrics.total_realized_pnl - 4.0).abs() < 1e-12);
        assert_eq!(metrics.num_fills, 3);
        assert!((metrics.total_commission - 0.4).abs() < 1e-12);
    }

    #[test]
    fn all_wins_gives_infinite_profit_factor() {
        let snapshots = vec![snap(0, 1000.0), snap(86_400_000, 1010.0)];
        let fills = vec![fill("A", 0.0)];
        let mut pnls = Map::new();
        pnls.insert("A".to_string(), 5.0);
        let metrics = PerformanceMetrics::compute(&snapshots, &fills, &pnls, 1000.0);
        assert!(metrics.profit_factor.is_infinite());
    }

    #[test]
    fn flat_equity_has_zero_ratios() {
        let snapshots = vec![snap(0, 1000.0), snap(1000, 1000.0), snap(2000, 1000.0)];
        let metrics = PerformanceMetrics::compute(&snapshots, &[], &Map::new(), 1000.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
    }
}
