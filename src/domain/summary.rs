//! Session P/L summary and closed-trade statistics.

use super::instrument::Instrument;
use super::trade::{Trade, TradeStatus};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionSummary {
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_pnl: f64,
    pub active: usize,
    pub closed: usize,
    pub pending: usize,
    pub won: usize,
    pub lost: usize,
    /// Whole percent of closed trades with positive P/L.
    pub win_rate_pct: u32,
    pub stats: TradeStats,
}

impl SessionSummary {
    pub fn compute(trades: &[Trade], unrealized_pnl: f64) -> Self {
        let count = |status: TradeStatus| trades.iter().filter(|t| t.status() == status).count();
        let closed_pnls: Vec<f64> = trades.iter().filter_map(Trade::realized_pnl).collect();

        let won = closed_pnls.iter().filter(|&&p| p > 0.0).count();
        let lost = closed_pnls.iter().filter(|&&p| p < 0.0).count();
        let closed = closed_pnls.len();
        let win_rate_pct = if closed > 0 {
            ((won as f64 / closed as f64) * 100.0).round() as u32
        } else {
            0
        };
        let realized_pnl: f64 = closed_pnls.iter().sum();

        SessionSummary {
            realized_pnl,
            unrealized_pnl,
            total_pnl: realized_pnl + unrealized_pnl,
            active: count(TradeStatus::Active),
            closed,
            pending: count(TradeStatus::Pending),
            won,
            lost,
            win_rate_pct,
            stats: TradeStats::compute(&closed_pnls),
        }
    }
}

/// Statistics over realized P/L, in trade creation order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TradeStats {
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    /// Largest peak-to-trough fall of cumulative realized P/L, in currency.
    pub max_drawdown: f64,
    /// Mean over stddev of per-trade P/L; 0 with fewer than two trades.
    pub sharpe_ratio: f64,
}

impl TradeStats {
    pub fn compute(pnls: &[f64]) -> Self {
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut wins = 0usize;
        let mut losses = 0usize;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        for &pnl in pnls {
            if pnl > 0.0 {
                wins += 1;
                total_wins += pnl;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                losses += 1;
                total_losses += pnl.abs();
                largest_loss = largest_loss.max(pnl.abs());
            }
        }

        let profit_factor = if total_losses > 0.0 {
            total_wins / total_losses
        } else if total_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        TradeStats {
            avg_win: if wins > 0 { total_wins / wins as f64 } else { 0.0 },
            avg_loss: if losses > 0 {
                total_losses / losses as f64
            } else {
                0.0
            },
            largest_win,
            largest_loss,
            profit_factor,
            max_drawdown: compute_drawdown(pnls),
            sharpe_ratio: compute_sharpe(pnls),
        }
    }
}

fn compute_drawdown(pnls: &[f64]) -> f64 {
    let mut equity = 0.0_f64;
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;
    for pnl in pnls {
        equity += pnl;
        peak = peak.max(equity);
        max_dd = max_dd.max(peak - equity);
    }
    max_dd
}

fn compute_sharpe(pnls: &[f64]) -> f64 {
    if pnls.len() < 2 {
        return 0.0;
    }
    let n = pnls.len() as f64;
    let mean = pnls.iter().sum::<f64>() / n;
    let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();
    if stddev > 0.0 { mean / stddev } else { 0.0 }
}

/// Closed-trade results for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentResult {
    pub instrument: Instrument,
    pub total_trades: usize,
    pub won: usize,
    pub total_pnl: f64,
}

impl InstrumentResult {
    pub fn win_rate(&self) -> f64 {
        if self.total_trades > 0 {
            self.won as f64 / self.total_trades as f64
        } else {
            0.0
        }
    }

    /// One entry per instrument with at least one closed trade, in
    /// instrument order.
    pub fn compute_per_instrument(trades: &[Trade]) -> Vec<InstrumentResult> {
        Instrument::ALL
            .iter()
            .filter_map(|&instrument| {
                let pnls: Vec<f64> = trades
                    .iter()
                    .filter(|t| t.instrument == instrument)
                    .filter_map(Trade::realized_pnl)
                    .collect();
                if pnls.is_empty() {
                    return None;
                }
                Some(InstrumentResult {
                    instrument,
                    total_trades: pnls.len(),
                    won: pnls.iter().filter(|&&p| p > 0.0).count(),
                    total_pnl: pnls.iter().sum(),
                })
            })
            .collect()
    }
}
