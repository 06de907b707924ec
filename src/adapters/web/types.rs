//! JSON request and response bodies for the HTTP API.

use serde::{Deserialize, Serialize};

use crate::domain::engine::MarkedTrade;
use crate::domain::format;
use crate::domain::instrument::InstrumentSpec;
use crate::domain::market::Quote;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::schedule::PendingTradeRequest;
use crate::domain::summary::SessionSummary;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body of `POST /api/trades` and `POST /api/schedule`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OrderRequest {
    #[serde(default)]
    pub instruments: Vec<String>,
    pub direction: String,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub take_profit: Option<f64>,
    /// `HH:MM`, today in the server's timezone.
    #[serde(default)]
    pub exit_time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceResponse {
    pub instrument: String,
    pub price: f64,
    pub previous: f64,
    pub change: f64,
    pub up: bool,
    pub formatted: String,
}

impl PriceResponse {
    pub fn new(quote: &Quote, spec: &InstrumentSpec) -> Self {
        Self {
            instrument: quote.instrument.to_string(),
            price: quote.price,
            previous: quote.previous,
            change: quote.price - quote.previous,
            up: quote.is_up(),
            formatted: format::format_price(spec, quote.price),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricesResponse {
    pub connected: bool,
    pub last_update: Option<String>,
    pub prices: Vec<PriceResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeResponse {
    pub id: String,
    pub instrument: String,
    pub direction: String,
    pub status: String,
    pub quantity: u32,
    pub entry_price: f64,
    pub entry_time: String,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub target_exit_time: Option<String>,
    pub current_price: Option<f64>,
    pub pnl: Option<f64>,
    pub pnl_points: Option<f64>,
    pub pnl_formatted: Option<String>,
    pub exit_price: Option<f64>,
    pub exit_time: Option<String>,
    pub exit_reason: Option<String>,
}

impl TradeResponse {
    pub fn new(marked: &MarkedTrade<'_>) -> Self {
        let trade = marked.trade;
        let exit = trade.exit();
        Self {
            id: trade.id.to_string(),
            instrument: trade.instrument.to_string(),
            direction: trade.direction.to_string(),
            status: trade.status().to_string(),
            quantity: trade.quantity,
            entry_price: trade.entry_price,
            entry_time: trade.entry_time.to_rfc3339(),
            stop_loss: trade.stop_loss,
            take_profit: trade.take_profit,
            target_exit_time: trade.target_exit_time.map(|t| t.to_rfc3339()),
            current_price: marked.current_price,
            pnl: marked.pnl.map(|p| p.currency),
            pnl_points: marked.pnl.map(|p| p.points),
            pnl_formatted: marked.pnl.map(|p| format::format_currency(p.currency)),
            exit_price: exit.map(|e| e.price),
            exit_time: exit.map(|e| e.time.to_rfc3339()),
            exit_reason: exit.map(|e| e.reason.label().to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub total_pnl: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub active: usize,
    pub closed: usize,
    pub pending: usize,
    pub won: usize,
    pub lost: usize,
    pub win_rate_pct: u32,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// `None` when there are wins but no losses.
    pub profit_factor: Option<f64>,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
}

impl From<&SessionSummary> for SummaryResponse {
    fn from(s: &SessionSummary) -> Self {
        Self {
            total_pnl: s.total_pnl,
            realized_pnl: s.realized_pnl,
            unrealized_pnl: s.unrealized_pnl,
            active: s.active,
            closed: s.closed,
            pending: s.pending,
            won: s.won,
            lost: s.lost,
            win_rate_pct: s.win_rate_pct,
            avg_win: s.stats.avg_win,
            avg_loss: s.stats.avg_loss,
            largest_win: s.stats.largest_win,
            largest_loss: s.stats.largest_loss,
            profit_factor: Some(s.stats.profit_factor).filter(|v| v.is_finite()),
            max_drawdown: s.stats.max_drawdown,
            sharpe_ratio: s.stats.sharpe_ratio,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingResponse {
    pub instruments: Vec<String>,
    pub direction: String,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub target_exit_time: Option<String>,
    pub fires_at: String,
}

impl PendingResponse {
    pub fn new(request: &PendingTradeRequest, fires_at: String) -> Self {
        Self {
            instruments: request.instruments.iter().map(|i| i.to_string()).collect(),
            direction: request.direction.to_string(),
            stop_loss: request.params.stop_loss,
            take_profit: request.params.take_profit,
            target_exit_time: request.params.target_exit_time.map(|t| t.to_rfc3339()),
            fires_at,
        }
    }
}

/// Full snapshot served by `GET /api/state`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateResponse {
    pub clock: String,
    pub timezone: String,
    pub prices: PricesResponse,
    pub summary: SummaryResponse,
    pub trades: Vec<TradeResponse>,
    pub pending: Option<PendingResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloseResponse {
    pub id: String,
    pub pnl: f64,
    pub pnl_formatted: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub instruments: Vec<String>,
    pub direction: String,
    pub fires_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelsResponse {
    pub instrument: String,
    pub direction: String,
    pub price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelsQuery {
    pub direction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarResponse {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl From<&OhlcvBar> for BarResponse {
    fn from(bar: &OhlcvBar) -> Self {
        Self {
            date: bar.date.format("%Y-%m-%d").to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}
