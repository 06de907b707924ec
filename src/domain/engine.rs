//! Trade lifecycle engine.
//!
//! The engine exclusively owns the session's trades and the single pending
//! scheduled order. Callers issue commands (`schedule`, `execute`, `close`)
//! and drive `tick` on a fixed cadence; they only ever get read access to
//! trade state.
//!
//! Every failure inside `tick` is absorbed: a missing price skips that piece
//! of work and it is retried on the next tick.

use chrono::DateTime;
use chrono_tz::Tz;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use super::error::SimError;
use super::instrument::{Instrument, InstrumentConfig};
use super::pnl::{self, Pnl};
use super::schedule::{PendingTradeRequest, ScheduleTime};
use super::summary::SessionSummary;
use super::trade::{Direction, ExitReason, OrderParams, Trade, TradeExit, TradeId};
use crate::ports::clock_port::Clock;
use crate::ports::price_port::PriceSource;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    /// Contracts per trade, fixed for the session.
    pub quantity: u32,
    /// Daily instant at which a pending request fires.
    pub schedule_time: ScheduleTime,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            quantity: 1,
            schedule_time: ScheduleTime::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloseOutcome {
    Closed { pnl: f64 },
    NotFound,
    NotActive,
    PriceUnavailable,
}

/// What one `tick` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub fired: Vec<TradeId>,
    pub closed: Vec<(TradeId, ExitReason)>,
    pub skipped: Vec<Instrument>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.fired.is_empty() && self.closed.is_empty() && self.skipped.is_empty()
    }
}

/// A trade paired with its current mark.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkedTrade<'a> {
    pub trade: &'a Trade,
    pub current_price: Option<f64>,
    pub pnl: Option<Pnl>,
}

pub struct TradeEngine<P, C> {
    prices: P,
    clock: C,
    instruments: InstrumentConfig,
    settings: EngineSettings,
    trades: Vec<Trade>,
    pending: Option<PendingTradeRequest>,
    rng: StdRng,
}

impl<P: PriceSource, C: Clock> TradeEngine<P, C> {
    pub fn new(prices: P, clock: C, instruments: InstrumentConfig, settings: EngineSettings) -> Self {
        TradeEngine {
            prices,
            clock,
            instruments,
            settings,
            trades: Vec::new(),
            pending: None,
            rng: StdRng::from_entropy(),
        }
    }

    /// Make trade id suffixes reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn prices(&self) -> &P {
        &self.prices
    }

    pub fn prices_mut(&mut self) -> &mut P {
        &mut self.prices
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn instruments(&self) -> &InstrumentConfig {
        &self.instruments
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// All trades in creation order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn trade(&self, id: &TradeId) -> Option<&Trade> {
        self.trades.iter().find(|t| &t.id == id)
    }

    pub fn pending(&self) -> Option<&PendingTradeRequest> {
        self.pending.as_ref()
    }

    /// Replace the pending request. An empty instrument set is a no-op.
    pub fn schedule(&mut self, instruments: &[Instrument], direction: Direction, params: OrderParams) {
        let Some(request) = PendingTradeRequest::new(instruments, direction, params) else {
            debug!("schedule ignored: empty instrument set");
            return;
        };
        if self.pending.is_some() {
            info!("replacing pending scheduled request");
        }
        info!(
            instruments = ?request.instruments,
            direction = %request.direction,
            at = %self.settings.schedule_time,
            "trade scheduled"
        );
        self.pending = Some(request);
    }

    /// Open a trade at the current price and time.
    pub fn execute(
        &mut self,
        instrument: Instrument,
        direction: Direction,
        params: OrderParams,
    ) -> Result<Trade, SimError> {
        let price = self.price_of(instrument)?;
        let now = self.clock.now();
        let id = self.next_trade_id(&now);
        let trade = Trade::open(
            id,
            instrument,
            direction,
            price,
            now,
            self.settings.quantity,
            params,
        );
        info!(
            trade_id = %trade.id,
            instrument = %instrument,
            direction = %direction,
            price,
            "trade opened"
        );
        self.trades.push(trade.clone());
        Ok(trade)
    }

    /// Open one trade per instrument. Either every instrument has a price
    /// and all trades open, or nothing changes.
    pub fn execute_many(
        &mut self,
        instruments: &[Instrument],
        direction: Direction,
        params: OrderParams,
    ) -> Result<Vec<Trade>, SimError> {
        for &instrument in instruments {
            self.price_of(instrument)?;
        }
        instruments
            .iter()
            .map(|&instrument| self.execute(instrument, direction, params.clone()))
            .collect()
    }

    /// Close an ACTIVE trade at the current price with reason `Manual`.
    /// Unknown ids and non-active trades are left untouched.
    pub fn close(&mut self, id: &TradeId) -> CloseOutcome {
        let Some(idx) = self.trades.iter().position(|t| &t.id == id) else {
            debug!(trade_id = %id, "close ignored: unknown trade");
            return CloseOutcome::NotFound;
        };
        if !self.trades[idx].is_active() {
            debug!(trade_id = %id, status = %self.trades[idx].status(), "close ignored: not active");
            return CloseOutcome::NotActive;
        }
        let Some(price) = self.prices.current_price(self.trades[idx].instrument) else {
            warn!(trade_id = %id, "close deferred: no price");
            return CloseOutcome::PriceUnavailable;
        };
        let now = self.clock.now();
        let pnl = self.close_at(idx, price, now, ExitReason::Manual);
        CloseOutcome::Closed { pnl }
    }

    /// One evaluation pass: fire the pending request when due, then close
    /// every active trade whose exit condition holds.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        let now = self.clock.now();

        self.fire_pending(&now, &mut report);

        let mut exits = Vec::new();
        for (idx, trade) in self.trades.iter().enumerate().filter(|(_, t)| t.is_active()) {
            let Some(price) = self.prices.current_price(trade.instrument) else {
                if !report.skipped.contains(&trade.instrument) {
                    report.skipped.push(trade.instrument);
                }
                continue;
            };
            if let Some(reason) = trade.exit_condition(price, &now) {
                exits.push((idx, price, reason));
            }
        }

        for (idx, price, reason) in exits {
            self.close_at(idx, price, now, reason);
            report.closed.push((self.trades[idx].id.clone(), reason));
        }

        if !report.skipped.is_empty() {
            warn!(instruments = ?report.skipped, "tick skipped instruments without a price");
        }
        report
    }

    /// Live P/L summed over ACTIVE trades. Trades without a price count as 0.
    pub fn unrealized_pnl(&self) -> f64 {
        self.trades
            .iter()
            .filter(|t| t.is_active())
            .filter_map(|t| {
                let spec = self.instruments.spec(t.instrument);
                pnl::mark(t, spec, self.prices.current_price(t.instrument))
            })
            .map(|p| p.currency)
            .sum()
    }

    /// Stored P/L summed over CLOSED trades.
    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().filter_map(Trade::realized_pnl).sum()
    }

    pub fn marked_trades(&self) -> Vec<MarkedTrade<'_>> {
        self.trades.iter().map(|t| self.mark_trade(t)).collect()
    }

    pub fn mark_trade<'a>(&self, trade: &'a Trade) -> MarkedTrade<'a> {
        let current_price = self.prices.current_price(trade.instrument);
        let spec = self.instruments.spec(trade.instrument);
        MarkedTrade {
            trade,
            current_price,
            pnl: pnl::mark(trade, spec, current_price),
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::compute(&self.trades, self.unrealized_pnl())
    }

    fn fire_pending(&mut self, now: &DateTime<Tz>, report: &mut TickReport) {
        let Some(request) = self.pending.as_ref() else {
            return;
        };
        if !self.settings.schedule_time.is_due(now) {
            return;
        }
        let missing: Vec<Instrument> = request
            .instruments
            .iter()
            .copied()
            .filter(|&i| self.prices.current_price(i).is_none())
            .collect();
        if !missing.is_empty() {
            warn!(instruments = ?missing, "scheduled request held: no price");
            report.skipped.extend(missing);
            return;
        }

        let Some(request) = self.pending.take() else {
            return;
        };
        info!(instruments = ?request.instruments, "firing scheduled request");
        for &instrument in &request.instruments {
            match self.execute(instrument, request.direction, request.params.clone()) {
                Ok(trade) => report.fired.push(trade.id),
                Err(e) => warn!(instrument = %instrument, error = %e, "scheduled trade failed"),
            }
        }
    }

    fn close_at(&mut self, idx: usize, price: f64, now: DateTime<Tz>, reason: ExitReason) -> f64 {
        let spec = self.instruments.spec(self.trades[idx].instrument);
        let pnl = pnl::trade_pnl_at(&self.trades[idx], spec, price);
        let trade = &mut self.trades[idx];
        trade.close(TradeExit {
            price,
            time: now,
            pnl: pnl.currency,
            pnl_points: pnl.points,
            reason,
        });
        info!(
            trade_id = %trade.id,
            instrument = %trade.instrument,
            price,
            pnl = pnl.currency,
            reason = %reason,
            "trade closed"
        );
        pnl.currency
    }

    fn price_of(&self, instrument: Instrument) -> Result<f64, SimError> {
        self.prices
            .current_price(instrument)
            .ok_or_else(|| SimError::PriceUnavailable {
                instrument: instrument.to_string(),
            })
    }

    fn next_trade_id(&mut self, now: &DateTime<Tz>) -> TradeId {
        let id = TradeId::generate(now.timestamp_millis(), &mut self.rng);
        let taken = |candidate: &TradeId| self.trades.iter().any(|t| &t.id == candidate);
        if !taken(&id) {
            return id;
        }
        let mut n = 1;
        loop {
            let candidate = id.with_suffix(n);
            if !taken(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}
