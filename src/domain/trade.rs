//! Simulated trades and their lifecycle.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono_tz::Tz;
use rand::Rng;

use super::error::SimError;
use super::instrument::Instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("LONG"),
            Direction::Short => f.write_str("SHORT"),
        }
    }
}

impl FromStr for Direction {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LONG" | "BUY" => Ok(Direction::Long),
            "SHORT" | "SELL" => Ok(Direction::Short),
            other => Err(SimError::ConfigInvalid {
                section: "trade".into(),
                key: "direction".into(),
                reason: format!("expected LONG or SHORT, got {other:?}"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeStatus {
    Pending,
    Active,
    Closed,
}

impl TradeStatus {
    /// Status only moves forward: PENDING -> ACTIVE -> CLOSED. A trade that
    /// never filled has no exit to record, so PENDING cannot close directly.
    pub fn can_advance_to(self, next: TradeStatus) -> bool {
        matches!(
            (self, next),
            (TradeStatus::Pending, TradeStatus::Active) | (TradeStatus::Active, TradeStatus::Closed)
        )
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Pending => f.write_str("PENDING"),
            TradeStatus::Active => f.write_str("ACTIVE"),
            TradeStatus::Closed => f.write_str("CLOSED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TradeId(String);

impl TradeId {
    /// `trade-<unix millis>-<0..1000>`.
    pub fn generate<R: Rng + ?Sized>(unix_millis: i64, rng: &mut R) -> Self {
        TradeId(format!("trade-{}-{}", unix_millis, rng.gen_range(0..1000)))
    }

    /// Disambiguate a colliding id: `trade-...-42` -> `trade-...-42-1`.
    pub fn with_suffix(&self, n: u32) -> Self {
        TradeId(format!("{}-{}", self.0, n))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TradeId {
    fn from(s: &str) -> Self {
        TradeId(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    TimeTarget,
    StopLoss,
    TakeProfit,
    Manual,
}

impl ExitReason {
    pub fn label(&self) -> &'static str {
        match self {
            ExitReason::TimeTarget => "Time target reached",
            ExitReason::StopLoss => "Stop loss triggered",
            ExitReason::TakeProfit => "Take profit reached",
            ExitReason::Manual => "Manual exit",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Exit record, filled exactly once when a trade closes.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeExit {
    pub price: f64,
    pub time: DateTime<Tz>,
    pub pnl: f64,
    pub pnl_points: f64,
    pub reason: ExitReason,
}

/// Entry parameters shared by immediate and scheduled orders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderParams {
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub target_exit_time: Option<DateTime<Tz>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub id: TradeId,
    pub instrument: Instrument,
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Tz>,
    pub quantity: u32,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub target_exit_time: Option<DateTime<Tz>>,
    status: TradeStatus,
    exit: Option<TradeExit>,
}

impl Trade {
    pub fn open(
        id: TradeId,
        instrument: Instrument,
        direction: Direction,
        entry_price: f64,
        entry_time: DateTime<Tz>,
        quantity: u32,
        params: OrderParams,
    ) -> Self {
        Trade {
            id,
            instrument,
            direction,
            entry_price,
            entry_time,
            quantity: quantity.max(1),
            stop_loss: params.stop_loss,
            take_profit: params.take_profit,
            target_exit_time: params.target_exit_time,
            status: TradeStatus::Active,
            exit: None,
        }
    }

    pub fn status(&self) -> TradeStatus {
        self.status
    }

    pub fn exit(&self) -> Option<&TradeExit> {
        self.exit.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.status == TradeStatus::Active
    }

    pub fn is_closed(&self) -> bool {
        self.status == TradeStatus::Closed
    }

    /// Realized P/L; `None` until closed.
    pub fn realized_pnl(&self) -> Option<f64> {
        self.exit.as_ref().map(|e| e.pnl)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        match (self.stop_loss, self.direction) {
            (Some(sl), Direction::Long) => price <= sl,
            (Some(sl), Direction::Short) => price >= sl,
            (None, _) => false,
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        match (self.take_profit, self.direction) {
            (Some(tp), Direction::Long) => price >= tp,
            (Some(tp), Direction::Short) => price <= tp,
            (None, _) => false,
        }
    }

    pub fn time_target_reached(&self, now: &DateTime<Tz>) -> bool {
        self.target_exit_time.is_some_and(|target| *now >= target)
    }

    /// First matching automatic exit condition, in priority order
    /// time target, stop loss, take profit.
    pub fn exit_condition(&self, price: f64, now: &DateTime<Tz>) -> Option<ExitReason> {
        if !self.is_active() {
            return None;
        }
        if self.time_target_reached(now) {
            Some(ExitReason::TimeTarget)
        } else if self.should_stop_loss(price) {
            Some(ExitReason::StopLoss)
        } else if self.should_take_profit(price) {
            Some(ExitReason::TakeProfit)
        } else {
            None
        }
    }

    /// Record the exit and flip to CLOSED. Returns false (and changes nothing)
    /// when the status may not advance to CLOSED.
    pub(crate) fn close(&mut self, exit: TradeExit) -> bool {
        if !self.status.can_advance_to(TradeStatus::Closed) {
            return false;
        }
        self.status = TradeStatus::Closed;
        self.exit = Some(exit);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(2024, 3, 14, h, m, s).unwrap()
    }

    fn sample_long() -> Trade {
        Trade::open(
            TradeId::from("trade-1-1"),
            Instrument::NQ,
            Direction::Long,
            18_500.0,
            at(12, 0, 0),
            1,
            OrderParams {
                stop_loss: Some(18_470.0),
                take_profit: Some(18_560.0),
                target_exit_time: None,
            },
        )
    }

    fn sample_short() -> Trade {
        Trade::open(
            TradeId::from("trade-1-2"),
            Instrument::ES,
            Direction::Short,
            5_200.0,
            at(12, 0, 0),
            1,
            OrderParams {
                stop_loss: Some(5_210.0),
                take_profit: Some(5_180.0),
                target_exit_time: Some(at(13, 30, 0)),
            },
        )
    }

    fn exit_at(price: f64, reason: ExitReason) -> TradeExit {
        TradeExit {
            price,
            time: at(12, 30, 0),
            pnl: 0.0,
            pnl_points: 0.0,
            reason,
        }
    }

    #[test]
    fn direction_parses_and_displays() {
        assert_eq!("long".parse::<Direction>().unwrap(), Direction::Long);
        assert_eq!("SHORT".parse::<Direction>().unwrap(), Direction::Short);
        assert!("flat".parse::<Direction>().is_err());
        assert_eq!(Direction::Short.to_string(), "SHORT");
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
    }

    #[test]
    fn status_only_moves_forward() {
        assert!(TradeStatus::Pending.can_advance_to(TradeStatus::Active));
        assert!(TradeStatus::Active.can_advance_to(TradeStatus::Closed));
        assert!(!TradeStatus::Closed.can_advance_to(TradeStatus::Active));
        assert!(!TradeStatus::Active.can_advance_to(TradeStatus::Pending));
        assert!(!TradeStatus::Closed.can_advance_to(TradeStatus::Closed));
        assert!(!TradeStatus::Pending.can_advance_to(TradeStatus::Closed));
    }

    #[test]
    fn generated_id_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let id = TradeId::generate(1_710_432_000_000, &mut rng);
        let parts: Vec<&str> = id.as_str().split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "trade");
        assert_eq!(parts[1], "1710432000000");
        assert!(parts[2].parse::<u32>().unwrap() < 1000);
        assert_eq!(id.with_suffix(2).as_str(), format!("{}-2", id));
    }

    #[test]
    fn open_trade_is_active_without_exit() {
        let trade = sample_long();
        assert_eq!(trade.status(), TradeStatus::Active);
        assert!(trade.exit().is_none());
        assert!(trade.realized_pnl().is_none());
    }

    #[test]
    fn quantity_is_at_least_one() {
        let trade = Trade::open(
            TradeId::from("t"),
            Instrument::NQ,
            Direction::Long,
            1.0,
            at(9, 30, 0),
            0,
            OrderParams::default(),
        );
        assert_eq!(trade.quantity, 1);
    }

    #[test]
    fn stop_loss_long_triggered() {
        let trade = sample_long();
        assert!(trade.should_stop_loss(18_469.0));
        assert!(trade.should_stop_loss(18_470.0));
        assert!(!trade.should_stop_loss(18_471.0));
    }

    #[test]
    fn stop_loss_short_triggered() {
        let trade = sample_short();
        assert!(trade.should_stop_loss(5_211.0));
        assert!(trade.should_stop_loss(5_210.0));
        assert!(!trade.should_stop_loss(5_209.0));
    }

    #[test]
    fn take_profit_long_and_short() {
        let long = sample_long();
        assert!(long.should_take_profit(18_560.0));
        assert!(!long.should_take_profit(18_559.75));
        let short = sample_short();
        assert!(short.should_take_profit(5_180.0));
        assert!(!short.should_take_profit(5_180.25));
    }

    #[test]
    fn levels_absent_never_trigger() {
        let mut trade = sample_long();
        trade.stop_loss = None;
        trade.take_profit = None;
        assert!(!trade.should_stop_loss(0.0));
        assert!(!trade.should_take_profit(1_000_000.0));
        assert_eq!(trade.exit_condition(0.0, &at(15, 0, 0)), None);
    }

    #[test]
    fn time_target_wins_over_price_levels() {
        let trade = sample_short();
        // Price is beyond the stop as well, but time is checked first.
        assert_eq!(
            trade.exit_condition(5_250.0, &at(13, 30, 0)),
            Some(ExitReason::TimeTarget)
        );
        assert_eq!(
            trade.exit_condition(5_250.0, &at(13, 29, 59)),
            Some(ExitReason::StopLoss)
        );
    }

    #[test]
    fn stop_loss_wins_over_take_profit() {
        let mut trade = sample_long();
        // Crossed levels: both match, stop loss has priority.
        trade.take_profit = Some(18_400.0);
        assert_eq!(
            trade.exit_condition(18_450.0, &at(12, 1, 0)),
            Some(ExitReason::StopLoss)
        );
    }

    #[test]
    fn no_condition_inside_levels() {
        let trade = sample_long();
        assert_eq!(trade.exit_condition(18_500.0, &at(12, 1, 0)), None);
    }

    #[test]
    fn close_fills_exit_and_flips_status() {
        let mut trade = sample_long();
        assert!(trade.close(exit_at(18_530.0, ExitReason::Manual)));
        assert!(trade.is_closed());
        assert_eq!(trade.exit().unwrap().price, 18_530.0);
        assert_eq!(trade.exit_condition(0.0, &at(15, 0, 0)), None);
    }

    #[test]
    fn close_twice_keeps_first_exit() {
        let mut trade = sample_long();
        assert!(trade.close(exit_at(18_530.0, ExitReason::Manual)));
        assert!(!trade.close(exit_at(18_000.0, ExitReason::StopLoss)));
        assert_eq!(trade.exit().unwrap().price, 18_530.0);
        assert_eq!(trade.exit().unwrap().reason, ExitReason::Manual);
    }

    #[test]
    fn close_pending_is_noop() {
        let mut trade = sample_long();
        trade.status = TradeStatus::Pending;
        assert!(!trade.close(exit_at(18_530.0, ExitReason::Manual)));
        assert_eq!(trade.status(), TradeStatus::Pending);
        assert!(trade.exit().is_none());
    }

    #[test]
    fn exit_reason_labels() {
        assert_eq!(ExitReason::StopLoss.to_string(), "Stop loss triggered");
        assert_eq!(ExitReason::TimeTarget.label(), "Time target reached");
        assert_eq!(ExitReason::TakeProfit.label(), "Take profit reached");
        assert_eq!(ExitReason::Manual.label(), "Manual exit");
    }
}
