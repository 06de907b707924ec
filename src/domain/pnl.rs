//! Profit-and-loss computation.
//!
//! Values are never rounded here; rounding happens only when formatting.

use super::instrument::InstrumentSpec;
use super::trade::{Direction, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Pnl {
    pub currency: f64,
    pub points: f64,
}

/// points = (price - entry) * sign; currency = points * point_value * quantity.
pub fn calculate_pnl(
    direction: Direction,
    entry_price: f64,
    price: f64,
    point_value: f64,
    quantity: u32,
) -> Pnl {
    let points = (price - entry_price) * direction.sign();
    Pnl {
        currency: points * point_value * quantity as f64,
        points,
    }
}

/// P/L of `trade` if it were exited at `price`.
pub fn trade_pnl_at(trade: &Trade, spec: &InstrumentSpec, price: f64) -> Pnl {
    calculate_pnl(
        trade.direction,
        trade.entry_price,
        price,
        spec.point_value,
        trade.quantity,
    )
}

/// Stored P/L for closed trades, live P/L for open ones. `None` when the
/// trade is open and no price is available.
pub fn mark(trade: &Trade, spec: &InstrumentSpec, current_price: Option<f64>) -> Option<Pnl> {
    match trade.exit() {
        Some(exit) => Some(Pnl {
            currency: exit.pnl,
            points: exit.pnl_points,
        }),
        None => current_price.map(|p| trade_pnl_at(trade, spec, p)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;
    use crate::domain::trade::{OrderParams, TradeId};
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    #[test]
    fn long_nq_example() {
        let pnl = calculate_pnl(Direction::Long, 18_500.0, 18_530.0, 20.0, 1);
        assert_relative_eq!(pnl.points, 30.0);
        assert_relative_eq!(pnl.currency, 600.0);
    }

    #[test]
    fn short_es_example() {
        let pnl = calculate_pnl(Direction::Short, 5_200.0, 5_190.0, 50.0, 1);
        assert_relative_eq!(pnl.points, 10.0);
        assert_relative_eq!(pnl.currency, 500.0);
    }

    #[test]
    fn short_loses_when_price_rises() {
        let pnl = calculate_pnl(Direction::Short, 5_200.0, 5_212.5, 50.0, 1);
        assert_relative_eq!(pnl.points, -12.5);
        assert_relative_eq!(pnl.currency, -625.0);
    }

    #[test]
    fn quantity_scales_currency_only() {
        let pnl = calculate_pnl(Direction::Long, 100.0, 101.0, 20.0, 3);
        assert_relative_eq!(pnl.points, 1.0);
        assert_relative_eq!(pnl.currency, 60.0);
    }

    #[test]
    fn small_moves_are_not_rounded() {
        let pnl = calculate_pnl(Direction::Long, 18_500.0, 18_500.13, 20.0, 1);
        assert!(pnl.points > 0.12 && pnl.points < 0.14);
        assert!((pnl.currency - 2.6).abs() < 1e-6);
    }

    #[test]
    fn mark_open_trade_uses_live_price() {
        let trade = Trade::open(
            TradeId::from("t"),
            Instrument::NQ,
            Direction::Long,
            18_500.0,
            New_York.with_ymd_and_hms(2024, 3, 14, 13, 0, 0).unwrap(),
            1,
            OrderParams::default(),
        );
        let spec = InstrumentSpec::default_for(Instrument::NQ);
        assert_eq!(mark(&trade, &spec, None), None);
        let pnl = mark(&trade, &spec, Some(18_490.0)).unwrap();
        assert_relative_eq!(pnl.currency, -200.0);
    }
}
