//! Simulated market data: a random-walk live feed and a daily history
//! generator.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Weekday};
use chrono_tz::Tz;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::instrument::{Instrument, InstrumentConfig, InstrumentSpec};
use super::ohlcv::OhlcvBar;
use crate::ports::price_port::PriceSource;

/// Largest fractional move per step, either direction.
pub const DEFAULT_MAX_MOVE_PCT: f64 = 0.005;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub instrument: Instrument,
    pub price: f64,
    pub previous: f64,
}

impl Quote {
    pub fn is_up(&self) -> bool {
        self.price >= self.previous
    }
}

/// One random-walk price per instrument.
#[derive(Debug)]
pub struct RandomWalkMarket {
    prices: Vec<f64>,
    previous: Vec<f64>,
    max_move_pct: f64,
    last_update: Option<DateTime<Tz>>,
    connected: bool,
    rng: StdRng,
}

impl RandomWalkMarket {
    pub fn new(instruments: &InstrumentConfig, max_move_pct: f64, seed: Option<u64>) -> Self {
        let prices: Vec<f64> = Instrument::ALL
            .iter()
            .map(|&i| instruments.spec(i).start_price)
            .collect();
        RandomWalkMarket {
            previous: prices.clone(),
            prices,
            max_move_pct: max_move_pct.abs(),
            last_update: None,
            connected: false,
            rng: match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            },
        }
    }

    /// Mark the feed as connected. Prices are served either way.
    pub fn start(&mut self) {
        self.connected = true;
    }

    /// Move every price by a uniform fraction in [-max, +max), rounded to
    /// cents.
    pub fn step(&mut self, now: DateTime<Tz>) {
        for idx in 0..self.prices.len() {
            let current = self.prices[idx];
            let change = if self.max_move_pct > 0.0 {
                current * self.rng.gen_range(-self.max_move_pct..self.max_move_pct)
            } else {
                0.0
            };
            self.previous[idx] = current;
            self.prices[idx] = round_cents(current + change);
        }
        self.last_update = Some(now);
        self.start();
    }

    pub fn quote(&self, instrument: Instrument) -> Quote {
        let idx = instrument.index();
        Quote {
            instrument,
            price: self.prices[idx],
            previous: self.previous[idx],
        }
    }

    pub fn quotes(&self) -> Vec<Quote> {
        Instrument::ALL.iter().map(|&i| self.quote(i)).collect()
    }

    pub fn last_update(&self) -> Option<DateTime<Tz>> {
        self.last_update
    }
}

impl PriceSource for RandomWalkMarket {
    fn current_price(&self, instrument: Instrument) -> Option<f64> {
        Some(self.prices[instrument.index()])
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Daily bars for the `days` calendar days up to and including `end`,
/// weekends skipped, walking from the instrument's start price.
pub fn generate_history<R: Rng + ?Sized>(
    spec: &InstrumentSpec,
    end: NaiveDate,
    days: u32,
    rng: &mut R,
) -> Vec<OhlcvBar> {
    let volatility = spec.volatility.abs();
    let mut last_close = spec.start_price;
    let mut bars = Vec::new();
    let mut date = end - Duration::days(i64::from(days));

    while date <= end {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let open = last_close;
            let close = open + (rng.gen_range(0.0..1.0) - 0.5) * volatility;
            let high = open.max(close) + rng.gen_range(0.0..1.0) * volatility * 0.5;
            let low = open.min(close) - rng.gen_range(0.0..1.0) * volatility * 0.5;
            bars.push(OhlcvBar {
                instrument: spec.instrument,
                date,
                open,
                high,
                low,
                close,
                volume: rng.gen_range(0..1_000_000),
            });
            last_close = close;
        }
        date += Duration::days(1);
    }
    bars
}
