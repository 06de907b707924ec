#![allow(dead_code)]

use chrono::{DateTime, TimeZone};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
pub use futsim::adapters::csv_adapter::ReplayPrices;
pub use futsim::adapters::system_clock::ManualClock;
pub use futsim::domain::engine::{CloseOutcome, EngineSettings, TradeEngine};
pub use futsim::domain::instrument::{Instrument, InstrumentConfig};
pub use futsim::domain::trade::{Direction, ExitReason, OrderParams, TradeStatus};
use std::io::Write;

pub type TestEngine = TradeEngine<ReplayPrices, ManualClock>;

/// New York local time on 2024-03-15.
pub fn ny(hour: u32, minute: u32, second: u32) -> DateTime<Tz> {
    New_York
        .with_ymd_and_hms(2024, 3, 15, hour, minute, second)
        .unwrap()
}

pub fn prices(nq: Option<f64>, es: Option<f64>) -> ReplayPrices {
    let mut p = ReplayPrices::new();
    if let Some(v) = nq {
        p.set(Instrument::NQ, v);
    }
    if let Some(v) = es {
        p.set(Instrument::ES, v);
    }
    p
}

pub fn engine_at(now: DateTime<Tz>, nq: Option<f64>, es: Option<f64>) -> TestEngine {
    TradeEngine::new(
        prices(nq, es),
        ManualClock::new(now),
        InstrumentConfig::default(),
        EngineSettings::default(),
    )
    .with_seed(7)
}

pub fn stop_at(level: f64) -> OrderParams {
    OrderParams {
        stop_loss: Some(level),
        ..OrderParams::default()
    }
}

pub fn target_at(level: f64) -> OrderParams {
    OrderParams {
        take_profit: Some(level),
        ..OrderParams::default()
    }
}

pub fn write_temp(content: &str, suffix: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
