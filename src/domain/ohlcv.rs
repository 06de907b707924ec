//! Daily OHLCV bar representation.

use chrono::NaiveDate;

use super::instrument::Instrument;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub instrument: Instrument,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl OhlcvBar {
    /// close - open; positive on an up day.
    pub fn change(&self) -> f64 {
        self.close - self.open
    }

    /// True when high/low bracket both open and close.
    pub fn is_consistent(&self) -> bool {
        self.high >= self.open.max(self.close) && self.low <= self.open.min(self.close)
    }
}
