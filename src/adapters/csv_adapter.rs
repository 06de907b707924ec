//! CSV price feed for replays and CSV trade log output.

use crate::domain::error::SimError;
use crate::domain::format::format_price;
use crate::domain::instrument::{Instrument, InstrumentConfig};
use crate::domain::trade::Trade;
use crate::ports::price_port::PriceSource;
use crate::ports::trade_log_port::TradeLogPort;
use chrono::{DateTime, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use std::fs;
use std::path::{Path, PathBuf};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// All prices sharing one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBatch {
    pub time: DateTime<Tz>,
    pub prices: Vec<(Instrument, f64)>,
}

/// A recorded price feed, grouped into batches in time order.
#[derive(Debug, Clone, Default)]
pub struct CsvPriceFeed {
    batches: Vec<PriceBatch>,
}

impl CsvPriceFeed {
    pub fn from_path(path: &Path, tz: Tz) -> Result<Self, SimError> {
        let content = fs::read_to_string(path).map_err(|e| SimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_reader(content.as_bytes(), tz)
    }

    /// Expects a `timestamp,instrument,price` header. Timestamps are local
    /// times in `tz` and must never decrease.
    pub fn from_reader<R: std::io::Read>(reader: R, tz: Tz) -> Result<Self, SimError> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut batches: Vec<PriceBatch> = Vec::new();

        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let row = line + 2;

            let ts = record.get(0).ok_or_else(|| SimError::Data {
                reason: format!("row {row}: missing timestamp column"),
            })?;
            let time = parse_timestamp(ts, tz).map_err(|reason| SimError::Data {
                reason: format!("row {row}: {reason}"),
            })?;

            let instrument: Instrument = record
                .get(1)
                .ok_or_else(|| SimError::Data {
                    reason: format!("row {row}: missing instrument column"),
                })?
                .parse()?;

            let price: f64 = record
                .get(2)
                .ok_or_else(|| SimError::Data {
                    reason: format!("row {row}: missing price column"),
                })?
                .parse()
                .map_err(|e| SimError::Data {
                    reason: format!("row {row}: invalid price value: {e}"),
                })?;
            if !price.is_finite() || price <= 0.0 {
                return Err(SimError::Data {
                    reason: format!("row {row}: price must be positive"),
                });
            }

            match batches.last_mut() {
                Some(last) if last.time == time => last.prices.push((instrument, price)),
                Some(last) if last.time > time => {
                    return Err(SimError::Data {
                        reason: format!("row {row}: timestamp {ts} is earlier than the previous row"),
                    });
                }
                _ => batches.push(PriceBatch {
                    time,
                    prices: vec![(instrument, price)],
                }),
            }
        }
        Ok(Self { batches })
    }

    pub fn batches(&self) -> &[PriceBatch] {
        &self.batches
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

fn parse_timestamp(value: &str, tz: Tz) -> Result<DateTime<Tz>, String> {
    let naive = NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT)
        .map_err(|e| format!("invalid timestamp {value:?}: {e}"))?;
    tz.from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| format!("timestamp {value:?} does not exist in {tz}"))
}

/// Last seen price per instrument. Instruments never seen have no price.
#[derive(Debug, Clone, Default)]
pub struct ReplayPrices {
    prices: [Option<f64>; Instrument::ALL.len()],
}

impl ReplayPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, instrument: Instrument, price: f64) {
        self.prices[instrument.index()] = Some(price);
    }

    pub fn clear(&mut self, instrument: Instrument) {
        self.prices[instrument.index()] = None;
    }

    pub fn apply(&mut self, batch: &PriceBatch) {
        for &(instrument, price) in &batch.prices {
            self.set(instrument, price);
        }
    }
}

impl PriceSource for ReplayPrices {
    fn current_price(&self, instrument: Instrument) -> Option<f64> {
        self.prices[instrument.index()]
    }

    fn is_connected(&self) -> bool {
        self.prices.iter().any(Option::is_some)
    }
}

/// Writes the trade log as CSV, one row per trade in creation order.
pub struct CsvTradeLog {
    path: PathBuf,
}

impl CsvTradeLog {
    pub const HEADER: [&'static str; 11] = [
        "id",
        "instrument",
        "direction",
        "status",
        "entry_time",
        "entry_price",
        "exit_time",
        "exit_price",
        "pnl",
        "pnl_points",
        "exit_reason",
    ];

    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(trade: &Trade, instruments: &InstrumentConfig) -> Vec<String> {
        let spec = instruments.spec(trade.instrument);
        let mut row = vec![
            trade.id.to_string(),
            trade.instrument.to_string(),
            trade.direction.to_string(),
            trade.status().to_string(),
            trade.entry_time.format(TIMESTAMP_FORMAT).to_string(),
            format_price(spec, trade.entry_price),
        ];
        match trade.exit() {
            Some(exit) => row.extend([
                exit.time.format(TIMESTAMP_FORMAT).to_string(),
                format_price(spec, exit.price),
                format!("{:.2}", exit.pnl),
                format!("{:.2}", exit.pnl_points),
                exit.reason.label().to_string(),
            ]),
            None => row.extend(std::iter::repeat_n(String::new(), 5)),
        }
        row
    }
}

impl TradeLogPort for CsvTradeLog {
    fn write(&mut self, trades: &[Trade], instruments: &InstrumentConfig) -> Result<(), SimError> {
        let mut wtr = csv::Writer::from_path(&self.path)?;
        wtr.write_record(Self::HEADER)?;
        for trade in trades {
            wtr.write_record(Self::record(trade, instruments))?;
        }
        wtr.flush()?;
        Ok(())
    }
}
