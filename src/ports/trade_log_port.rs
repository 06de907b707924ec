//! Trade log output port trait.

use crate::domain::error::SimError;
use crate::domain::instrument::InstrumentConfig;
use crate::domain::trade::Trade;

/// Port for writing a session's trade history.
pub trait TradeLogPort {
    fn write(&mut self, trades: &[Trade], instruments: &InstrumentConfig) -> Result<(), SimError>;
}
