//! Market price port trait.

use crate::domain::instrument::Instrument;

pub trait PriceSource {
    /// Latest price, or `None` when the feed has nothing for `instrument`.
    fn current_price(&self, instrument: Instrument) -> Option<f64>;

    /// Feed connectivity; informational only, the engine never reads it.
    fn is_connected(&self) -> bool;
}
