//! Tradable instruments and their contract specifications.

use std::fmt;
use std::str::FromStr;

use super::error::SimError;
use super::trade::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Instrument {
    NQ,
    ES,
}

impl Instrument {
    pub const ALL: [Instrument; 2] = [Instrument::NQ, Instrument::ES];

    pub fn symbol(&self) -> &'static str {
        match self {
            Instrument::NQ => "NQ",
            Instrument::ES => "ES",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Instrument::NQ => 0,
            Instrument::ES => 1,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Instrument {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NQ" => Ok(Instrument::NQ),
            "ES" => Ok(Instrument::ES),
            _ => Err(SimError::UnknownInstrument {
                symbol: s.trim().to_string(),
            }),
        }
    }
}

/// Parse a comma-separated instrument list, e.g. `"NQ, es"`.
///
/// Blank entries are ignored; duplicates are kept in first-seen order only once.
pub fn parse_instruments(input: &str) -> Result<Vec<Instrument>, SimError> {
    let mut out = Vec::new();
    for part in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let instrument: Instrument = part.parse()?;
        if !out.contains(&instrument) {
            out.push(instrument);
        }
    }
    Ok(out)
}

/// Static contract data for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSpec {
    pub instrument: Instrument,
    /// Currency per point of price movement.
    pub point_value: f64,
    /// Minimum price increment.
    pub tick_size: f64,
    pub start_price: f64,
    /// Typical daily range used by the history generator.
    pub volatility: f64,
    pub stop_distance: f64,
    pub target_distance: f64,
}

impl InstrumentSpec {
    pub fn default_for(instrument: Instrument) -> Self {
        match instrument {
            Instrument::NQ => InstrumentSpec {
                instrument,
                point_value: 20.0,
                tick_size: 0.25,
                start_price: 18_500.0,
                volatility: 100.0,
                stop_distance: 30.0,
                target_distance: 60.0,
            },
            Instrument::ES => InstrumentSpec {
                instrument,
                point_value: 50.0,
                tick_size: 0.25,
                start_price: 5_200.0,
                volatility: 30.0,
                stop_distance: 10.0,
                target_distance: 20.0,
            },
        }
    }

    /// Number of fractional digits in the tick size (0.25 -> 2, 1 -> 0).
    pub fn price_decimals(&self) -> usize {
        let repr = self.tick_size.to_string();
        match repr.split_once('.') {
            Some((_, frac)) => frac.trim_end_matches('0').len(),
            None => 0,
        }
    }

    /// Default (stop_loss, take_profit) around `price` for a new trade.
    pub fn suggest_levels(&self, direction: Direction, price: f64) -> (f64, f64) {
        let sign = direction.sign();
        (
            price - self.stop_distance * sign,
            price + self.target_distance * sign,
        )
    }
}

/// Process-wide instrument table. Every instrument always has a spec.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentConfig {
    specs: Vec<InstrumentSpec>,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        InstrumentConfig {
            specs: Instrument::ALL
                .iter()
                .map(|&i| InstrumentSpec::default_for(i))
                .collect(),
        }
    }
}

impl InstrumentConfig {
    pub fn spec(&self, instrument: Instrument) -> &InstrumentSpec {
        &self.specs[instrument.index()]
    }

    pub fn with_spec(mut self, spec: InstrumentSpec) -> Self {
        let idx = spec.instrument.index();
        self.specs[idx] = spec;
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstrumentSpec> {
        self.specs.iter()
    }
}
