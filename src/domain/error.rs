//! Domain error types.

/// Top-level error type for futsim.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown instrument: {symbol}")]
    UnknownInstrument { symbol: String },

    #[error("invalid time {value:?}: {reason}")]
    InvalidTime { value: String, reason: String },

    #[error("no price available for {instrument}")]
    PriceUnavailable { instrument: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// True for conditions the tick loop absorbs and retries on the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, SimError::PriceUnavailable { .. })
    }
}

impl From<csv::Error> for SimError {
    fn from(err: csv::Error) -> Self {
        SimError::Data {
            reason: format!("CSV error: {err}"),
        }
    }
}

impl From<&SimError> for std::process::ExitCode {
    fn from(err: &SimError) -> Self {
        let code: u8 = match err {
            SimError::Io(_) => 1,
            SimError::ConfigParse { .. }
            | SimError::ConfigMissing { .. }
            | SimError::ConfigInvalid { .. } => 2,
            SimError::PriceUnavailable { .. } => 3,
            SimError::UnknownInstrument { .. } | SimError::InvalidTime { .. } => 4,
            SimError::Data { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_unavailable_is_transient() {
        let err = SimError::PriceUnavailable {
            instrument: "NQ".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "no price available for NQ");
    }

    #[test]
    fn config_errors_are_not_transient() {
        let err = SimError::ConfigMissing {
            section: "engine".into(),
            key: "timezone".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "missing config key [engine] timezone");
    }

    #[test]
    fn csv_error_maps_to_data() {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader("a,b\nc\n".as_bytes());
        let err = rdr
            .records()
            .find_map(|r| r.err())
            .expect("ragged rows should fail");
        let sim: SimError = err.into();
        assert!(matches!(sim, SimError::Data { .. }));
    }
}
