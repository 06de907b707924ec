//! Configuration validation.
//!
//! Every configured value is checked here before the engine, market or
//! server is built, so the builders can fall back to defaults silently.

use std::net::SocketAddr;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::domain::error::SimError;
use crate::domain::instrument::{Instrument, parse_instruments};
use crate::domain::schedule::ScheduleTime;
use crate::domain::trade::Direction;
use crate::ports::config_port::ConfigPort;

/// Section name for an instrument's overrides, e.g. `instrument.nq`.
pub fn instrument_section(instrument: Instrument) -> String {
    format!("instrument.{}", instrument.symbol().to_ascii_lowercase())
}

/// Checks `[engine]`, `[market]`, `[web]` and every `[instrument.*]`.
pub fn validate_sim_config(config: &dyn ConfigPort) -> Result<(), SimError> {
    validate_timezone(config)?;
    validate_schedule_time(config)?;
    validate_quantity(config)?;
    validate_tick_interval(config)?;
    validate_market(config)?;
    validate_web(config)?;
    for instrument in Instrument::ALL {
        validate_instrument(config, instrument)?;
    }
    Ok(())
}

/// Checks the `[session]` orders used by `replay`.
pub fn validate_session_config(config: &dyn ConfigPort) -> Result<(), SimError> {
    let instruments = required(config, "session", "instruments")?;
    let parsed = parse_instruments(&instruments)?;
    if parsed.is_empty() {
        return Err(invalid("session", "instruments", "at least one instrument is required"));
    }

    let direction = required(config, "session", "direction")?;
    Direction::from_str(&direction)?;

    if let Some(mode) = config.get_string("session", "mode") {
        let mode = mode.trim().to_ascii_lowercase();
        if mode != "schedule" && mode != "execute" {
            return Err(invalid("session", "mode", "mode must be schedule or execute"));
        }
    }

    for key in ["stop_loss", "take_profit"] {
        if let Some(value) = parse_number::<f64>(config, "session", key)? {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid("session", key, &format!("{key} must be a positive price")));
            }
        }
    }

    if let Some(exit_time) = non_blank(config, "session", "exit_time") {
        ScheduleTime::from_str(&exit_time)?;
    }
    Ok(())
}

fn validate_timezone(config: &dyn ConfigPort) -> Result<(), SimError> {
    if let Some(tz) = non_blank(config, "engine", "timezone") {
        tz.trim()
            .parse::<Tz>()
            .map_err(|_| invalid("engine", "timezone", &format!("unknown timezone '{tz}'")))?;
    }
    Ok(())
}

fn validate_schedule_time(config: &dyn ConfigPort) -> Result<(), SimError> {
    if let Some(value) = non_blank(config, "engine", "schedule_time") {
        ScheduleTime::from_str(&value).map_err(|e| invalid("engine", "schedule_time", &e.to_string()))?;
    }
    Ok(())
}

fn validate_quantity(config: &dyn ConfigPort) -> Result<(), SimError> {
    if let Some(value) = parse_number::<i64>(config, "engine", "quantity")? {
        if value < 1 {
            return Err(invalid("engine", "quantity", "quantity must be at least 1"));
        }
    }
    Ok(())
}

fn validate_tick_interval(config: &dyn ConfigPort) -> Result<(), SimError> {
    if let Some(value) = parse_number::<i64>(config, "engine", "tick_interval_ms")? {
        if value < 1 {
            return Err(invalid(
                "engine",
                "tick_interval_ms",
                "tick_interval_ms must be at least 1",
            ));
        }
    }
    Ok(())
}

fn validate_market(config: &dyn ConfigPort) -> Result<(), SimError> {
    parse_number::<u64>(config, "market", "seed")?;
    if let Some(value) = parse_number::<f64>(config, "market", "max_move_pct")? {
        if !(0.0..0.5).contains(&value) {
            return Err(invalid(
                "market",
                "max_move_pct",
                "max_move_pct must be between 0 and 0.5",
            ));
        }
    }
    Ok(())
}

fn validate_web(config: &dyn ConfigPort) -> Result<(), SimError> {
    if let Some(listen) = non_blank(config, "web", "listen") {
        listen
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| invalid("web", "listen", "listen must be host:port, e.g. 127.0.0.1:3000"))?;
    }
    if let Some(cors) = non_blank(config, "web", "cors") {
        let known = ["true", "yes", "on", "1", "false", "no", "off", "0"];
        if !known.contains(&cors.trim().to_ascii_lowercase().as_str()) {
            return Err(invalid("web", "cors", "cors must be true or false"));
        }
    }
    Ok(())
}

fn validate_instrument(config: &dyn ConfigPort, instrument: Instrument) -> Result<(), SimError> {
    let section = instrument_section(instrument);
    for key in ["point_value", "tick_size", "start_price"] {
        if let Some(value) = parse_number::<f64>(config, &section, key)? {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(&section, key, &format!("{key} must be positive")));
            }
        }
    }
    for key in ["volatility", "stop_distance", "target_distance"] {
        if let Some(value) = parse_number::<f64>(config, &section, key)? {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(&section, key, &format!("{key} must be non-negative")));
            }
        }
    }
    Ok(())
}

fn non_blank(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .filter(|s| !s.trim().is_empty())
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SimError> {
    non_blank(config, section, key).ok_or_else(|| SimError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

/// `Ok(None)` when absent or blank, an error when present but unparseable.
fn parse_number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, SimError> {
    match non_blank(config, section, key) {
        None => Ok(None),
        Some(s) => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| invalid(section, key, &format!("'{}' is not a valid number", s.trim()))),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> SimError {
    SimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
