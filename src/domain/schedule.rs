//! Scheduled-trade requests and the daily firing instant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike};
use chrono_tz::Tz;

use super::error::SimError;
use super::instrument::Instrument;
use super::trade::{Direction, OrderParams};

/// Time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTime {
    pub hour: u32,
    pub minute: u32,
}

impl Default for ScheduleTime {
    fn default() -> Self {
        ScheduleTime {
            hour: 13,
            minute: 0,
        }
    }
}

impl ScheduleTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, SimError> {
        if hour > 23 || minute > 59 {
            return Err(SimError::InvalidTime {
                value: format!("{hour:02}:{minute:02}"),
                reason: "hour must be 0-23 and minute 0-59".into(),
            });
        }
        Ok(ScheduleTime { hour, minute })
    }

    /// True when `now` falls in this hour:minute.
    pub fn is_due(&self, now: &DateTime<Tz>) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }

    /// Today at HH:MM:00 in the timezone of `now`. Ambiguous local times take
    /// the earlier offset; times inside a DST gap are an error.
    pub fn on_day_of(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>, SimError> {
        self.on_date(now.date_naive(), now.timezone())
    }

    /// The instant the schedule fires next as seen from `now`: today while
    /// the HH:MM minute has not passed, otherwise tomorrow.
    pub fn next_after(&self, now: &DateTime<Tz>) -> Result<DateTime<Tz>, SimError> {
        match self.on_day_of(now) {
            Ok(today) if *now < today + Duration::minutes(1) => Ok(today),
            _ => {
                let tomorrow = now.date_naive().succ_opt().ok_or_else(|| SimError::InvalidTime {
                    value: self.to_string(),
                    reason: format!("no day after {}", now.date_naive()),
                })?;
                self.on_date(tomorrow, now.timezone())
            }
        }
    }

    fn on_date(&self, date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, SimError> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0).ok_or_else(|| {
            SimError::InvalidTime {
                value: self.to_string(),
                reason: "not a valid time of day".into(),
            }
        })?;
        tz.from_local_datetime(&date.and_time(time))
            .earliest()
            .ok_or_else(|| SimError::InvalidTime {
                value: self.to_string(),
                reason: format!("does not exist on {} in {}", date, tz),
            })
    }
}

impl fmt::Display for ScheduleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for ScheduleTime {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SimError::InvalidTime {
            value: s.to_string(),
            reason: "expected HH:MM".into(),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u32 = h.trim().parse().map_err(|_| invalid())?;
        let minute: u32 = m.trim().parse().map_err(|_| invalid())?;
        ScheduleTime::new(hour, minute)
    }
}

/// Resolve a user-supplied `HH:MM` exit time to today in `now`'s zone.
/// A moment already past is kept, so the trade exits on its first tick.
pub fn resolve_exit_time(value: &str, now: &DateTime<Tz>) -> Result<DateTime<Tz>, SimError> {
    value.parse::<ScheduleTime>()?.on_day_of(now)
}

/// The single outstanding scheduled order.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTradeRequest {
    pub instruments: Vec<Instrument>,
    pub direction: Direction,
    pub params: OrderParams,
}

impl PendingTradeRequest {
    /// Returns `None` for an empty instrument set. Duplicates are dropped.
    pub fn new(instruments: &[Instrument], direction: Direction, params: OrderParams) -> Option<Self> {
        let mut unique = Vec::with_capacity(instruments.len());
        for &i in instruments {
            if !unique.contains(&i) {
                unique.push(i);
            }
        }
        if unique.is_empty() {
            return None;
        }
        Some(PendingTradeRequest {
            instruments: unique,
            direction,
            params,
        })
    }
}
