//! Clock adapters: wall clock and a manually advanced clock.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::ports::clock_port::Clock;

/// Wall-clock time viewed in a fixed named timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(chrono_tz::America::New_York)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

/// A clock that only moves when told to. Drives replays and tests.
#[derive(Debug, Clone, Copy)]
pub struct ManualClock {
    now: DateTime<Tz>,
}

impl ManualClock {
    pub fn new(now: DateTime<Tz>) -> Self {
        Self { now }
    }

    pub fn set(&mut self, now: DateTime<Tz>) {
        self.now = now;
    }

    pub fn advance(&mut self, by: Duration) {
        self.now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Tz> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    #[test]
    fn system_clock_reports_configured_zone() {
        let clock = SystemClock::new(chrono_tz::Europe::London);
        assert_eq!(clock.now().timezone(), chrono_tz::Europe::London);
        assert_eq!(SystemClock::default().timezone(), New_York);
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let start = New_York.with_ymd_and_hms(2024, 3, 14, 12, 59, 30).unwrap();
        let mut clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(Duration::seconds(45));
        assert_eq!(
            clock.now(),
            New_York.with_ymd_and_hms(2024, 3, 14, 13, 0, 15).unwrap()
        );
        clock.set(start);
        assert_eq!(clock.now(), start);
    }
}
