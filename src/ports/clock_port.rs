//! Wall-clock port trait.

use chrono::DateTime;
use chrono_tz::Tz;

pub trait Clock {
    /// Current time in the clock's configured timezone.
    fn now(&self) -> DateTime<Tz>;
}
