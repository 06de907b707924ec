//! Display formatting for prices, money, points, durations and clock times.

use chrono::DateTime;
use chrono_tz::Tz;

use super::instrument::InstrumentSpec;

/// Price rounded to the instrument's tick precision.
pub fn format_price(spec: &InstrumentSpec, price: f64) -> String {
    format!("{:.*}", spec.price_decimals(), price)
}

/// `$1,234.50` / `-$500.00`.
pub fn format_currency(value: f64) -> String {
    let rounded = format!("{:.2}", value.abs());
    let (whole, cents) = rounded.split_once('.').unwrap_or((&rounded, "00"));
    let grouped = group_thousands(whole);
    // -0.001 rounds to 0.00 and should not carry a sign.
    if value < 0.0 && rounded != "0.00" {
        format!("-${grouped}.{cents}")
    } else {
        format!("${grouped}.{cents}")
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_points(points: f64) -> String {
    format!("{points:.2} pts")
}

/// `1h 2m 3s`, `2m 3s` or `3s`. Negative spans format as zero.
pub fn format_duration(start: &DateTime<Tz>, end: &DateTime<Tz>) -> String {
    let total = (*end - *start).num_seconds().max(0);
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// `hh:mm:ss AM/PM` in the timestamp's own zone.
pub fn format_time(t: &DateTime<Tz>) -> String {
    t.format("%I:%M:%S %p").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::instrument::Instrument;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    #[test]
    fn price_uses_tick_precision() {
        let nq = InstrumentSpec::default_for(Instrument::NQ);
        assert_eq!(format_price(&nq, 18_500.0), "18500.00");
        assert_eq!(format_price(&nq, 18_500.256), "18500.26");

        let mut whole = nq.clone();
        whole.tick_size = 1.0;
        assert_eq!(format_price(&whole, 18_500.4), "18500");
    }

    #[test]
    fn currency_groups_thousands() {
        assert_eq!(format_currency(0.0), "$0.00");
        assert_eq!(format_currency(600.0), "$600.00");
        assert_eq!(format_currency(1_234.5), "$1,234.50");
        assert_eq!(format_currency(1_234_567.891), "$1,234,567.89");
        assert_eq!(format_currency(-500.0), "-$500.00");
        assert_eq!(format_currency(-12_000.0), "-$12,000.00");
    }

    #[test]
    fn currency_drops_sign_of_negative_zero() {
        assert_eq!(format_currency(-0.001), "$0.00");
    }

    #[test]
    fn points_two_decimals() {
        assert_eq!(format_points(30.0), "30.00 pts");
        assert_eq!(format_points(-12.5), "-12.50 pts");
    }

    #[test]
    fn duration_units() {
        let start = New_York.with_ymd_and_hms(2024, 3, 14, 13, 0, 0).unwrap();
        let at = |h, m, s| New_York.with_ymd_and_hms(2024, 3, 14, h, m, s).unwrap();
        assert_eq!(format_duration(&start, &at(13, 0, 9)), "9s");
        assert_eq!(format_duration(&start, &at(13, 2, 3)), "2m 3s");
        assert_eq!(format_duration(&start, &at(14, 2, 3)), "1h 2m 3s");
        assert_eq!(format_duration(&start, &at(12, 0, 0)), "0s");
    }

    #[test]
    fn time_twelve_hour_clock() {
        let t = New_York.with_ymd_and_hms(2024, 3, 14, 13, 5, 9).unwrap();
        assert_eq!(format_time(&t), "01:05:09 PM");
        let t = New_York.with_ymd_and_hms(2024, 3, 14, 0, 30, 0).unwrap();
        assert_eq!(format_time(&t), "12:30:00 AM");
    }
}
