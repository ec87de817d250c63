//! Time recurrence: when is a time-based reminder due?
//!
//! All instants are whole minutes since the Unix epoch. Reminder times are written in
//! local time as `YYYY-MM-DD -- HH:MM:SS`.

use chrono::{Local, NaiveDateTime, TimeZone};
use thiserror::Error;

/// Format of the `time` field of a reminder.
pub const TIME_FORMAT: &str = "%Y-%m-%d -- %H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid reminder time {0:?}: expected YYYY-MM-DD -- HH:MM:SS")]
    Malformed(String),
    #[error("reminder time {0:?} does not exist in the local timezone")]
    NonexistentLocal(String),
}

/// Parse a reminder `time` string into minutes since the epoch, in the local timezone.
pub fn parse_base_minute(time: &str) -> Result<i64, ScheduleError> {
    parse_base_minute_in(time, &Local)
}

pub fn parse_base_minute_in<Tz: TimeZone>(time: &str, tz: &Tz) -> Result<i64, ScheduleError> {
    let naive = NaiveDateTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| ScheduleError::Malformed(time.to_string()))?;
    // Ambiguous times (DST fall-back) resolve to the earlier instant.
    let instant = tz
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| ScheduleError::NonexistentLocal(time.to_string()))?;
    Ok(instant.timestamp().div_euclid(60))
}

/// Latest recurrence slot not after `now`.
///
/// Returns `base + k * repeat_each` for the largest `k >= 0` with the result `<= now`.
/// A non-positive interval, or a base still in the future, yields `base`.
pub fn due_minute(base: i64, repeat_each: i64, now: i64) -> i64 {
    if repeat_each <= 0 || now <= base {
        return base;
    }
    base + (now - base) / repeat_each * repeat_each
}

/// A slot is eligible once it has arrived and has not fired already.
pub fn is_due(due: i64, now: i64, last_fired: Option<i64>) -> bool {
    now >= due && last_fired != Some(due)
}

/// Current wall clock in whole minutes since the epoch.
pub fn now_minute() -> i64 {
    chrono::Utc::now().timestamp().div_euclid(60)
}

/// Render an epoch minute back into the reminder time format, in local time.
pub fn format_minute(minute: i64) -> String {
    match Local.timestamp_opt(minute * 60, 0).single() {
        Some(t) => t.format(TIME_FORMAT).to_string(),
        None => format!("minute {minute}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn format_round_trips_local_time() {
        let base = parse_base_minute("2024-03-10 -- 14:30:00").unwrap();
        assert_eq!(format_minute(base), "2024-03-10 -- 14:30:00");
    }

    #[test]
    fn parses_reminder_time_format() {
        let base = parse_base_minute_in("2024-01-01 -- 00:00:00", &Utc).unwrap();
        assert_eq!(base, 1_704_067_200 / 60);
    }

    #[test]
    fn seconds_are_truncated() {
        let a = parse_base_minute_in("2024-01-01 -- 10:15:00", &Utc).unwrap();
        let b = parse_base_minute_in("2024-01-01 -- 10:15:59", &Utc).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_time_is_rejected() {
        assert!(matches!(
            parse_base_minute_in("2024-01-01 10:00", &Utc),
            Err(ScheduleError::Malformed(_))
        ));
        assert!(parse_base_minute_in("", &Utc).is_err());
    }

    #[test]
    fn recurrence_picks_latest_slot() {
        let base = parse_base_minute_in("2024-01-01 -- 00:00:00", &Utc).unwrap();
        assert_eq!(due_minute(base, 60, base + 185), base + 180);
        assert_eq!(due_minute(base, 60, base + 180), base + 180);
        assert_eq!(due_minute(base, 60, base + 179), base + 120);
        assert_eq!(due_minute(base, 60, base + 59), base);
    }

    #[test]
    fn no_recurrence_keeps_base() {
        assert_eq!(due_minute(1000, 0, 5000), 1000);
        assert_eq!(due_minute(1000, -5, 5000), 1000);
    }

    #[test]
    fn future_base_is_not_advanced() {
        assert_eq!(due_minute(1000, 60, 900), 1000);
        assert!(!is_due(1000, 900, None));
    }

    #[test]
    fn same_slot_fires_once() {
        assert!(is_due(100, 100, None));
        assert!(!is_due(100, 130, Some(100)));
        assert!(is_due(160, 160, Some(100)));
    }
}
