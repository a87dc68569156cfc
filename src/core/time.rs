//! Time utilities
//!
//! Date formatting, time-of-day anchoring and countdown labels. Everything
//! here is pure except the [`Clock`] implementations.

use chrono::{DateTime, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Timelike, Utc};
use std::fmt;
use std::sync::Mutex;

use crate::core::error::{MawaqitError, Result};
use crate::core::models::ScheduleDate;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock of the host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Move the clock to a new instant
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard = instant;
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.instant.lock() {
            *guard = *guard + by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.instant.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Render an instant as its canonical UTC calendar date
pub fn format_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> ScheduleDate {
    ScheduleDate::new(instant.with_timezone(&Utc).date_naive())
}

/// Local wall-clock time for a fixed UTC offset in minutes
pub fn local_now(clock: &dyn Clock, utc_offset_minutes: i32) -> DateTime<FixedOffset> {
    let offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix());
    clock.now().with_timezone(&offset)
}

/// Countdown text such as `45m`, `2h15m` or `2h`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DurationLabel(String);

impl DurationLabel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DurationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whole minutes between two instants, rendered as a countdown label
///
/// Spans of an hour or more render as `<h>h<m>m`, dropping the minutes part
/// when it is zero. Negative spans are not clamped and follow the same rule,
/// so five minutes in the past renders as `-5m`.
pub fn duration<Tz: TimeZone>(from: &DateTime<Tz>, to: &DateTime<Tz>) -> DurationLabel {
    let minutes = (to.clone() - from.clone()).num_minutes();
    let label = if minutes >= 60 {
        let hours = minutes / 60;
        let rest = minutes % 60;
        if rest == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h{}m", hours, rest)
        }
    } else {
        format!("{}m", minutes)
    };
    DurationLabel(label)
}

/// Parse a strict `HH:MM` time of day
pub fn parse_time_of_day(value: &str) -> Result<NaiveTime> {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return Err(MawaqitError::decode(format!("expected HH:MM time, got {:?}", value)));
    }
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|_| MawaqitError::decode(format!("expected HH:MM time, got {:?}", value)))
}

/// Anchor an `HH:MM` time onto `now`'s date
///
/// Only the hours and minutes of `now` are replaced; the date always comes
/// from `now`, never from the schedule row.
pub fn time_of<Tz: TimeZone>(hh_mm: &str, now: &DateTime<Tz>) -> Result<DateTime<Tz>> {
    let time = parse_time_of_day(hh_mm)?;
    now.with_hour(time.hour())
        .and_then(|t| t.with_minute(time.minute()))
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .ok_or_else(|| MawaqitError::decode(format!("{} does not exist on {}", hh_mm, now.date_naive())))
}
