//! Daily time-of-day used to compute reminder fire times.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use thiserror::Error;

/// Raised at startup when the configured reminder time is not `HH:MM`.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid daily time {0:?}: expected 24-hour HH:MM")]
pub struct InvalidDailyTime(pub String);

/// A wall-clock time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DailyTime(NaiveTime);

impl DailyTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// The first occurrence of this time strictly after `now`, in `now`'s zone.
    ///
    /// If today's occurrence has already been reached, the result is the
    /// same time on the next calendar day.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let today = now.date_naive();

        let candidate = resolve_local(&tz, today.and_time(self.0));
        if candidate > *now {
            return candidate;
        }
        resolve_local(&tz, (today + Duration::days(1)).and_time(self.0))
    }
}

/// Map a local wall-clock time onto the zone, stepping over DST gaps and
/// taking the earlier instant when the clock repeats.
fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .unwrap_or_else(|| tz.from_utc_datetime(&naive)),
    }
}

impl FromStr for DailyTime {
    type Err = InvalidDailyTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self)
            .map_err(|_| InvalidDailyTime(s.to_string()))
    }
}

impl fmt::Display for DailyTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}
