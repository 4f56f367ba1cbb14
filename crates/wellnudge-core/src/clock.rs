//! Local wall-clock access and time-of-day values.
//!
//! All scheduling math runs on naive local time; the clock is injected so
//! tests can pin "now".

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Reads the system's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

/// Hour and minute of a day, written `HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u32,
    minute: u32,
}

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Result<Self, ValidationError> {
        if hour > 23 || minute > 59 {
            return Err(ValidationError::InvalidTime { hour, minute });
        }
        Ok(Self { hour, minute })
    }

    pub fn from_minute_of_day(minutes: u32) -> Result<Self, ValidationError> {
        Self::new(minutes / 60, minutes % 60)
    }

    pub fn of(datetime: NaiveDateTime) -> Self {
        Self {
            hour: datetime.hour(),
            minute: datetime.minute(),
        }
    }

    pub fn hour(self) -> u32 {
        self.hour
    }

    pub fn minute(self) -> u32 {
        self.minute
    }

    /// 0..=1439
    pub fn minute_of_day(self) -> u32 {
        self.hour * 60 + self.minute
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }

    pub fn on(self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.to_naive_time())
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidValue {
            field: "time_of_day".to_string(),
            message: format!("expected HH:MM, got '{s}'"),
        };
        let (h, m) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour = h.parse().map_err(|_| invalid())?;
        let minute = m.parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Minute of day (0..=1439) of a datetime, ignoring seconds.
pub fn minute_of_day(datetime: NaiveDateTime) -> u32 {
    datetime.hour() * 60 + datetime.minute()
}

/// `at + by`, or one second after `at` when that would overflow.
pub fn after(at: NaiveDateTime, by: Duration) -> NaiveDateTime {
    at.checked_add_signed(by)
        .or_else(|| at.checked_add_signed(Duration::seconds(1)))
        .unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_of_day_parses_and_prints() {
        let t: TimeOfDay = "07:05".parse().unwrap();
        assert_eq!(t.minute_of_day(), 425);
        assert_eq!(t.to_string(), "07:05");
        assert!("24:00".parse::<TimeOfDay>().is_err());
        assert!("noon".parse::<TimeOfDay>().is_err());
    }

    #[test]
    fn time_of_day_serializes_as_string() {
        let t = TimeOfDay::new(21, 30).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"21:30\"");
        let back: TimeOfDay = serde_json::from_str("\"21:30\"").unwrap();
        assert_eq!(back, t);
    }

    #[test]
    fn fixed_clock_advances() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        let clock = FixedClock::new(start);
        clock.advance(Duration::minutes(90));
        assert_eq!(minute_of_day(clock.now()), 9 * 60 + 30);
    }

    #[test]
    fn after_saturates_instead_of_overflowing() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert_eq!(after(start, Duration::minutes(15)), start + Duration::minutes(15));
        assert_eq!(after(NaiveDateTime::MAX, Duration::days(1)), NaiveDateTime::MAX);
        let near_end = NaiveDateTime::MAX - Duration::seconds(10);
        assert_eq!(after(near_end, Duration::days(1)), near_end + Duration::seconds(1));
    }
}
