//! Delivery triggers: one-shot instants and calendar repeats.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// When the delivery service should fire a registered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fire once at the given local time.
    At { at: NaiveDateTime },
    /// Fire every day at `time`.
    Daily { time: NaiveTime },
    /// Fire every week on `weekday` at `time`.
    Weekly { weekday: Weekday, time: NaiveTime },
    /// Fire every month on `day` at `time`. Months without that day are skipped.
    Monthly { day: u32, time: NaiveTime },
}

impl Trigger {
    pub fn repeats(&self) -> bool {
        !matches!(self, Trigger::At { .. })
    }

    /// Next firing strictly after `now`, or `None` for an elapsed one-shot.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        match *self {
            Trigger::At { at } => (at > now).then_some(at),
            Trigger::Daily { time } => {
                let today = now.date().and_time(time);
                if today > now {
                    Some(today)
                } else {
                    now.date().checked_add_days(Days::new(1)).map(|d| d.and_time(time))
                }
            }
            Trigger::Weekly { weekday, time } => {
                let ahead = (7 + weekday.num_days_from_monday()
                    - now.weekday().num_days_from_monday())
                    % 7;
                let candidate = now
                    .date()
                    .checked_add_days(Days::new(u64::from(ahead)))?
                    .and_time(time);
                if candidate > now {
                    Some(candidate)
                } else {
                    candidate.checked_add_days(Days::new(7))
                }
            }
            Trigger::Monthly { day, time } => {
                let (mut year, mut month) = (now.year(), now.month());
                // 31st-of-month rules can skip up to two months in a row
                for _ in 0..13 {
                    if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                        let candidate = date.and_time(time);
                        if candidate > now {
                            return Some(candidate);
                        }
                    }
                    if month == 12 {
                        year += 1;
                        month = 1;
                    } else {
                        month += 1;
                    }
                }
                None
            }
        }
    }
}
