//! Recurrence expansion.
//!
//! Turns a human-facing frequency ("weekdays", "monthly") plus a time of
//! day into concrete delivery rules. Each rule carries an identifier suffix
//! so it can be registered and cancelled independently.

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::clock::TimeOfDay;
use crate::error::ValidationError;
use crate::notification::Trigger;
use crate::personalization::next_occurrence;

const WEEKDAYS: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];
const WEEKEND: [Weekday; 2] = [Weekday::Sat, Weekday::Sun];

/// How often a recurring reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    Weekdays,
    Weekends,
    Weekly { weekday: Weekday },
    Monthly { day: u32 },
    /// Arbitrary recurrence is not supported; fires once.
    Custom,
}

impl Frequency {
    /// Weekly on `weekday`, Monday when unspecified.
    pub fn weekly(weekday: Option<Weekday>) -> Self {
        Frequency::Weekly {
            weekday: weekday.unwrap_or(Weekday::Mon),
        }
    }

    /// Monthly on `day`, the 1st when unspecified.
    pub fn monthly(day: Option<u32>) -> Result<Self, ValidationError> {
        let day = day.unwrap_or(1);
        if !(1..=31).contains(&day) {
            return Err(ValidationError::InvalidDayOfMonth(day));
        }
        Ok(Frequency::Monthly { day })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekdays => "weekdays",
            Frequency::Weekends => "weekends",
            Frequency::Weekly { .. } => "weekly",
            Frequency::Monthly { .. } => "monthly",
            Frequency::Custom => "custom",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Frequency {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekdays" => Ok(Frequency::Weekdays),
            "weekends" => Ok(Frequency::Weekends),
            "weekly" => Ok(Frequency::weekly(None)),
            "monthly" => Frequency::monthly(None),
            "custom" => Ok(Frequency::Custom),
            other => Err(ValidationError::InvalidValue {
                field: "frequency".to_string(),
                message: format!("unknown frequency '{other}'"),
            }),
        }
    }
}

/// One concrete delivery rule produced by expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    /// Appended to the notification identifier.
    pub suffix: String,
    pub trigger: Trigger,
}

fn weekday_suffix(weekday: Weekday) -> String {
    weekday.to_string().to_lowercase()
}

/// Expand `frequency` at `time` into delivery rules.
///
/// `now` only matters for `Custom`, which becomes a one-shot at the next
/// occurrence of `time`.
pub fn expand(frequency: Frequency, time: TimeOfDay, now: NaiveDateTime) -> Vec<RecurrenceRule> {
    let time_of_day = time.to_naive_time();
    match frequency {
        Frequency::Daily => vec![RecurrenceRule {
            suffix: "daily".to_string(),
            trigger: Trigger::Daily { time: time_of_day },
        }],
        Frequency::Weekdays => weekly_rules(&WEEKDAYS, time),
        Frequency::Weekends => weekly_rules(&WEEKEND, time),
        Frequency::Weekly { weekday } => vec![RecurrenceRule {
            suffix: format!("weekly_{}", weekday_suffix(weekday)),
            trigger: Trigger::Weekly {
                weekday,
                time: time_of_day,
            },
        }],
        Frequency::Monthly { day } => {
            let day = day.clamp(1, 31);
            vec![RecurrenceRule {
                suffix: format!("monthly_{day}"),
                trigger: Trigger::Monthly {
                    day,
                    time: time_of_day,
                },
            }]
        }
        Frequency::Custom => {
            tracing::warn!(%time, "custom recurrence is not supported, scheduling once");
            vec![RecurrenceRule {
                suffix: "once".to_string(),
                trigger: Trigger::At {
                    at: next_occurrence(now, time_of_day),
                },
            }]
        }
    }
}

fn weekly_rules(days: &[Weekday], time: TimeOfDay) -> Vec<RecurrenceRule> {
    days.iter()
        .map(|&weekday| RecurrenceRule {
            suffix: weekday_suffix(weekday),
            trigger: Trigger::Weekly {
                weekday,
                time: time.to_naive_time(),
            },
        })
        .collect()
}

/// Every suffix expansion can produce, for cancelling all of a subject's rules.
pub fn all_suffixes() -> Vec<String> {
    let mut suffixes = vec!["daily".to_string(), "once".to_string()];
    for weekday in WEEKDAYS.iter().chain(WEEKEND.iter()) {
        suffixes.push(weekday_suffix(*weekday));
        suffixes.push(format!("weekly_{}", weekday_suffix(*weekday)));
    }
    suffixes.extend((1..=31).map(|day| format!("monthly_{day}")));
    suffixes
}
