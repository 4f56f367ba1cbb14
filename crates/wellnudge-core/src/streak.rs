//! Daily completion streaks per goal category.
//!
//! A completion on the day after the last one extends the streak; a
//! completion after a longer gap starts over at 1; a second completion on
//! the same day changes nothing.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::Result;
use crate::gate::milestone;
use crate::notification::NotificationSpec;
use crate::scheduler::{NotificationScheduler, ScheduleOutcome};
use crate::storage::Database;

/// Streak state for one category. `current_count` is at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakRecord {
    pub category: String,
    pub current_count: u32,
    pub longest_count: u32,
    pub last_updated: NaiveDate,
}

/// Result of applying a completion to a streak.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "record", rename_all = "snake_case")]
pub enum StreakAdvance {
    /// Already counted today.
    Unchanged(StreakRecord),
    /// Completed on the following day.
    Extended(StreakRecord),
    /// First completion, or the streak was broken.
    Started(StreakRecord),
}

impl StreakAdvance {
    pub fn record(&self) -> &StreakRecord {
        match self {
            StreakAdvance::Unchanged(r) | StreakAdvance::Extended(r) | StreakAdvance::Started(r) => r,
        }
    }

    /// Whether this advance lands on a milestone worth announcing.
    pub fn reached_milestone(&self) -> bool {
        matches!(self, StreakAdvance::Extended(r) if milestone::should_notify(r.current_count))
    }
}

impl StreakRecord {
    /// Apply a completion on `today` to an optional existing record.
    pub fn advance(existing: Option<StreakRecord>, category: &str, today: NaiveDate) -> StreakAdvance {
        let Some(mut record) = existing else {
            return StreakAdvance::Started(StreakRecord {
                category: category.to_string(),
                current_count: 1,
                longest_count: 1,
                last_updated: today,
            });
        };

        let gap = (today - record.last_updated).num_days();
        if gap <= 0 {
            return StreakAdvance::Unchanged(record);
        }

        record.last_updated = today;
        if gap == 1 {
            record.current_count += 1;
            record.longest_count = record.longest_count.max(record.current_count);
            StreakAdvance::Extended(record)
        } else {
            record.current_count = 1;
            record.longest_count = record.longest_count.max(1);
            StreakAdvance::Started(record)
        }
    }

    /// Days to go until the next milestone.
    pub fn days_to_next_milestone(&self) -> Option<u32> {
        milestone::next_milestone(self.current_count).map(|m| m - self.current_count)
    }
}

/// Applies goal completions to streaks and announces milestones.
pub struct StreakUpdater {
    db: Arc<Database>,
}

impl StreakUpdater {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Record a completion in `category` and schedule a milestone
    /// notification when one is reached.
    pub async fn record_completion(
        &self,
        category: &str,
        today: NaiveDate,
        scheduler: &NotificationScheduler,
    ) -> Result<StreakAdvance> {
        let advance = self.db.advance_streak(category, today)?;
        let record = advance.record();
        tracing::info!(
            category,
            current = record.current_count,
            longest = record.longest_count,
            "streak updated"
        );

        if advance.reached_milestone() {
            let spec = NotificationSpec::streak_milestone(category, record.current_count);
            let outcome = scheduler.schedule_streak(spec).await;
            if !matches!(outcome, ScheduleOutcome::Scheduled { .. }) {
                tracing::debug!(category, ?outcome, "milestone notification not scheduled");
            }
        }
        Ok(advance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, d).unwrap()
    }

    fn record(current: u32, longest: u32, last: NaiveDate) -> StreakRecord {
        StreakRecord {
            category: "hydration".into(),
            current_count: current,
            longest_count: longest,
            last_updated: last,
        }
    }

    #[test]
    fn first_completion_starts_at_one() {
        let advance = StreakRecord::advance(None, "hydration", day(3));
        assert_eq!(advance, StreakAdvance::Started(record(1, 1, day(3))));
    }

    #[test]
    fn same_day_completion_is_ignored() {
        let existing = record(4, 9, day(3));
        let advance = StreakRecord::advance(Some(existing.clone()), "hydration", day(3));
        assert_eq!(advance, StreakAdvance::Unchanged(existing));
    }

    #[test]
    fn next_day_extends_and_raises_longest() {
        let advance = StreakRecord::advance(Some(record(6, 6, day(2))), "hydration", day(3));
        assert_eq!(advance, StreakAdvance::Extended(record(7, 7, day(3))));
        assert!(advance.reached_milestone());
    }

    #[test]
    fn gap_resets_but_keeps_longest() {
        let advance = StreakRecord::advance(Some(record(12, 20, day(1))), "hydration", day(5));
        assert_eq!(advance, StreakAdvance::Started(record(1, 20, day(5))));
        assert!(!advance.reached_milestone());
    }

    #[test]
    fn ordinary_increment_is_not_a_milestone() {
        let advance = StreakRecord::advance(Some(record(3, 3, day(2))), "hydration", day(3));
        assert_eq!(advance.record().current_count, 4);
        assert!(!advance.reached_milestone());
        assert_eq!(advance.record().days_to_next_milestone(), Some(1));
    }
}
