//! Response-time personalization.
//!
//! Every engaged response to a notification records the hour of day it
//! happened, keyed by the notification's category. The most frequent hour
//! becomes the preferred delivery hour for that key.

use chrono::{Days, Duration, NaiveDateTime, NaiveTime, Timelike};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::clock::{self, TimeOfDay};
use crate::storage::Database;

/// Append-only hour-of-day samples per key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePatternHistory {
    samples: BTreeMap<String, Vec<u8>>,
}

impl ResponsePatternHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: BTreeMap<String, Vec<u8>>) -> Self {
        Self { samples }
    }

    /// Record a sample. Hours outside 0..=23 are ignored.
    pub fn record(&mut self, key: &str, hour: u8) {
        if hour > 23 {
            return;
        }
        self.samples.entry(key.to_string()).or_default().push(hour);
    }

    pub fn samples(&self, key: &str) -> &[u8] {
        self.samples.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.samples.keys().map(String::as_str)
    }

    /// Sample count per hour of day.
    pub fn histogram(&self, key: &str) -> [u64; 24] {
        let mut counts = [0u64; 24];
        for &hour in self.samples(key) {
            if let Some(count) = counts.get_mut(hour as usize) {
                *count += 1;
            }
        }
        counts
    }

    /// Hour with the most samples; ties go to the earliest hour.
    pub fn peak_hour(&self, key: &str) -> Option<u32> {
        let counts = self.histogram(key);
        let (hour, &count) = counts
            .iter()
            .enumerate()
            // max_by_key keeps the last maximum, so compare reversed hours
            .max_by_key(|(hour, count)| (**count, std::cmp::Reverse(*hour)))?;
        (count > 0).then_some(hour as u32)
    }

    /// Render a key's histogram as an ASCII chart.
    pub fn render_ascii_chart(&self, key: &str) -> String {
        let counts = self.histogram(key);
        let max = counts.iter().copied().max().unwrap_or(0).max(1);
        let mut output = format!("\n{} response hours:\n", key);
        output.push_str(&"─".repeat(44));
        output.push('\n');

        for (hour, &count) in counts.iter().enumerate() {
            let bar_length = (count * 30 / max) as usize;
            output.push_str(&format!(
                "{:02}:00 {}{} {}\n",
                hour,
                "█".repeat(bar_length),
                " ".repeat(30 - bar_length),
                count
            ));
        }
        output.push_str(&"─".repeat(44));
        output.push('\n');
        output
    }
}

/// Infers delivery times from the response history.
pub struct PersonalizationEngine {
    db: Arc<Database>,
    history: RwLock<ResponsePatternHistory>,
}

impl PersonalizationEngine {
    /// Load the full history from the store.
    pub fn load(db: Arc<Database>) -> Self {
        let history = match db.load_response_history() {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!(error = %e, "failed to load response history, starting empty");
                ResponsePatternHistory::new()
            }
        };
        Self {
            db,
            history: RwLock::new(history),
        }
    }

    /// Record that the user engaged with a `key` notification at `at`.
    pub fn record_response(&self, key: &str, at: NaiveDateTime) {
        let hour = at.hour() as u8;
        self.history.write().record(key, hour);
        if let Err(e) = self.db.insert_response_sample(key, hour, at) {
            tracing::error!(key, error = %e, "failed to persist response sample");
        }
    }

    pub fn history(&self) -> ResponsePatternHistory {
        self.history.read().clone()
    }

    /// Optimal delivery time for `key`, before quiet-hours adjustment.
    ///
    /// Learned peak hour first, then the configured preferred time, then
    /// `now + fallback_offset`.
    pub fn optimal_time(
        &self,
        key: &str,
        preferred: Option<TimeOfDay>,
        now: NaiveDateTime,
        fallback_offset: Duration,
    ) -> NaiveDateTime {
        let learned = self.history.read().peak_hour(key);
        if let Some(hour) = learned {
            let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
            return next_occurrence(now, time);
        }
        if let Some(preferred) = preferred {
            return next_occurrence(now, preferred.to_naive_time());
        }
        clock::after(now, fallback_offset)
    }
}

/// Today at `time`, or tomorrow when that moment is not in the future.
pub fn next_occurrence(now: NaiveDateTime, time: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today.checked_add_days(Days::new(1)).unwrap_or(today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 6, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn engine() -> PersonalizationEngine {
        PersonalizationEngine::load(Arc::new(Database::open_memory().unwrap()))
    }

    #[test]
    fn peak_hour_ties_break_to_earliest() {
        let mut history = ResponsePatternHistory::new();
        for hour in [20, 8, 20, 8, 13] {
            history.record("goal_reminders", hour);
        }
        assert_eq!(history.peak_hour("goal_reminders"), Some(8));
        assert_eq!(history.peak_hour("unknown"), None);
    }

    #[test]
    fn out_of_range_hours_are_dropped() {
        let mut history = ResponsePatternHistory::new();
        history.record("k", 24);
        assert!(history.samples("k").is_empty());
    }

    #[test]
    fn learned_hour_wins_over_preference() {
        let engine = engine();
        engine.record_response("goal_reminders", at(18, 40));
        engine.record_response("goal_reminders", at(18, 5));
        let t = engine.optimal_time(
            "goal_reminders",
            TimeOfDay::new(9, 0).ok(),
            at(10, 0),
            Duration::hours(1),
        );
        assert_eq!(t, at(18, 0));
    }

    #[test]
    fn learned_hour_already_past_rolls_to_tomorrow() {
        let engine = engine();
        engine.record_response("k", at(7, 15));
        let t = engine.optimal_time("k", None, at(10, 0), Duration::hours(1));
        assert_eq!(t, at(7, 0) + Duration::days(1));
    }

    #[test]
    fn empty_history_uses_preferred_time() {
        let engine = engine();
        let nine = TimeOfDay::new(9, 0).ok();
        assert_eq!(
            engine.optimal_time("k", nine, at(6, 0), Duration::hours(1)),
            at(9, 0)
        );
        assert_eq!(
            engine.optimal_time("k", nine, at(9, 30), Duration::hours(1)),
            at(9, 0) + Duration::days(1)
        );
    }

    #[test]
    fn empty_history_without_preference_is_an_hour_out() {
        let engine = engine();
        assert_eq!(
            engine.optimal_time("k", None, at(14, 20), Duration::hours(1)),
            at(15, 20)
        );
    }

    #[test]
    fn samples_survive_reload() {
        let db = Arc::new(Database::open_memory().unwrap());
        PersonalizationEngine::load(db.clone()).record_response("sessions", at(21, 0));
        let reloaded = PersonalizationEngine::load(db);
        assert_eq!(reloaded.history().samples("sessions"), &[21]);
    }

    #[test]
    fn chart_lists_every_hour() {
        let mut history = ResponsePatternHistory::new();
        history.record("k", 9);
        let chart = history.render_ascii_chart("k");
        assert!(chart.contains("09:00"));
        assert!(chart.contains("23:00"));
    }
}
