//! Quiet hours - do-not-disturb windows that defer delivery.
//!
//! A window runs from `start` up to (not including) `end`. When `end` is
//! earlier than `start` the window wraps midnight, e.g. 22:00 - 07:00.
//! A candidate time inside a window is moved to the window's end, on the
//! next calendar day when the end has already passed today.

use chrono::{Days, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::clock::{minute_of_day, TimeOfDay};

/// A recurring daily do-not-disturb range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuietWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl QuietWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { start, end }
    }

    /// Overnight window (e.g., 22:00 - 07:00)
    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Whether the minute of day falls inside this window.
    pub fn contains_minute(&self, minute: u32) -> bool {
        let start = self.start.minute_of_day();
        let end = self.end.minute_of_day();

        if self.wraps_midnight() {
            return minute >= start || minute < end;
        }

        // Daytime window (e.g., 12:00 - 17:00)
        minute >= start && minute < end
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        self.contains_minute(minute_of_day(time))
    }

    /// Move `time` to the end of this window.
    fn exit(&self, time: NaiveDateTime) -> NaiveDateTime {
        let exit = self.end.on(time.date());
        if self.end.minute_of_day() < minute_of_day(time) {
            exit.checked_add_days(Days::new(1)).unwrap_or(exit)
        } else {
            exit
        }
    }
}

/// Shifts candidate delivery times out of the configured quiet windows.
#[derive(Debug, Clone, Default)]
pub struct QuietHoursResolver {
    windows: Vec<QuietWindow>,
}

impl QuietHoursResolver {
    pub fn new(windows: Vec<QuietWindow>) -> Self {
        Self { windows }
    }

    pub fn windows(&self) -> &[QuietWindow] {
        &self.windows
    }

    /// Check if a given time is within any quiet window.
    pub fn is_quiet(&self, time: NaiveDateTime) -> bool {
        self.windows.iter().any(|w| w.contains(time))
    }

    /// Return the earliest time at or after `candidate` outside every window.
    ///
    /// Overlapping or back-to-back windows are chained; the loop is bounded
    /// by the window count since each pass leaves one window for good.
    pub fn resolve(&self, candidate: NaiveDateTime) -> NaiveDateTime {
        let mut current = candidate;
        for _ in 0..=self.windows.len() {
            match self.windows.iter().find(|w| w.contains(current)) {
                Some(window) => current = window.exit(current),
                None => return current,
            }
        }
        current
    }
}
