//! Per-category notification preferences.
//!
//! Loaded once from the store at startup and cached. Updates merge into the
//! cache and are written back; they only affect scheduling calls made
//! afterwards.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::quiet_hours::{QuietHoursResolver, QuietWindow};
use crate::clock::TimeOfDay;
use crate::notification::MARKETING_CATEGORY;
use crate::storage::Database;

/// User-owned notification preferences.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Category key -> enabled. Missing keys use [`Preferences::default_enabled`].
    #[serde(default)]
    pub categories: BTreeMap<String, bool>,
    /// Preference key -> preferred delivery time.
    #[serde(default)]
    pub preferred_times: BTreeMap<String, TimeOfDay>,
    #[serde(default)]
    pub quiet_windows: Vec<QuietWindow>,
}

impl Preferences {
    /// Everything is opt-out except marketing, which is opt-in.
    pub fn default_enabled(category_key: &str) -> bool {
        category_key != MARKETING_CATEGORY
    }

    pub fn is_enabled(&self, category_key: &str) -> bool {
        self.categories
            .get(category_key)
            .copied()
            .unwrap_or_else(|| Self::default_enabled(category_key))
    }
}

/// Preference lookup shared by the scheduler and the CLI.
pub struct PreferenceGate {
    db: Arc<Database>,
    prefs: RwLock<Preferences>,
}

impl PreferenceGate {
    /// Load preferences from the store, falling back to defaults.
    pub fn load(db: Arc<Database>) -> Self {
        let prefs = match db.load_preferences() {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Preferences::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load preferences, using defaults");
                Preferences::default()
            }
        };
        Self {
            db,
            prefs: RwLock::new(prefs),
        }
    }

    pub fn is_enabled(&self, category_key: &str) -> bool {
        self.prefs.read().is_enabled(category_key)
    }

    pub fn preferred_time(&self, key: &str) -> Option<TimeOfDay> {
        self.prefs.read().preferred_times.get(key).copied()
    }

    pub fn quiet_resolver(&self) -> QuietHoursResolver {
        QuietHoursResolver::new(self.prefs.read().quiet_windows.clone())
    }

    pub fn snapshot(&self) -> Preferences {
        self.prefs.read().clone()
    }

    /// Merge category toggles.
    pub fn update(&self, changes: BTreeMap<String, bool>) {
        self.mutate(|prefs| prefs.categories.extend(changes));
    }

    pub fn update_preferred_time(&self, key: &str, time: TimeOfDay) {
        self.mutate(|prefs| {
            prefs.preferred_times.insert(key.to_string(), time);
        });
    }

    pub fn add_quiet_window(&self, window: QuietWindow) {
        self.mutate(|prefs| prefs.quiet_windows.push(window));
    }

    pub fn set_quiet_windows(&self, windows: Vec<QuietWindow>) {
        self.mutate(|prefs| prefs.quiet_windows = windows);
    }

    fn mutate(&self, apply: impl FnOnce(&mut Preferences)) {
        let snapshot = {
            let mut prefs = self.prefs.write();
            apply(&mut prefs);
            prefs.clone()
        };
        if let Err(e) = self.db.save_preferences(&snapshot) {
            tracing::error!(error = %e, "failed to persist preferences");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marketing_is_opt_in() {
        let prefs = Preferences::default();
        assert!(prefs.is_enabled("goal_reminders"));
        assert!(!prefs.is_enabled("marketing"));
    }

    #[test]
    fn updates_merge_and_persist() {
        let db = Arc::new(Database::open_memory().unwrap());
        let gate = PreferenceGate::load(db.clone());

        let mut changes = BTreeMap::new();
        changes.insert("recommendation_Sleep".to_string(), false);
        changes.insert("marketing".to_string(), true);
        gate.update(changes);
        gate.update_preferred_time("goal_reminders", TimeOfDay::new(9, 0).unwrap());

        assert!(!gate.is_enabled("recommendation_Sleep"));
        assert!(gate.is_enabled("marketing"));

        let reloaded = PreferenceGate::load(db);
        assert!(!reloaded.is_enabled("recommendation_Sleep"));
        assert_eq!(
            reloaded.preferred_time("goal_reminders"),
            Some(TimeOfDay::new(9, 0).unwrap())
        );
    }

    #[test]
    fn quiet_windows_feed_the_resolver() {
        let gate = PreferenceGate::load(Arc::new(Database::open_memory().unwrap()));
        gate.add_quiet_window(QuietWindow::new(
            "22:00".parse().unwrap(),
            "07:00".parse().unwrap(),
        ));
        assert_eq!(gate.quiet_resolver().windows().len(), 1);
        gate.set_quiet_windows(Vec::new());
        assert!(gate.quiet_resolver().windows().is_empty());
    }
}
