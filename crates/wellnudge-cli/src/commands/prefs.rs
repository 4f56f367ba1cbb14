//! Notification preference commands.

use clap::Subcommand;
use std::collections::BTreeMap;
use std::sync::Arc;

use wellnudge_core::{Database, PreferenceGate, QuietWindow, TimeOfDay};

use super::CliResult;

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Show current preferences
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Enable a notification category (e.g. "goal_reminders", "marketing")
    Enable { category: String },
    /// Disable a notification category (e.g. "recommendation_Sleep")
    Disable { category: String },
    /// Set the preferred delivery time for a key
    Time {
        key: String,
        /// HH:MM
        time: TimeOfDay,
    },
    /// Add a quiet window; end before start wraps midnight
    QuietAdd {
        /// HH:MM
        start: TimeOfDay,
        /// HH:MM
        end: TimeOfDay,
    },
    /// Remove every quiet window
    QuietClear,
}

pub fn run(action: PrefsAction) -> CliResult {
    let gate = PreferenceGate::load(Arc::new(Database::open()?));

    match action {
        PrefsAction::Show { json } => {
            let prefs = gate.snapshot();
            if json {
                println!("{}", serde_json::to_string_pretty(&prefs)?);
                return Ok(());
            }
            println!("Categories:");
            if prefs.categories.is_empty() {
                println!("  (defaults: everything enabled except marketing)");
            }
            for (category, enabled) in &prefs.categories {
                println!("  {category:<28} {}", if *enabled { "on" } else { "off" });
            }
            println!("Preferred times:");
            for (key, time) in &prefs.preferred_times {
                println!("  {key:<28} {time}");
            }
            println!("Quiet windows:");
            for window in &prefs.quiet_windows {
                println!("  {} - {}", window.start, window.end);
            }
        }
        PrefsAction::Enable { category } => {
            gate.update(BTreeMap::from([(category.clone(), true)]));
            println!("{category} enabled");
        }
        PrefsAction::Disable { category } => {
            gate.update(BTreeMap::from([(category.clone(), false)]));
            println!("{category} disabled");
        }
        PrefsAction::Time { key, time } => {
            gate.update_preferred_time(&key, time);
            println!("{key} preferred at {time}");
        }
        PrefsAction::QuietAdd { start, end } => {
            let window = QuietWindow::new(start, end);
            gate.add_quiet_window(window);
            let note = if window.wraps_midnight() { " (overnight)" } else { "" };
            println!("quiet window {start} - {end}{note} added");
        }
        PrefsAction::QuietClear => {
            gate.set_quiet_windows(Vec::new());
            println!("quiet windows cleared");
        }
    }
    Ok(())
}
