//! Response-time history commands.

use chrono::Local;
use clap::Subcommand;
use std::sync::Arc;

use wellnudge_core::{Database, PersonalizationEngine};

use super::CliResult;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// Record an engaged response at an hour of today
    Record {
        /// Category key (e.g. "goal_reminders")
        key: String,
        /// Hour of day (0-23)
        hour: u32,
    },
    /// Show the hour-of-day histogram for a key
    Show { key: String },
}

pub fn run(action: HistoryAction) -> CliResult {
    let engine = PersonalizationEngine::load(Arc::new(Database::open()?));

    match action {
        HistoryAction::Record { key, hour } => {
            let at = Local::now()
                .date_naive()
                .and_hms_opt(hour, 0, 0)
                .ok_or_else(|| format!("Invalid hour: {hour}. Use 0-23"))?;
            engine.record_response(&key, at);
            println!("recorded {key} response at {hour:02}:00");
        }
        HistoryAction::Show { key } => {
            let history = engine.history();
            println!("{}", history.render_ascii_chart(&key));
            match history.peak_hour(&key) {
                Some(hour) => println!("\nPeak hour: {hour:02}:00"),
                None => println!("\nNo samples for {key} yet."),
            }
        }
    }
    Ok(())
}
