use chrono::Local;
use clap::Subcommand;
use std::sync::Arc;

use wellnudge_core::{Database, StreakAdvance, StreakRecord, StreakUpdater};

use super::{local_scheduler, CliResult};

#[derive(Subcommand)]
pub enum StreakAction {
    /// Show streaks, optionally for one category
    Show {
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a goal completion today
    Complete { category: String },
}

pub async fn run(action: StreakAction) -> CliResult {
    let db = Arc::new(Database::open()?);

    match action {
        StreakAction::Show { category, json } => {
            let streaks = match category {
                Some(category) => db.streak(&category)?.into_iter().collect(),
                None => db.streaks()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&streaks)?);
            } else if streaks.is_empty() {
                println!("No streaks yet.");
            } else {
                streaks.iter().for_each(print_streak);
            }
        }
        StreakAction::Complete { category } => {
            let scheduler = local_scheduler(db.clone())?;
            let today = Local::now().date_naive();
            let advance = StreakUpdater::new(db)
                .record_completion(&category, today, &scheduler)
                .await?;

            match &advance {
                StreakAdvance::Unchanged(_) => println!("Already counted today."),
                StreakAdvance::Extended(_) => println!("Streak extended!"),
                StreakAdvance::Started(_) => println!("Streak started."),
            }
            print_streak(advance.record());
            if advance.reached_milestone() {
                println!(
                    "  Milestone reached: {} days (notification due)",
                    advance.record().current_count
                );
            }
        }
    }
    Ok(())
}

fn print_streak(record: &StreakRecord) {
    println!(
        "{}: {} day(s), longest {}, last {}",
        record.category, record.current_count, record.longest_count, record.last_updated
    );
    if let Some(days) = record.days_to_next_milestone() {
        println!("  next milestone in {days} day(s)");
    }
}
