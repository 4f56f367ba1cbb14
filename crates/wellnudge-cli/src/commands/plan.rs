//! Delivery time planning commands.

use chrono::{Local, Weekday};
use clap::Subcommand;
use std::sync::Arc;

use wellnudge_core::recurrence;
use wellnudge_core::{Database, Frequency, TimeOfDay, Trigger};

use super::{local_scheduler, CliResult};

#[derive(Subcommand)]
pub enum PlanAction {
    /// Show the personalized, quiet-hours adjusted delivery time for a key
    Optimal {
        /// Category key (e.g. "goal_reminders", "recommendation_Sleep")
        key: String,
    },
    /// Show the delivery rules a recurring reminder expands into
    Recurrence {
        /// daily, weekdays, weekends, weekly, monthly or custom
        frequency: Frequency,
        /// HH:MM
        time: TimeOfDay,
        /// Weekday for weekly reminders (default mon)
        #[arg(long)]
        weekday: Option<String>,
        /// Day of month for monthly reminders (default 1)
        #[arg(long)]
        day: Option<u32>,
    },
}

pub fn run(action: PlanAction) -> CliResult {
    match action {
        PlanAction::Optimal { key } => show_optimal(&key),
        PlanAction::Recurrence {
            frequency,
            time,
            weekday,
            day,
        } => show_recurrence(frequency, time, weekday, day),
    }
}

fn show_optimal(key: &str) -> CliResult {
    let scheduler = local_scheduler(Arc::new(Database::open()?))?;
    let at = scheduler.optimal_time_for(key);

    let source = match scheduler.personalization().history().peak_hour(key) {
        Some(hour) => format!("learned peak hour {hour:02}:00"),
        None => match scheduler.preferences().preferred_time(key) {
            Some(time) => format!("preferred time {time}"),
            None => "no history or preferred time".to_string(),
        },
    };

    println!("{}", at.format("%Y-%m-%d %H:%M"));
    println!("  based on: {source}");
    if scheduler.preferences().quiet_resolver().windows().is_empty() {
        println!("  quiet hours: none");
    }
    Ok(())
}

fn parse_weekday(raw: &str) -> Result<Weekday, String> {
    raw.parse::<Weekday>()
        .map_err(|_| format!("Invalid weekday: '{raw}'. Use mon/tue/wed/thu/fri/sat/sun"))
}

fn show_recurrence(
    frequency: Frequency,
    time: TimeOfDay,
    weekday: Option<String>,
    day: Option<u32>,
) -> CliResult {
    let frequency = match frequency {
        Frequency::Weekly { .. } => Frequency::weekly(weekday.as_deref().map(parse_weekday).transpose()?),
        Frequency::Monthly { .. } => Frequency::monthly(day)?,
        other => other,
    };

    let now = Local::now().naive_local();
    let rules = recurrence::expand(frequency, time, now);
    println!("{frequency} at {time}: {} rule(s)", rules.len());
    for rule in rules {
        let when = match rule.trigger {
            Trigger::At { at } => format!("once at {}", at.format("%Y-%m-%d %H:%M")),
            Trigger::Daily { time } => format!("every day at {}", time.format("%H:%M")),
            Trigger::Weekly { weekday, time } => {
                format!("every {weekday} at {}", time.format("%H:%M"))
            }
            Trigger::Monthly { day, time } => {
                format!("day {day} of every month at {}", time.format("%H:%M"))
            }
        };
        let next = rule
            .trigger
            .next_fire_after(now)
            .map_or_else(|| "never".to_string(), |at| at.format("%Y-%m-%d %H:%M").to_string());
        println!("  {:<12} {when} (next {next})", rule.suffix);
    }
    Ok(())
}
