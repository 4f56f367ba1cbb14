pub mod config;
pub mod history;
pub mod plan;
pub mod prefs;
pub mod streak;

use std::sync::Arc;

use wellnudge_core::{
    Clock, Config, Database, MemoryDeliveryCenter, NotificationScheduler, StaticAuthorization,
    SystemClock,
};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// A scheduler over the local store with an in-process delivery center.
///
/// The CLI has no platform notification center, so registrations only
/// live for the duration of the command.
pub fn local_scheduler(db: Arc<Database>) -> Result<NotificationScheduler, Box<dyn std::error::Error>> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    Ok(NotificationScheduler::new(
        db,
        Arc::new(MemoryDeliveryCenter::new(clock.clone())),
        Arc::new(StaticAuthorization::granted()),
        Config::load()?,
        clock,
    ))
}
