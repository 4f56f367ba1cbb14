//! # Wellnudge Core Library
//!
//! This library provides the notification engine behind the Wellnudge
//! wellness app: deciding whether, when and how to remind the user about
//! goals, recommendations, health alerts, achievements, audio sessions,
//! streaks and offers, and reacting to what the user does with them.
//!
//! ## Architecture
//!
//! - **Scheduler**: one fire-and-forget operation per notification kind,
//!   gated by authorization and per-category preferences
//! - **Personalization**: learns the hour of day the user responds at and
//!   schedules around it, shifted out of quiet hours
//! - **Router**: the delivery service's callback target; applies the
//!   domain effect of a response and broadcasts an [`AppEvent`]
//! - **Storage**: SQLite-backed state and TOML-based configuration
//!
//! ## Key Components
//!
//! - [`NotificationEngine`]: wires everything together
//! - [`NotificationScheduler`]: scheduling, cancellation and queries
//! - [`ResponseRouter`]: response handling and presentation policy
//! - [`DeliveryService`]: trait for the platform notification center
//! - [`Database`]: persistence
//! - [`Config`]: engine tunables

pub mod clock;
pub mod delivery;
pub mod engine;
pub mod error;
pub mod events;
pub mod gate;
pub mod notification;
pub mod personalization;
pub mod recurrence;
pub mod router;
pub mod scheduler;
pub mod storage;
pub mod streak;

pub use clock::{Clock, FixedClock, SystemClock, TimeOfDay};
pub use delivery::{
    AuthorizationProvider, DeliveryService, MemoryDeliveryCenter, NotificationHandler,
    NotificationResponse, PresentationOptions, ResponseAction, StaticAuthorization,
};
pub use engine::NotificationEngine;
pub use error::{ConfigError, CoreError, DatabaseError, DeliveryError, ValidationError};
pub use events::AppEvent;
pub use gate::{PreferenceGate, Preferences, QuietHoursResolver, QuietWindow};
pub use notification::{NotificationKind, NotificationPayload, NotificationSpec, Trigger};
pub use personalization::{PersonalizationEngine, ResponsePatternHistory};
pub use recurrence::{Frequency, RecurrenceRule};
pub use router::{NotificationAction, NotificationState, ResponseRouter};
pub use scheduler::{NotificationScheduler, ScheduleOutcome, ScheduledRecord, SkipReason};
pub use storage::{Config, Database};
pub use streak::{StreakAdvance, StreakRecord, StreakUpdater};
