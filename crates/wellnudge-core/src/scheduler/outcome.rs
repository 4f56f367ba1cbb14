use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::DeliveryError;
use crate::notification::{NotificationKind, NotificationSpec, Trigger};

/// Why a scheduling call registered nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    AuthorizationDenied,
    CategoryDisabled { category: String },
    /// Streak count outside the milestone set.
    BelowMilestone { count: u32 },
    /// The notification was handed to the operation for another kind.
    KindMismatch {
        expected: NotificationKind,
        actual: NotificationKind,
    },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AuthorizationDenied => write!(f, "notifications not authorized"),
            SkipReason::CategoryDisabled { category } => {
                write!(f, "category '{category}' is disabled")
            }
            SkipReason::BelowMilestone { count } => write!(f, "{count} is not a streak milestone"),
            SkipReason::KindMismatch { expected, actual } => {
                write!(f, "expected a {expected} notification, got {actual}")
            }
        }
    }
}

/// Result of a fire-and-forget scheduling call.
///
/// Nothing here is an error for the caller to handle: skips and failures
/// are already logged. The outcome exists for tests and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// At least one registration succeeded.
    Scheduled { identifiers: Vec<String> },
    Skipped(SkipReason),
    /// Every registration was rejected.
    Failed { errors: Vec<DeliveryError> },
}

impl ScheduleOutcome {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, ScheduleOutcome::Scheduled { .. })
    }

    pub fn identifiers(&self) -> &[String] {
        match self {
            ScheduleOutcome::Scheduled { identifiers } => identifiers,
            _ => &[],
        }
    }
}

/// A registration the scheduler made and the delivery service still knows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledRecord {
    pub identifier: String,
    pub spec: NotificationSpec,
    pub trigger: Trigger,
    pub registered_at: NaiveDateTime,
}
