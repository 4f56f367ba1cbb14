//! Foreground presentation policy.

use crate::delivery::PresentationOptions;
use crate::notification::{NotificationContent, NotificationKind};
use crate::storage::PresentationConfig;

/// How a notification arriving while the app is active is shown.
///
/// Health alerts and high-priority recommendations interrupt fully; goal
/// and streak notifications skip the badge; the rest only land in the list.
pub fn presentation_for(content: &NotificationContent, config: &PresentationConfig) -> PresentationOptions {
    match content.kind() {
        Some(NotificationKind::HealthAlert) => PresentationOptions::FULL,
        Some(NotificationKind::Recommendation)
            if content.priority >= config.recommendation_full_priority =>
        {
            PresentationOptions::FULL
        }
        Some(NotificationKind::Goal | NotificationKind::Streak) => PresentationOptions::STANDARD,
        _ => PresentationOptions::LIST_ONLY,
    }
}
