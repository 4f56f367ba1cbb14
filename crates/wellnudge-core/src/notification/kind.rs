use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The seven notification classes the engine schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Goal,
    Recommendation,
    HealthAlert,
    Achievement,
    Session,
    Streak,
    PremiumOffer,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 7] = [
        NotificationKind::Goal,
        NotificationKind::Recommendation,
        NotificationKind::HealthAlert,
        NotificationKind::Achievement,
        NotificationKind::Session,
        NotificationKind::Streak,
        NotificationKind::PremiumOffer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Goal => "goal",
            NotificationKind::Recommendation => "recommendation",
            NotificationKind::HealthAlert => "health_alert",
            NotificationKind::Achievement => "achievement",
            NotificationKind::Session => "session",
            NotificationKind::Streak => "streak",
            NotificationKind::PremiumOffer => "premium_offer",
        }
    }

    /// Action set identifier attached to delivered content.
    pub fn action_category(self) -> &'static str {
        match self {
            NotificationKind::Goal => "GOAL_ACTIONS",
            NotificationKind::Recommendation => "RECOMMENDATION_ACTIONS",
            NotificationKind::HealthAlert => "HEALTH_ALERT_ACTIONS",
            NotificationKind::Achievement => "ACHIEVEMENT_ACTIONS",
            NotificationKind::Session => "SESSION_ACTIONS",
            NotificationKind::Streak => "STREAK_ACTIONS",
            NotificationKind::PremiumOffer => "PREMIUM_OFFER_ACTIONS",
        }
    }

    /// Kinds delivered after a short fixed delay instead of a computed time.
    pub fn is_immediate(self) -> bool {
        matches!(
            self,
            NotificationKind::HealthAlert | NotificationKind::Achievement | NotificationKind::Streak
        )
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown notification kind: {s}"))
    }
}
