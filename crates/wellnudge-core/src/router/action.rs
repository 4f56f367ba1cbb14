use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::notification::NotificationKind;

/// Named action buttons, grouped by the kind that offers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationAction {
    CompleteGoal,
    SnoozeGoal,
    SkipGoal,
    AcceptRecommendation,
    DeclineRecommendation,
    ViewRecommendation,
    ViewHealth,
    ViewAchievement,
    StartSession,
    RescheduleSession,
    ViewStreak,
    Upgrade,
    ViewOffer,
}

impl NotificationAction {
    pub const ALL: [NotificationAction; 13] = [
        NotificationAction::CompleteGoal,
        NotificationAction::SnoozeGoal,
        NotificationAction::SkipGoal,
        NotificationAction::AcceptRecommendation,
        NotificationAction::DeclineRecommendation,
        NotificationAction::ViewRecommendation,
        NotificationAction::ViewHealth,
        NotificationAction::ViewAchievement,
        NotificationAction::StartSession,
        NotificationAction::RescheduleSession,
        NotificationAction::ViewStreak,
        NotificationAction::Upgrade,
        NotificationAction::ViewOffer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationAction::CompleteGoal => "COMPLETE_GOAL",
            NotificationAction::SnoozeGoal => "SNOOZE_GOAL",
            NotificationAction::SkipGoal => "SKIP_GOAL",
            NotificationAction::AcceptRecommendation => "ACCEPT_RECOMMENDATION",
            NotificationAction::DeclineRecommendation => "DECLINE_RECOMMENDATION",
            NotificationAction::ViewRecommendation => "VIEW_RECOMMENDATION",
            NotificationAction::ViewHealth => "VIEW_HEALTH",
            NotificationAction::ViewAchievement => "VIEW_ACHIEVEMENT",
            NotificationAction::StartSession => "START_SESSION",
            NotificationAction::RescheduleSession => "RESCHEDULE_SESSION",
            NotificationAction::ViewStreak => "VIEW_STREAK",
            NotificationAction::Upgrade => "UPGRADE",
            NotificationAction::ViewOffer => "VIEW_OFFER",
        }
    }

    /// The kind whose action set contains this action.
    pub fn kind(self) -> NotificationKind {
        match self {
            NotificationAction::CompleteGoal
            | NotificationAction::SnoozeGoal
            | NotificationAction::SkipGoal => NotificationKind::Goal,
            NotificationAction::AcceptRecommendation
            | NotificationAction::DeclineRecommendation
            | NotificationAction::ViewRecommendation => NotificationKind::Recommendation,
            NotificationAction::ViewHealth => NotificationKind::HealthAlert,
            NotificationAction::ViewAchievement => NotificationKind::Achievement,
            NotificationAction::StartSession | NotificationAction::RescheduleSession => {
                NotificationKind::Session
            }
            NotificationAction::ViewStreak => NotificationKind::Streak,
            NotificationAction::Upgrade | NotificationAction::ViewOffer => {
                NotificationKind::PremiumOffer
            }
        }
    }

    /// Actions offered on a `kind` notification.
    pub fn for_kind(kind: NotificationKind) -> Vec<NotificationAction> {
        Self::ALL.into_iter().filter(|a| a.kind() == kind).collect()
    }
}

impl fmt::Display for NotificationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown action identifier: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_offers_at_least_one_action() {
        for kind in NotificationKind::ALL {
            assert!(!NotificationAction::for_kind(kind).is_empty(), "{kind}");
        }
        assert_eq!(NotificationAction::for_kind(NotificationKind::Goal).len(), 3);
    }

    #[test]
    fn parses_wire_identifiers() {
        assert_eq!(
            "SNOOZE_GOAL".parse::<NotificationAction>(),
            Ok(NotificationAction::SnoozeGoal)
        );
        assert!("snooze_goal".parse::<NotificationAction>().is_err());
        let json = serde_json::to_string(&NotificationAction::ViewOffer).unwrap();
        assert_eq!(json, "\"VIEW_OFFER\"");
    }
}
