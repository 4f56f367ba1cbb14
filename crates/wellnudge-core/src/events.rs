use serde::{Deserialize, Serialize};

/// Every handled notification response produces an AppEvent.
/// The UI layer subscribes to them through the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppEvent {
    GoalCompleted { goal_id: String },
    GoalSkipped { goal_id: String },
    OpenGoalDetails { goal_id: String },
    RecommendationAccepted { recommendation_id: String },
    RecommendationDeclined { recommendation_id: String },
    OpenRecommendationDetails { recommendation_id: String },
    OpenHealthDetails { alert_id: String },
    OpenAchievementDetails { achievement_id: String },
    StartAudioSession { session_id: String },
    /// The session reminder was pushed back by the snooze interval.
    RescheduleAudioSession { session_id: String },
    OpenAudioSessionDetails { session_id: String },
    /// Carries the streak's category.
    OpenStreakDetails { category: String },
    OpenSubscriptionUI { offer_id: String },
    OpenPremiumOfferDetails { offer_id: String },
}

impl AppEvent {
    /// Identifier of the goal, recommendation, session etc. the event is about.
    pub fn subject_id(&self) -> &str {
        match self {
            AppEvent::GoalCompleted { goal_id }
            | AppEvent::GoalSkipped { goal_id }
            | AppEvent::OpenGoalDetails { goal_id } => goal_id,
            AppEvent::RecommendationAccepted { recommendation_id }
            | AppEvent::RecommendationDeclined { recommendation_id }
            | AppEvent::OpenRecommendationDetails { recommendation_id } => recommendation_id,
            AppEvent::OpenHealthDetails { alert_id } => alert_id,
            AppEvent::OpenAchievementDetails { achievement_id } => achievement_id,
            AppEvent::StartAudioSession { session_id }
            | AppEvent::RescheduleAudioSession { session_id }
            | AppEvent::OpenAudioSessionDetails { session_id } => session_id,
            AppEvent::OpenStreakDetails { category } => category,
            AppEvent::OpenSubscriptionUI { offer_id }
            | AppEvent::OpenPremiumOfferDetails { offer_id } => offer_id,
        }
    }
}
