//! Per-kind payloads carried by a [`NotificationSpec`](super::NotificationSpec).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::NotificationKind;

/// Wellness domain a recommendation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationCategory {
    Sleep,
    Nutrition,
    Exercise,
    Mindfulness,
    Hydration,
    Stress,
}

impl RecommendationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            RecommendationCategory::Sleep => "Sleep",
            RecommendationCategory::Nutrition => "Nutrition",
            RecommendationCategory::Exercise => "Exercise",
            RecommendationCategory::Mindfulness => "Mindfulness",
            RecommendationCategory::Hydration => "Hydration",
            RecommendationCategory::Stress => "Stress",
        }
    }
}

impl fmt::Display for RecommendationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecommendationCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sleep" => Ok(RecommendationCategory::Sleep),
            "nutrition" => Ok(RecommendationCategory::Nutrition),
            "exercise" => Ok(RecommendationCategory::Exercise),
            "mindfulness" => Ok(RecommendationCategory::Mindfulness),
            "hydration" => Ok(RecommendationCategory::Hydration),
            "stress" => Ok(RecommendationCategory::Stress),
            _ => Err(format!("unknown recommendation category: {s}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalPayload {
    pub goal_id: String,
    /// Goal category, also the streak category on completion.
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationPayload {
    pub recommendation_id: String,
    pub category: RecommendationCategory,
    /// 1 (lowest) to 5 (highest).
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlertPayload {
    pub alert_id: String,
    /// Metric that triggered the alert, e.g. "heart_rate".
    pub metric: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementPayload {
    pub achievement_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub session_id: String,
    /// When the audio session is planned to start.
    pub starts_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreakPayload {
    pub category: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PremiumOfferPayload {
    pub offer_id: String,
    pub discount_percent: Option<u8>,
}

/// Closed union of payloads, one variant per [`NotificationKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    Goal(GoalPayload),
    Recommendation(RecommendationPayload),
    HealthAlert(HealthAlertPayload),
    Achievement(AchievementPayload),
    Session(SessionPayload),
    Streak(StreakPayload),
    PremiumOffer(PremiumOfferPayload),
}

impl NotificationPayload {
    pub fn kind(&self) -> NotificationKind {
        match self {
            NotificationPayload::Goal(_) => NotificationKind::Goal,
            NotificationPayload::Recommendation(_) => NotificationKind::Recommendation,
            NotificationPayload::HealthAlert(_) => NotificationKind::HealthAlert,
            NotificationPayload::Achievement(_) => NotificationKind::Achievement,
            NotificationPayload::Session(_) => NotificationKind::Session,
            NotificationPayload::Streak(_) => NotificationKind::Streak,
            NotificationPayload::PremiumOffer(_) => NotificationKind::PremiumOffer,
        }
    }

    /// Identifier of the domain object the notification is about.
    pub fn subject_id(&self) -> &str {
        match self {
            NotificationPayload::Goal(p) => &p.goal_id,
            NotificationPayload::Recommendation(p) => &p.recommendation_id,
            NotificationPayload::HealthAlert(p) => &p.alert_id,
            NotificationPayload::Achievement(p) => &p.achievement_id,
            NotificationPayload::Session(p) => &p.session_id,
            NotificationPayload::Streak(p) => &p.category,
            NotificationPayload::PremiumOffer(p) => &p.offer_id,
        }
    }

    /// Preference category gating this payload.
    pub fn category_key(&self) -> String {
        match self {
            NotificationPayload::Goal(_) => "goal_reminders".to_string(),
            NotificationPayload::Recommendation(p) => format!("recommendation_{}", p.category),
            NotificationPayload::HealthAlert(_) => "health_alerts".to_string(),
            NotificationPayload::Achievement(_) => "achievements".to_string(),
            NotificationPayload::Session(_) => "audio_sessions".to_string(),
            NotificationPayload::Streak(_) => "streaks".to_string(),
            NotificationPayload::PremiumOffer(_) => super::MARKETING_CATEGORY.to_string(),
        }
    }
}
