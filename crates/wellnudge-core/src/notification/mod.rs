//! Notification model: kinds, payloads, specs and the requests handed to
//! the delivery service.

mod kind;
pub mod metadata;
pub mod payload;
mod trigger;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use kind::NotificationKind;
pub use metadata::MetadataError;
pub use payload::{
    AchievementPayload, GoalPayload, HealthAlertPayload, NotificationPayload, PremiumOfferPayload,
    RecommendationCategory, RecommendationPayload, SessionPayload, StreakPayload,
};
pub use trigger::Trigger;

/// Preference category that is opt-in rather than opt-out.
pub const MARKETING_CATEGORY: &str = "marketing";

/// Deterministic identifier for a notification about `subject_id`.
///
/// Expanded recurrences append their rule suffix so each rule can be
/// cancelled on its own.
pub fn notification_id(kind: NotificationKind, subject_id: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}_{}_{}", kind.as_str(), subject_id, suffix),
        None => format!("{}_{}", kind.as_str(), subject_id),
    }
}

/// A single scheduling request built by calling code.
///
/// Immutable once built; the scheduler consumes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSpec {
    payload: NotificationPayload,
    title: String,
    body: String,
    category_key: String,
    trigger_at: Option<NaiveDateTime>,
    priority: u8,
    metadata: BTreeMap<String, String>,
}

impl NotificationSpec {
    pub fn new(payload: NotificationPayload, title: impl Into<String>, body: impl Into<String>) -> Self {
        let priority = match &payload {
            NotificationPayload::Recommendation(p) => p.priority,
            NotificationPayload::HealthAlert(_) => 4,
            _ => 2,
        };
        Self {
            category_key: payload.category_key(),
            metadata: metadata::encode(&payload),
            payload,
            title: title.into(),
            body: body.into(),
            trigger_at: None,
            priority,
        }
    }

    /// Congratulation for reaching a `count`-day streak in `category`.
    pub fn streak_milestone(category: &str, count: u32) -> Self {
        Self::new(
            NotificationPayload::Streak(StreakPayload {
                category: category.to_string(),
                count,
            }),
            format!("{count}-day streak!"),
            format!("You've kept up your {category} goals for {count} days in a row."),
        )
    }

    /// Pin the delivery to an explicit local time.
    pub fn at(mut self, trigger_at: NaiveDateTime) -> Self {
        self.trigger_at = Some(trigger_at);
        self
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Attach an extra metadata entry. Payload-derived keys cannot be overridden.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if !self.metadata.contains_key(&key) {
            self.metadata.insert(key, value.into());
        }
        self
    }

    pub fn kind(&self) -> NotificationKind {
        self.payload.kind()
    }

    pub fn subject_id(&self) -> &str {
        self.payload.subject_id()
    }

    pub fn payload(&self) -> &NotificationPayload {
        &self.payload
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn category_key(&self) -> &str {
        &self.category_key
    }

    pub fn trigger_at(&self) -> Option<NaiveDateTime> {
        self.trigger_at
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    pub fn content(&self) -> NotificationContent {
        NotificationContent {
            title: self.title.clone(),
            body: self.body.clone(),
            action_category: self.kind().action_category().to_string(),
            priority: self.priority,
            metadata: self.metadata.clone(),
        }
    }

    /// Rebuild a spec from content the delivery service handed back.
    pub fn from_content(content: &NotificationContent) -> Result<Self, MetadataError> {
        let payload = metadata::decode(&content.metadata)?;
        Ok(Self {
            category_key: payload.category_key(),
            payload,
            title: content.title.clone(),
            body: content.body.clone(),
            trigger_at: None,
            priority: content.priority,
            metadata: content.metadata.clone(),
        })
    }
}

/// What the user sees, plus the metadata routed back on response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub action_category: String,
    pub priority: u8,
    pub metadata: BTreeMap<String, String>,
}

impl NotificationContent {
    pub fn kind(&self) -> Option<NotificationKind> {
        self.metadata.get(metadata::KIND)?.parse().ok()
    }

    pub fn category_key(&self) -> Option<&str> {
        self.metadata.get(metadata::CATEGORY).map(String::as_str)
    }
}

/// A registration as the delivery service stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub identifier: String,
    pub content: NotificationContent,
    pub trigger: Trigger,
}

/// A request the delivery service has already shown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveredNotification {
    pub request: NotificationRequest,
    pub delivered_at: NaiveDateTime,
}

impl DeliveredNotification {
    pub fn identifier(&self) -> &str {
        &self.request.identifier
    }

    pub fn content(&self) -> &NotificationContent {
        &self.request.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_spec() -> NotificationSpec {
        NotificationSpec::new(
            NotificationPayload::Goal(GoalPayload {
                goal_id: "walk".into(),
                category: "fitness".into(),
            }),
            "Evening walk",
            "Time for your 20 minute walk",
        )
    }

    #[test]
    fn identifiers_are_deterministic() {
        assert_eq!(notification_id(NotificationKind::Goal, "walk", None), "goal_walk");
        assert_eq!(
            notification_id(NotificationKind::Goal, "walk", Some("mon")),
            "goal_walk_mon"
        );
    }

    #[test]
    fn spec_metadata_cannot_shadow_payload_keys() {
        let spec = goal_spec()
            .with_metadata(metadata::SUBJECT_ID, "other")
            .with_metadata("source", "onboarding");
        assert_eq!(spec.metadata().get(metadata::SUBJECT_ID).unwrap(), "walk");
        assert_eq!(spec.metadata().get("source").unwrap(), "onboarding");
    }

    #[test]
    fn spec_rebuilds_from_content() {
        let spec = goal_spec();
        let rebuilt = NotificationSpec::from_content(&spec.content()).unwrap();
        assert_eq!(rebuilt, spec);
        assert_eq!(spec.content().kind(), Some(NotificationKind::Goal));
        assert_eq!(spec.content().category_key(), Some("goal_reminders"));
    }
}
