//! String-keyed metadata carried through the delivery service.
//!
//! The delivery service only round-trips strings, so payloads are flattened
//! on the way out and parsed back into the typed union when a response
//! arrives.

use std::collections::BTreeMap;
use thiserror::Error;

use super::payload::{
    AchievementPayload, GoalPayload, HealthAlertPayload, NotificationPayload, PremiumOfferPayload,
    RecommendationPayload, SessionPayload, StreakPayload,
};
use super::NotificationKind;

pub const KIND: &str = "kind";
pub const SUBJECT_ID: &str = "subject_id";
pub const CATEGORY: &str = "category";
pub const GOAL_CATEGORY: &str = "goal_category";
pub const RECOMMENDATION_CATEGORY: &str = "recommendation_category";
pub const PRIORITY: &str = "priority";
pub const METRIC: &str = "metric";
pub const VALUE: &str = "value";
pub const STARTS_AT: &str = "starts_at";
pub const STREAK_COUNT: &str = "streak_count";
pub const DISCOUNT: &str = "discount_percent";

const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataError {
    #[error("metadata is missing '{0}'")]
    MissingKey(&'static str),

    #[error("metadata value '{value}' for '{key}' is invalid")]
    InvalidValue { key: &'static str, value: String },

    #[error("unknown notification kind '{0}'")]
    UnknownKind(String),
}

/// Flatten a payload into metadata entries.
pub fn encode(payload: &NotificationPayload) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    map.insert(KIND.to_string(), payload.kind().as_str().to_string());
    map.insert(SUBJECT_ID.to_string(), payload.subject_id().to_string());
    map.insert(CATEGORY.to_string(), payload.category_key());

    match payload {
        NotificationPayload::Goal(p) => {
            map.insert(GOAL_CATEGORY.to_string(), p.category.clone());
        }
        NotificationPayload::Recommendation(p) => {
            map.insert(RECOMMENDATION_CATEGORY.to_string(), p.category.to_string());
            map.insert(PRIORITY.to_string(), p.priority.to_string());
        }
        NotificationPayload::HealthAlert(p) => {
            map.insert(METRIC.to_string(), p.metric.clone());
            map.insert(VALUE.to_string(), p.value.to_string());
        }
        NotificationPayload::Achievement(_) => {}
        NotificationPayload::Session(p) => {
            if let Some(starts_at) = p.starts_at {
                map.insert(
                    STARTS_AT.to_string(),
                    starts_at.format(DATETIME_FORMAT).to_string(),
                );
            }
        }
        NotificationPayload::Streak(p) => {
            map.insert(STREAK_COUNT.to_string(), p.count.to_string());
        }
        NotificationPayload::PremiumOffer(p) => {
            if let Some(discount) = p.discount_percent {
                map.insert(DISCOUNT.to_string(), discount.to_string());
            }
        }
    }
    map
}

/// Rebuild the typed payload from delivered metadata.
pub fn decode(map: &BTreeMap<String, String>) -> Result<NotificationPayload, MetadataError> {
    let kind_raw = required(map, KIND)?;
    let kind: NotificationKind = kind_raw
        .parse()
        .map_err(|_| MetadataError::UnknownKind(kind_raw.to_string()))?;
    let subject = required(map, SUBJECT_ID)?;
    if subject.is_empty() {
        return Err(MetadataError::InvalidValue {
            key: SUBJECT_ID,
            value: String::new(),
        });
    }
    let subject = subject.to_string();

    let payload = match kind {
        NotificationKind::Goal => NotificationPayload::Goal(GoalPayload {
            goal_id: subject,
            category: required(map, GOAL_CATEGORY)?.to_string(),
        }),
        NotificationKind::Recommendation => {
            NotificationPayload::Recommendation(RecommendationPayload {
                recommendation_id: subject,
                category: parsed(map, RECOMMENDATION_CATEGORY)?,
                priority: parsed(map, PRIORITY)?,
            })
        }
        NotificationKind::HealthAlert => NotificationPayload::HealthAlert(HealthAlertPayload {
            alert_id: subject,
            metric: required(map, METRIC)?.to_string(),
            value: parsed(map, VALUE)?,
        }),
        NotificationKind::Achievement => NotificationPayload::Achievement(AchievementPayload {
            achievement_id: subject,
        }),
        NotificationKind::Session => {
            let starts_at = match map.get(STARTS_AT) {
                Some(raw) => Some(
                    chrono::NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|_| {
                        MetadataError::InvalidValue {
                            key: STARTS_AT,
                            value: raw.clone(),
                        }
                    })?,
                ),
                None => None,
            };
            NotificationPayload::Session(SessionPayload {
                session_id: subject,
                starts_at,
            })
        }
        NotificationKind::Streak => NotificationPayload::Streak(StreakPayload {
            category: subject,
            count: parsed(map, STREAK_COUNT)?,
        }),
        NotificationKind::PremiumOffer => NotificationPayload::PremiumOffer(PremiumOfferPayload {
            offer_id: subject,
            discount_percent: match map.get(DISCOUNT) {
                Some(_) => Some(parsed(map, DISCOUNT)?),
                None => None,
            },
        }),
    };
    Ok(payload)
}

fn required<'a>(
    map: &'a BTreeMap<String, String>,
    key: &'static str,
) -> Result<&'a str, MetadataError> {
    map.get(key)
        .map(String::as_str)
        .ok_or(MetadataError::MissingKey(key))
}

fn parsed<T: std::str::FromStr>(
    map: &BTreeMap<String, String>,
    key: &'static str,
) -> Result<T, MetadataError> {
    let raw = required(map, key)?;
    raw.parse().map_err(|_| MetadataError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}
