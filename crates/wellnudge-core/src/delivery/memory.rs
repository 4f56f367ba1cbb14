//! In-process delivery center.
//!
//! Keeps pending and delivered notifications in memory and lets callers
//! simulate the platform firing a notification and the user responding.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Weak};

use super::{
    DeliveryService, NotificationHandler, NotificationResponse, PresentationOptions,
    ResponseAction,
};
use crate::clock::Clock;
use crate::error::DeliveryError;
use crate::notification::{DeliveredNotification, NotificationRequest};

#[derive(Default)]
struct CenterState {
    pending: BTreeMap<String, NotificationRequest>,
    delivered: Vec<DeliveredNotification>,
    failing: HashSet<String>,
    offline: bool,
}

pub struct MemoryDeliveryCenter {
    clock: Arc<dyn Clock>,
    state: Mutex<CenterState>,
    handler: Mutex<Option<Weak<dyn NotificationHandler>>>,
}

impl MemoryDeliveryCenter {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(CenterState::default()),
            handler: Mutex::new(None),
        }
    }

    /// Reject future registrations of `identifier`.
    pub fn fail_registrations_for(&self, identifier: &str) {
        self.state.lock().failing.insert(identifier.to_string());
    }

    /// Reject every registration while `offline` is set.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn handler(&self) -> Option<Arc<dyn NotificationHandler>> {
        self.handler.lock().as_ref().and_then(Weak::upgrade)
    }

    /// Fire a pending notification.
    ///
    /// One-shot requests leave the pending list; repeating ones stay. When
    /// the app is active the handler decides the presentation.
    pub fn deliver(&self, identifier: &str, app_active: bool) -> Option<PresentationOptions> {
        let delivered = {
            let mut state = self.state.lock();
            let request = state.pending.get(identifier)?.clone();
            if !request.trigger.repeats() {
                state.pending.remove(identifier);
            }
            let delivered = DeliveredNotification {
                request,
                delivered_at: self.clock.now(),
            };
            state.delivered.retain(|d| d.identifier() != identifier);
            state.delivered.push(delivered.clone());
            delivered
        };

        if !app_active {
            return None;
        }
        self.handler().map(|h| h.will_present(&delivered))
    }

    /// Simulate the user responding to a delivered notification.
    ///
    /// Returns false when nothing with that identifier was delivered or no
    /// handler is installed.
    pub async fn respond(&self, identifier: &str, action: ResponseAction) -> bool {
        let notification = {
            let state = self.state.lock();
            state
                .delivered
                .iter()
                .find(|d| d.identifier() == identifier)
                .cloned()
        };
        let (Some(notification), Some(handler)) = (notification, self.handler()) else {
            return false;
        };

        handler
            .did_respond(NotificationResponse {
                notification,
                action,
                responded_at: self.clock.now(),
            })
            .await;
        true
    }
}

#[async_trait]
impl DeliveryService for MemoryDeliveryCenter {
    async fn register(&self, request: NotificationRequest) -> Result<(), DeliveryError> {
        let mut state = self.state.lock();
        if state.offline {
            return Err(DeliveryError::Unavailable);
        }
        if state.failing.contains(&request.identifier) {
            return Err(DeliveryError::Rejected {
                identifier: request.identifier,
                reason: "rejected by test configuration".to_string(),
            });
        }
        state.pending.insert(request.identifier.clone(), request);
        Ok(())
    }

    async fn pending(&self) -> Vec<NotificationRequest> {
        self.state.lock().pending.values().cloned().collect()
    }

    async fn delivered(&self) -> Vec<DeliveredNotification> {
        self.state.lock().delivered.clone()
    }

    async fn cancel(&self, identifiers: &[String]) {
        let mut state = self.state.lock();
        for identifier in identifiers {
            state.pending.remove(identifier);
        }
        state
            .delivered
            .retain(|d| !identifiers.iter().any(|id| id == d.identifier()));
    }

    async fn cancel_all(&self) {
        let mut state = self.state.lock();
        state.pending.clear();
        state.delivered.clear();
    }

    fn set_handler(&self, handler: Weak<dyn NotificationHandler>) {
        *self.handler.lock() = Some(handler);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::notification::{AchievementPayload, NotificationPayload, NotificationSpec, Trigger};
    use chrono::NaiveDate;

    fn center() -> MemoryDeliveryCenter {
        let now = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        MemoryDeliveryCenter::new(Arc::new(FixedClock::new(now)))
    }

    fn request(id: &str, trigger: Trigger) -> NotificationRequest {
        let spec = NotificationSpec::new(
            NotificationPayload::Achievement(AchievementPayload {
                achievement_id: id.into(),
            }),
            "Badge unlocked",
            "",
        );
        NotificationRequest {
            identifier: id.to_string(),
            content: spec.content(),
            trigger,
        }
    }

    fn daily() -> Trigger {
        Trigger::Daily {
            time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn register_replaces_same_identifier() {
        let center = center();
        center.register(request("a", daily())).await.unwrap();
        center.register(request("a", daily())).await.unwrap();
        assert_eq!(center.pending().await.len(), 1);
    }

    #[tokio::test]
    async fn failing_identifiers_are_rejected() {
        let center = center();
        center.fail_registrations_for("a");
        assert!(matches!(
            center.register(request("a", daily())).await,
            Err(DeliveryError::Rejected { .. })
        ));
        center.set_offline(true);
        assert_eq!(
            center.register(request("b", daily())).await,
            Err(DeliveryError::Unavailable)
        );
        assert!(center.pending().await.is_empty());
    }

    #[tokio::test]
    async fn deliver_moves_one_shots_but_keeps_repeats() {
        let center = center();
        let at = NaiveDate::from_ymd_opt(2026, 1, 5)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        center.register(request("once", Trigger::At { at })).await.unwrap();
        center.register(request("rep", daily())).await.unwrap();

        assert_eq!(center.deliver("once", false), None);
        center.deliver("rep", false);
        let pending: Vec<_> = center.pending().await.into_iter().map(|r| r.identifier).collect();
        assert_eq!(pending, vec!["rep".to_string()]);
        assert_eq!(center.delivered().await.len(), 2);

        center.cancel(&["rep".to_string()]).await;
        assert!(center.pending().await.is_empty());
        assert_eq!(center.delivered().await.len(), 1);

        center.cancel_all().await;
        assert!(center.delivered().await.is_empty());
    }

    #[tokio::test]
    async fn respond_without_handler_is_ignored() {
        let center = center();
        center.register(request("a", daily())).await.unwrap();
        center.deliver("a", false);
        assert!(!center.respond("a", ResponseAction::Tap).await);
    }
}
