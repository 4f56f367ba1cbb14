//! Response router.
//!
//! Receives the delivery service's callbacks, tracks each notification's
//! lifecycle (scheduled, delivered, then tapped, acted on or dismissed),
//! applies the domain effect of a response and broadcasts an [`AppEvent`]
//! for the UI.

mod action;
mod presentation;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::clock;
use crate::delivery::{NotificationHandler, NotificationResponse, PresentationOptions, ResponseAction};
use crate::error::{CoreError, Result};
use crate::events::AppEvent;
use crate::notification::{DeliveredNotification, NotificationKind, NotificationPayload, NotificationSpec};
use crate::scheduler::NotificationScheduler;
use crate::storage::{Database, GoalStatus, RecommendationStatus};
use crate::streak::StreakUpdater;

pub use action::NotificationAction;
pub use presentation::presentation_for;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Lifecycle of one notification instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "action", rename_all = "snake_case")]
pub enum NotificationState {
    Scheduled,
    Delivered,
    Tapped,
    ActionTaken(NotificationAction),
    Dismissed,
}

impl NotificationState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NotificationState::Tapped | NotificationState::ActionTaken(_) | NotificationState::Dismissed
        )
    }
}

/// Last known state of an identifier, plus the delivery that was last
/// answered. Repeating rules and snoozed reminders reuse identifiers, so a
/// response only counts as a duplicate for the same delivery.
#[derive(Debug, Clone)]
struct Tracked {
    state: NotificationState,
    answered: Option<NaiveDateTime>,
}

/// A response reduced to what the handlers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Tap,
    Action(NotificationAction),
}

pub struct ResponseRouter {
    db: Arc<Database>,
    scheduler: Arc<NotificationScheduler>,
    streaks: StreakUpdater,
    events: broadcast::Sender<AppEvent>,
    states: Mutex<HashMap<String, Tracked>>,
}

impl ResponseRouter {
    pub fn new(db: Arc<Database>, scheduler: Arc<NotificationScheduler>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            streaks: StreakUpdater::new(db.clone()),
            db,
            scheduler,
            events,
            states: Mutex::new(HashMap::new()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Current lifecycle state, if the identifier is known at all.
    ///
    /// Cancelled identifiers are forgotten.
    pub fn state(&self, identifier: &str) -> Option<NotificationState> {
        let mut states = self.states.lock();
        if !self.scheduler.knows(identifier) {
            states.remove(identifier);
            return None;
        }
        Some(
            states
                .get(identifier)
                .map_or(NotificationState::Scheduled, |t| t.state.clone()),
        )
    }

    /// Move the delivery made at `delivered_at` to a terminal state.
    /// Returns false when that delivery was already answered.
    fn finish(&self, identifier: &str, delivered_at: NaiveDateTime, state: NotificationState) -> bool {
        let mut states = self.states.lock();
        if states
            .get(identifier)
            .is_some_and(|t| t.answered == Some(delivered_at))
        {
            return false;
        }
        states.insert(
            identifier.to_string(),
            Tracked {
                state,
                answered: Some(delivered_at),
            },
        );
        self.prune(&mut states, identifier);
        true
    }

    /// Set the state without touching the answered delivery.
    fn mark(&self, identifier: &str, state: NotificationState) {
        self.states
            .lock()
            .entry(identifier.to_string())
            .and_modify(|t| t.state = state.clone())
            .or_insert(Tracked {
                state,
                answered: None,
            });
    }

    /// Drop entries for identifiers the scheduler no longer knows.
    fn prune(&self, states: &mut HashMap<String, Tracked>, keep: &str) {
        states.retain(|id, _| id == keep || self.scheduler.knows(id));
    }

    /// Handle one response. Errors are logged by the caller.
    async fn route(&self, response: NotificationResponse) -> Result<Option<AppEvent>> {
        let identifier = response.notification.identifier().to_string();
        let delivered_at = response.notification.delivered_at;

        let intent = match &response.action {
            ResponseAction::Dismiss => {
                if self.finish(&identifier, delivered_at, NotificationState::Dismissed) {
                    tracing::debug!(%identifier, "notification dismissed");
                } else {
                    tracing::debug!(%identifier, "duplicate response ignored");
                }
                return Ok(None);
            }
            ResponseAction::Tap => Intent::Tap,
            ResponseAction::Action(raw) => match raw.parse::<NotificationAction>() {
                Ok(action) => Intent::Action(action),
                Err(e) => {
                    tracing::warn!(%identifier, error = %e, "malformed response ignored");
                    return Ok(None);
                }
            },
        };

        let spec = match NotificationSpec::from_content(response.notification.content()) {
            Ok(spec) => spec,
            Err(e) => {
                tracing::warn!(%identifier, error = %e, "notification metadata is malformed");
                return Ok(None);
            }
        };
        if let Intent::Action(action) = intent {
            if action.kind() != spec.kind() {
                tracing::warn!(%identifier, %action, kind = %spec.kind(), "action does not belong to notification kind");
                return Ok(None);
            }
        }

        let state = match intent {
            Intent::Tap => NotificationState::Tapped,
            Intent::Action(action) => NotificationState::ActionTaken(action),
        };
        if !self.finish(&identifier, delivered_at, state) {
            tracing::debug!(%identifier, "duplicate response ignored");
            return Ok(None);
        }

        self.scheduler
            .personalization()
            .record_response(spec.category_key(), response.responded_at);

        self.dispatch(&identifier, &spec, intent, response.responded_at).await
    }

    async fn dispatch(
        &self,
        identifier: &str,
        spec: &NotificationSpec,
        intent: Intent,
        now: NaiveDateTime,
    ) -> Result<Option<AppEvent>> {
        use NotificationAction as A;

        let event = match (spec.payload(), intent) {
            (NotificationPayload::Goal(goal), Intent::Action(A::CompleteGoal)) => {
                let record = self.db.goal(&goal.goal_id)?.ok_or_else(|| CoreError::SubjectNotFound {
                    kind: NotificationKind::Goal,
                    id: goal.goal_id.clone(),
                })?;
                self.db.set_goal_status(&record.id, GoalStatus::Completed, now)?;
                self.db.add_progress_entry(&record.id, now, "completed from notification")?;
                self.streaks
                    .record_completion(&record.category, now.date(), &self.scheduler)
                    .await?;
                Some(AppEvent::GoalCompleted {
                    goal_id: record.id,
                })
            }
            (NotificationPayload::Goal(goal), Intent::Action(A::SnoozeGoal)) => {
                let at = clock::after(now, self.scheduler.config().scheduling.snooze());
                let outcome = self.scheduler.schedule_goal(spec.clone().at(at)).await;
                tracing::info!(goal_id = %goal.goal_id, %at, ?outcome, "goal reminder snoozed");
                if outcome.identifiers().iter().any(|id| id == identifier) {
                    self.mark(identifier, NotificationState::Scheduled);
                }
                None
            }
            (NotificationPayload::Goal(goal), Intent::Action(A::SkipGoal)) => {
                self.update_goal(&goal.goal_id, GoalStatus::Skipped, now)?;
                Some(AppEvent::GoalSkipped {
                    goal_id: goal.goal_id.clone(),
                })
            }
            (NotificationPayload::Goal(goal), _) => Some(AppEvent::OpenGoalDetails {
                goal_id: goal.goal_id.clone(),
            }),

            (NotificationPayload::Recommendation(rec), intent) => {
                let id = rec.recommendation_id.clone();
                let (status, event) = match intent {
                    Intent::Action(A::AcceptRecommendation) => (
                        RecommendationStatus::Accepted,
                        AppEvent::RecommendationAccepted { recommendation_id: id },
                    ),
                    Intent::Action(A::DeclineRecommendation) => (
                        RecommendationStatus::Declined,
                        AppEvent::RecommendationDeclined { recommendation_id: id },
                    ),
                    _ => (
                        RecommendationStatus::Viewed,
                        AppEvent::OpenRecommendationDetails { recommendation_id: id },
                    ),
                };
                if !self
                    .db
                    .set_recommendation_status(&rec.recommendation_id, status, now)?
                {
                    return Err(CoreError::SubjectNotFound {
                        kind: NotificationKind::Recommendation,
                        id: rec.recommendation_id.clone(),
                    });
                }
                Some(event)
            }

            (NotificationPayload::HealthAlert(alert), _) => Some(AppEvent::OpenHealthDetails {
                alert_id: alert.alert_id.clone(),
            }),

            (NotificationPayload::Achievement(achievement), _) => {
                Some(AppEvent::OpenAchievementDetails {
                    achievement_id: achievement.achievement_id.clone(),
                })
            }

            (NotificationPayload::Session(session), Intent::Action(A::StartSession)) => {
                Some(AppEvent::StartAudioSession {
                    session_id: session.session_id.clone(),
                })
            }
            (NotificationPayload::Session(session), Intent::Action(A::RescheduleSession)) => {
                let at = clock::after(now, self.scheduler.config().scheduling.snooze());
                let outcome = self.scheduler.schedule_session(spec.clone().at(at)).await;
                tracing::info!(session_id = %session.session_id, %at, ?outcome, "session reminder rescheduled");
                if outcome.identifiers().iter().any(|id| id == identifier) {
                    self.mark(identifier, NotificationState::Scheduled);
                }
                Some(AppEvent::RescheduleAudioSession {
                    session_id: session.session_id.clone(),
                })
            }
            (NotificationPayload::Session(session), _) => Some(AppEvent::OpenAudioSessionDetails {
                session_id: session.session_id.clone(),
            }),

            (NotificationPayload::Streak(streak), _) => Some(AppEvent::OpenStreakDetails {
                category: streak.category.clone(),
            }),

            (NotificationPayload::PremiumOffer(offer), Intent::Action(A::Upgrade)) => {
                Some(AppEvent::OpenSubscriptionUI {
                    offer_id: offer.offer_id.clone(),
                })
            }
            (NotificationPayload::PremiumOffer(offer), _) => {
                Some(AppEvent::OpenPremiumOfferDetails {
                    offer_id: offer.offer_id.clone(),
                })
            }
        };
        Ok(event)
    }

    fn update_goal(&self, goal_id: &str, status: GoalStatus, at: NaiveDateTime) -> Result<()> {
        if self.db.set_goal_status(goal_id, status, at)? {
            Ok(())
        } else {
            Err(CoreError::SubjectNotFound {
                kind: NotificationKind::Goal,
                id: goal_id.to_string(),
            })
        }
    }

    fn emit(&self, event: AppEvent) {
        tracing::debug!(?event, "app event");
        if self.events.send(event).is_err() {
            tracing::trace!("no event subscribers");
        }
    }
}

#[async_trait]
impl NotificationHandler for ResponseRouter {
    fn will_present(&self, notification: &DeliveredNotification) -> PresentationOptions {
        let identifier = notification.identifier();
        {
            let mut states = self.states.lock();
            let tracked = states.entry(identifier.to_string()).or_insert(Tracked {
                state: NotificationState::Delivered,
                answered: None,
            });
            // Leave it alone when this very delivery was already answered
            if tracked.answered != Some(notification.delivered_at) {
                tracked.state = NotificationState::Delivered;
            }
            self.prune(&mut states, identifier);
        }
        presentation_for(notification.content(), &self.scheduler.config().presentation)
    }

    async fn did_respond(&self, response: NotificationResponse) {
        let identifier = response.notification.identifier().to_string();
        match self.route(response).await {
            Ok(Some(event)) => self.emit(event),
            Ok(None) => {}
            Err(e @ CoreError::SubjectNotFound { .. }) => {
                tracing::warn!(%identifier, error = %e, "response aborted");
            }
            Err(e) => {
                tracing::error!(%identifier, error = %e, "failed to handle notification response");
            }
        }
    }
}
