//! Notification scheduler facade.
//!
//! One operation per notification kind. Each call checks authorization and
//! the category preference, works out when to deliver, registers with the
//! delivery service and then re-reads the service's authoritative lists.
//! Failures are logged and reported through [`ScheduleOutcome`]; nothing is
//! retried.

mod outcome;

use chrono::NaiveDateTime;
use futures::future::join_all;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::clock::{self, Clock, TimeOfDay};
use crate::delivery::{AuthorizationProvider, DeliveryService};
use crate::error::ValidationError;
use crate::gate::{milestone, PreferenceGate};
use crate::notification::{
    notification_id, DeliveredNotification, NotificationKind, NotificationPayload,
    NotificationRequest, NotificationSpec, SessionPayload, Trigger,
};
use crate::personalization::{next_occurrence, PersonalizationEngine};
use crate::recurrence::{self, Frequency};
use crate::storage::{Config, Database};

pub use outcome::{ScheduleOutcome, ScheduledRecord, SkipReason};

#[derive(Default)]
struct Cache {
    records: BTreeMap<String, ScheduledRecord>,
    pending: Vec<NotificationRequest>,
    delivered: Vec<DeliveredNotification>,
}

/// Owns the preference cache, the response history and the local view of
/// what the delivery service holds.
pub struct NotificationScheduler {
    delivery: Arc<dyn DeliveryService>,
    authorization: Arc<dyn AuthorizationProvider>,
    authorized: AtomicBool,
    preferences: PreferenceGate,
    personalization: PersonalizationEngine,
    config: Config,
    clock: Arc<dyn Clock>,
    cache: RwLock<Cache>,
}

impl NotificationScheduler {
    pub fn new(
        db: Arc<Database>,
        delivery: Arc<dyn DeliveryService>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let authorized = authorization.is_authorized();
        Self {
            delivery,
            authorized: AtomicBool::new(authorized),
            authorization,
            preferences: PreferenceGate::load(db.clone()),
            personalization: PersonalizationEngine::load(db),
            config,
            clock,
            cache: RwLock::new(Cache::default()),
        }
    }

    pub fn preferences(&self) -> &PreferenceGate {
        &self.preferences
    }

    pub fn personalization(&self) -> &PersonalizationEngine {
        &self.personalization
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    // ── Authorization ──────────────────────────────────────────────────

    pub fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    /// Re-read the provider's current answer without prompting.
    pub fn refresh_authorization(&self) -> bool {
        let granted = self.authorization.is_authorized();
        self.authorized.store(granted, Ordering::SeqCst);
        granted
    }

    /// Prompt for permission and cache the answer.
    pub async fn request_authorization(&self) -> bool {
        let granted = self.authorization.request_authorization().await;
        self.authorized.store(granted, Ordering::SeqCst);
        tracing::info!(granted, "notification authorization requested");
        granted
    }

    // ── Preferences ────────────────────────────────────────────────────

    /// Merge category toggles. Already registered notifications are kept.
    pub fn update_preferences(&self, changes: BTreeMap<String, bool>) {
        self.preferences.update(changes);
    }

    pub fn update_preferred_time(
        &self,
        key: &str,
        hour: u32,
        minute: u32,
    ) -> Result<(), ValidationError> {
        let time = TimeOfDay::new(hour, minute)?;
        self.preferences.update_preferred_time(key, time);
        Ok(())
    }

    // ── Scheduling ─────────────────────────────────────────────────────

    pub async fn schedule_goal(&self, spec: NotificationSpec) -> ScheduleOutcome {
        self.schedule_one(NotificationKind::Goal, spec).await
    }

    /// Register one repeating rule per expansion of `frequency`.
    ///
    /// Without an explicit `time` the category's preferred time is used,
    /// then the personalized optimal time. Once at least one rule is
    /// registered, the goal's other reminders are cancelled so a changed
    /// frequency leaves no stale rules. When nothing registers the existing
    /// rules stay in place.
    pub async fn schedule_recurring_goal(
        &self,
        spec: NotificationSpec,
        frequency: Frequency,
        time: Option<TimeOfDay>,
    ) -> ScheduleOutcome {
        if let Some(reason) = self.check(NotificationKind::Goal, &spec) {
            return self.skip(&spec, reason);
        }

        let now = self.clock.now();
        let time = time
            .or_else(|| self.preferences.preferred_time(spec.category_key()))
            .unwrap_or_else(|| TimeOfDay::of(self.optimal_time_for(spec.category_key())));
        let resolver = self.preferences.quiet_resolver();
        let time = TimeOfDay::of(resolver.resolve(next_occurrence(now, time.to_naive_time())));

        let requests: Vec<NotificationRequest> = recurrence::expand(frequency, time, now)
            .into_iter()
            .map(|rule| NotificationRequest {
                identifier: notification_id(
                    NotificationKind::Goal,
                    spec.subject_id(),
                    Some(&rule.suffix),
                ),
                content: spec.content(),
                trigger: rule.trigger,
            })
            .collect();
        tracing::debug!(goal_id = spec.subject_id(), %frequency, %time, "expanded recurrence");
        let expanded: HashSet<String> = requests.iter().map(|r| r.identifier.clone()).collect();

        let outcome = self.register_all(&spec, requests).await;
        if outcome.is_scheduled() {
            let stale: Vec<String> = goal_identifiers(spec.subject_id())
                .into_iter()
                .filter(|id| !expanded.contains(id))
                .collect();
            self.cancel_by_identifiers(&stale).await;
        }
        outcome
    }

    pub async fn schedule_recommendation(&self, spec: NotificationSpec) -> ScheduleOutcome {
        self.schedule_one(NotificationKind::Recommendation, spec).await
    }

    pub async fn schedule_health_alert(&self, spec: NotificationSpec) -> ScheduleOutcome {
        self.schedule_one(NotificationKind::HealthAlert, spec).await
    }

    pub async fn schedule_achievement(&self, spec: NotificationSpec) -> ScheduleOutcome {
        self.schedule_one(NotificationKind::Achievement, spec).await
    }

    /// Session reminders fire a configured lead time before the session
    /// starts, unless the notification pins an explicit time.
    pub async fn schedule_session(&self, spec: NotificationSpec) -> ScheduleOutcome {
        self.schedule_one(NotificationKind::Session, spec).await
    }

    /// Only milestone streak counts are announced.
    pub async fn schedule_streak(&self, spec: NotificationSpec) -> ScheduleOutcome {
        self.schedule_one(NotificationKind::Streak, spec).await
    }

    pub async fn schedule_premium_offer(&self, spec: NotificationSpec) -> ScheduleOutcome {
        self.schedule_one(NotificationKind::PremiumOffer, spec).await
    }

    async fn schedule_one(&self, expected: NotificationKind, spec: NotificationSpec) -> ScheduleOutcome {
        if let Some(reason) = self.check(expected, &spec) {
            return self.skip(&spec, reason);
        }

        let at = self.delivery_time(&spec, self.clock.now());
        let request = NotificationRequest {
            identifier: notification_id(spec.kind(), spec.subject_id(), None),
            content: spec.content(),
            trigger: Trigger::At { at },
        };
        self.register_all(&spec, vec![request]).await
    }

    /// Gate checks shared by every scheduling operation.
    fn check(&self, expected: NotificationKind, spec: &NotificationSpec) -> Option<SkipReason> {
        if spec.kind() != expected {
            return Some(SkipReason::KindMismatch {
                expected,
                actual: spec.kind(),
            });
        }
        if !self.is_authorized() {
            return Some(SkipReason::AuthorizationDenied);
        }
        if !self.preferences.is_enabled(spec.category_key()) {
            return Some(SkipReason::CategoryDisabled {
                category: spec.category_key().to_string(),
            });
        }
        if let NotificationPayload::Streak(streak) = spec.payload() {
            if !milestone::should_notify(streak.count) {
                return Some(SkipReason::BelowMilestone {
                    count: streak.count,
                });
            }
        }
        None
    }

    fn skip(&self, spec: &NotificationSpec, reason: SkipReason) -> ScheduleOutcome {
        tracing::info!(
            kind = %spec.kind(),
            subject_id = spec.subject_id(),
            %reason,
            "notification skipped"
        );
        ScheduleOutcome::Skipped(reason)
    }

    /// When a one-shot notification for `spec` should fire.
    ///
    /// Immediate kinds fire after the configured short delay. Explicit times
    /// in the past count as immediate. Everything else goes through the
    /// quiet-hours resolver, except session lead reminders which must not
    /// slide past the session itself.
    pub fn delivery_time(&self, spec: &NotificationSpec, now: NaiveDateTime) -> NaiveDateTime {
        let scheduling = &self.config.scheduling;
        let immediate = clock::after(now, scheduling.immediate_delay());
        if spec.kind().is_immediate() {
            return immediate;
        }

        let candidate = match (spec.trigger_at(), spec.payload()) {
            (Some(at), _) if at > now => at,
            (Some(_), _) => return immediate,
            (
                None,
                NotificationPayload::Session(SessionPayload {
                    starts_at: Some(starts_at),
                    ..
                }),
            ) => {
                return starts_at
                    .checked_sub_signed(scheduling.session_lead())
                    .filter(|at| *at > now)
                    .unwrap_or(immediate);
            }
            (None, _) => return self.optimal_time_for(spec.category_key()),
        };
        self.preferences.quiet_resolver().resolve(candidate)
    }

    /// Personalized delivery time for `key`, moved out of quiet hours.
    pub fn optimal_time_for(&self, key: &str) -> NaiveDateTime {
        let candidate = self.personalization.optimal_time(
            key,
            self.preferences.preferred_time(key),
            self.clock.now(),
            self.config.scheduling.fallback_offset(),
        );
        self.preferences.quiet_resolver().resolve(candidate)
    }

    /// Register every request concurrently; partial failure is accepted.
    async fn register_all(
        &self,
        spec: &NotificationSpec,
        requests: Vec<NotificationRequest>,
    ) -> ScheduleOutcome {
        let results = join_all(requests.iter().map(|r| self.delivery.register(r.clone()))).await;

        let registered_at = self.clock.now();
        let mut identifiers = Vec::new();
        let mut errors = Vec::new();
        for (request, result) in requests.into_iter().zip(results) {
            match result {
                Ok(()) => {
                    tracing::info!(
                        identifier = %request.identifier,
                        trigger = ?request.trigger,
                        "notification registered"
                    );
                    identifiers.push(request.identifier.clone());
                    self.cache.write().records.insert(
                        request.identifier.clone(),
                        ScheduledRecord {
                            identifier: request.identifier,
                            spec: spec.clone(),
                            trigger: request.trigger,
                            registered_at,
                        },
                    );
                }
                Err(e) => {
                    tracing::warn!(identifier = %request.identifier, error = %e, "registration failed");
                    errors.push(e);
                }
            }
        }

        if identifiers.is_empty() {
            return ScheduleOutcome::Failed { errors };
        }
        self.refresh().await;
        ScheduleOutcome::Scheduled { identifiers }
    }

    // ── Cache & queries ────────────────────────────────────────────────

    /// Re-read pending and delivered lists and drop records the delivery
    /// service no longer holds.
    pub async fn refresh(&self) {
        let (pending, delivered) = futures::join!(self.delivery.pending(), self.delivery.delivered());
        let live: HashSet<&str> = pending
            .iter()
            .map(|r| r.identifier.as_str())
            .chain(delivered.iter().map(DeliveredNotification::identifier))
            .collect();

        let mut cache = self.cache.write();
        cache.records.retain(|id, _| live.contains(id.as_str()));
        cache.pending = pending;
        cache.delivered = delivered;
    }

    /// Pending requests as of the last refresh.
    pub fn pending(&self) -> Vec<NotificationRequest> {
        self.cache.read().pending.clone()
    }

    /// Delivered notifications as of the last refresh.
    pub fn delivered(&self) -> Vec<DeliveredNotification> {
        self.cache.read().delivered.clone()
    }

    pub fn records(&self) -> Vec<ScheduledRecord> {
        self.cache.read().records.values().cloned().collect()
    }

    pub fn is_scheduled(&self, identifier: &str) -> bool {
        let cache = self.cache.read();
        cache.records.contains_key(identifier)
            || cache.pending.iter().any(|r| r.identifier == identifier)
    }

    /// Whether `identifier` is registered or still shown as delivered.
    /// False once it has been cancelled.
    pub fn knows(&self, identifier: &str) -> bool {
        self.is_scheduled(identifier)
            || self
                .cache
                .read()
                .delivered
                .iter()
                .any(|d| d.identifier() == identifier)
    }

    // ── Cancellation ───────────────────────────────────────────────────

    pub async fn cancel_all(&self) {
        self.delivery.cancel_all().await;
        *self.cache.write() = Cache::default();
        tracing::info!("all notifications cancelled");
    }

    pub async fn cancel_by_identifiers(&self, identifiers: &[String]) {
        if identifiers.is_empty() {
            return;
        }
        self.delivery.cancel(identifiers).await;
        {
            let mut cache = self.cache.write();
            for identifier in identifiers {
                cache.records.remove(identifier);
            }
        }
        self.refresh().await;
        tracing::debug!(count = identifiers.len(), "notifications cancelled");
    }

    /// Cancel the one-shot reminder and every recurrence rule of a goal.
    pub async fn cancel_goal(&self, goal_id: &str) {
        self.cancel_by_identifiers(&goal_identifiers(goal_id)).await;
    }
}

/// Every identifier a goal's reminders can be registered under.
fn goal_identifiers(goal_id: &str) -> Vec<String> {
    let mut identifiers = vec![notification_id(NotificationKind::Goal, goal_id, None)];
    identifiers.extend(
        recurrence::all_suffixes()
            .iter()
            .map(|suffix| notification_id(NotificationKind::Goal, goal_id, Some(suffix))),
    );
    identifiers
}
