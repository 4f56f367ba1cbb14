//! Integration tests for response routing.
//!
//! Schedules, delivers and responds through the in-memory delivery center,
//! then checks the store, the event stream and follow-up registrations.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tokio::sync::broadcast::error::TryRecvError;
use wellnudge_core::notification::{
    GoalPayload, HealthAlertPayload, PremiumOfferPayload, RecommendationCategory,
    RecommendationPayload, SessionPayload,
};
use wellnudge_core::storage::{GoalRecord, GoalStatus, RecommendationRecord, RecommendationStatus};
use wellnudge_core::{
    AppEvent, Clock, Config, Database, DeliveryService, FixedClock, Frequency, MemoryDeliveryCenter,
    NotificationAction, NotificationEngine, NotificationPayload, NotificationSpec,
    NotificationState, PresentationOptions, ResponseAction, StaticAuthorization, StreakRecord,
    TimeOfDay, Trigger,
};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 6, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

const NOW_DAY: u32 = 10;

struct Harness {
    clock: Arc<FixedClock>,
    db: Arc<Database>,
    center: Arc<MemoryDeliveryCenter>,
    engine: NotificationEngine,
}

async fn harness() -> Harness {
    let clock = Arc::new(FixedClock::new(at(NOW_DAY, 8, 0)));
    let shared: Arc<dyn Clock> = clock.clone();
    let db = Arc::new(Database::open_memory().unwrap());
    let center = Arc::new(MemoryDeliveryCenter::new(shared.clone()));
    let engine = NotificationEngine::start(
        db.clone(),
        center.clone(),
        Arc::new(StaticAuthorization::granted()),
        Config::default(),
        shared,
    )
    .await;
    Harness {
        clock,
        db,
        center,
        engine,
    }
}

fn action(id: NotificationAction) -> ResponseAction {
    ResponseAction::Action(id.as_str().to_string())
}

impl Harness {
    fn goal_spec(id: &str, category: &str) -> NotificationSpec {
        NotificationSpec::new(
            NotificationPayload::Goal(GoalPayload {
                goal_id: id.into(),
                category: category.into(),
            }),
            "Hydrate",
            "Have a glass of water",
        )
    }

    fn add_goal(&self, id: &str, category: &str) {
        self.db
            .upsert_goal(&GoalRecord {
                id: id.into(),
                title: "Drink water".into(),
                category: category.into(),
                status: GoalStatus::Active,
                updated_at: at(1, 8, 0),
            })
            .unwrap();
    }

    fn set_streak(&self, category: &str, count: u32) {
        self.db
            .put_streak(&StreakRecord {
                category: category.into(),
                current_count: count,
                longest_count: count,
                last_updated: NaiveDate::from_ymd_opt(2026, 6, NOW_DAY - 1).unwrap(),
            })
            .unwrap();
    }

    /// Schedule a goal reminder and have it fire in the background.
    async fn deliver_goal(&self, id: &str, category: &str) -> String {
        let spec = Self::goal_spec(id, category);
        let outcome = self.engine.scheduler().schedule_goal(spec).await;
        let identifier = outcome.identifiers()[0].clone();
        self.center.deliver(&identifier, false);
        identifier
    }

    async fn is_pending(&self, identifier: &str) -> bool {
        self.center
            .pending()
            .await
            .iter()
            .any(|r| r.identifier == identifier)
    }
}

#[tokio::test]
async fn test_complete_goal_updates_store_streak_and_emits_event() {
    let h = harness().await;
    h.add_goal("water", "hydration");
    h.set_streak("hydration", 6);
    let mut events = h.engine.subscribe();

    let identifier = h.deliver_goal("water", "hydration").await;
    assert!(h.center.respond(&identifier, action(NotificationAction::CompleteGoal)).await);

    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::GoalCompleted {
            goal_id: "water".into()
        }
    );
    assert_eq!(h.db.goal("water").unwrap().unwrap().status, GoalStatus::Completed);
    assert_eq!(h.db.progress_entries("water").unwrap().len(), 1);

    let streak = h.db.streak("hydration").unwrap().unwrap();
    assert_eq!(streak.current_count, 7);
    assert_eq!(streak.longest_count, 7);
    assert!(h.is_pending("streak_hydration").await);
    assert_eq!(
        h.engine.router().state(&identifier),
        Some(NotificationState::ActionTaken(NotificationAction::CompleteGoal))
    );
}

#[tokio::test]
async fn test_milestone_ten_schedules_streak_notification() {
    let h = harness().await;
    h.add_goal("sleep-by-11", "sleep");
    h.set_streak("sleep", 9);

    let identifier = h.deliver_goal("sleep-by-11", "sleep").await;
    h.center.respond(&identifier, action(NotificationAction::CompleteGoal)).await;

    assert_eq!(h.db.streak("sleep").unwrap().unwrap().current_count, 10);
    assert!(h.is_pending("streak_sleep").await);
}

#[tokio::test]
async fn test_ordinary_increment_schedules_no_streak_notification() {
    let h = harness().await;
    h.add_goal("water", "hydration");
    h.set_streak("hydration", 3);

    let identifier = h.deliver_goal("water", "hydration").await;
    h.center.respond(&identifier, action(NotificationAction::CompleteGoal)).await;

    assert_eq!(h.db.streak("hydration").unwrap().unwrap().current_count, 4);
    assert!(!h.is_pending("streak_hydration").await);
}

#[tokio::test]
async fn test_duplicate_response_is_ignored() {
    let h = harness().await;
    h.add_goal("water", "hydration");
    let mut events = h.engine.subscribe();

    let identifier = h.deliver_goal("water", "hydration").await;
    h.center.respond(&identifier, action(NotificationAction::CompleteGoal)).await;
    h.center.respond(&identifier, action(NotificationAction::CompleteGoal)).await;

    assert!(events.try_recv().is_ok());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(h.db.progress_entries("water").unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_goal_aborts_without_event() {
    let h = harness().await;
    let mut events = h.engine.subscribe();

    let identifier = h.deliver_goal("ghost", "hydration").await;
    h.center.respond(&identifier, action(NotificationAction::CompleteGoal)).await;

    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert!(h.db.streak("hydration").unwrap().is_none());
}

#[tokio::test]
async fn test_snooze_reschedules_goal() {
    let h = harness().await;
    h.add_goal("water", "hydration");

    let identifier = h.deliver_goal("water", "hydration").await;
    assert!(!h.is_pending(&identifier).await);
    h.center.respond(&identifier, action(NotificationAction::SnoozeGoal)).await;

    let trigger = h
        .center
        .pending()
        .await
        .into_iter()
        .find(|r| r.identifier == identifier)
        .map(|r| r.trigger);
    assert_eq!(
        trigger,
        Some(Trigger::At {
            at: at(NOW_DAY, 8, 0) + Duration::minutes(15)
        })
    );
}

#[tokio::test]
async fn test_snoozed_reminder_can_be_completed() {
    let h = harness().await;
    h.add_goal("water", "hydration");
    let mut events = h.engine.subscribe();

    let identifier = h.deliver_goal("water", "hydration").await;
    h.center.respond(&identifier, action(NotificationAction::SnoozeGoal)).await;
    assert_eq!(h.engine.router().state(&identifier), Some(NotificationState::Scheduled));

    h.clock.advance(Duration::minutes(15));
    h.center.deliver(&identifier, false);
    h.center.respond(&identifier, action(NotificationAction::CompleteGoal)).await;

    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::GoalCompleted {
            goal_id: "water".into()
        }
    );
    assert_eq!(h.db.goal("water").unwrap().unwrap().status, GoalStatus::Completed);
    assert_eq!(
        h.engine.router().state(&identifier),
        Some(NotificationState::ActionTaken(NotificationAction::CompleteGoal))
    );
}

#[tokio::test]
async fn test_daily_rule_counts_every_delivery() {
    let h = harness().await;
    h.add_goal("water", "hydration");

    let outcome = h
        .engine
        .scheduler()
        .schedule_recurring_goal(
            Harness::goal_spec("water", "hydration"),
            Frequency::Daily,
            Some(TimeOfDay::new(8, 0).unwrap()),
        )
        .await;
    assert_eq!(outcome.identifiers(), &["goal_water_daily".to_string()]);

    for _ in 0..2 {
        h.center.deliver("goal_water_daily", false);
        h.center
            .respond("goal_water_daily", action(NotificationAction::CompleteGoal))
            .await;
        h.clock.advance(Duration::days(1));
    }

    assert_eq!(h.db.progress_entries("water").unwrap().len(), 2);
    assert_eq!(h.db.streak("hydration").unwrap().unwrap().current_count, 2);
    assert!(h.is_pending("goal_water_daily").await);
}

#[tokio::test]
async fn test_new_delivery_resets_state_and_cancel_forgets_it() {
    let h = harness().await;
    h.add_goal("water", "hydration");
    h.engine
        .scheduler()
        .schedule_recurring_goal(
            Harness::goal_spec("water", "hydration"),
            Frequency::Daily,
            Some(TimeOfDay::new(8, 0).unwrap()),
        )
        .await;

    h.center.deliver("goal_water_daily", true);
    h.center.respond("goal_water_daily", ResponseAction::Dismiss).await;
    assert_eq!(
        h.engine.router().state("goal_water_daily"),
        Some(NotificationState::Dismissed)
    );

    h.clock.advance(Duration::days(1));
    h.center.deliver("goal_water_daily", true);
    assert_eq!(
        h.engine.router().state("goal_water_daily"),
        Some(NotificationState::Delivered)
    );

    h.engine.scheduler().cancel_goal("water").await;
    assert_eq!(h.engine.router().state("goal_water_daily"), None);
}

#[tokio::test]
async fn test_skip_marks_goal_skipped() {
    let h = harness().await;
    h.add_goal("water", "hydration");
    let mut events = h.engine.subscribe();

    let identifier = h.deliver_goal("water", "hydration").await;
    h.center.respond(&identifier, action(NotificationAction::SkipGoal)).await;

    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::GoalSkipped {
            goal_id: "water".into()
        }
    );
    assert_eq!(h.db.goal("water").unwrap().unwrap().status, GoalStatus::Skipped);
}

#[tokio::test]
async fn test_recommendation_decline_and_tap() {
    let h = harness().await;
    let mut events = h.engine.subscribe();
    for id in ["r1", "r2"] {
        h.db.upsert_recommendation(&RecommendationRecord {
            id: id.into(),
            title: "Cut caffeine after 2pm".into(),
            category: "Sleep".into(),
            status: RecommendationStatus::Pending,
            updated_at: at(1, 8, 0),
        })
        .unwrap();
        let spec = NotificationSpec::new(
            NotificationPayload::Recommendation(RecommendationPayload {
                recommendation_id: id.into(),
                category: RecommendationCategory::Sleep,
                priority: 3,
            }),
            "Sleep tip",
            "",
        )
        .at(at(NOW_DAY, 9, 0));
        h.engine.scheduler().schedule_recommendation(spec).await;
        h.center.deliver(&format!("recommendation_{id}"), false);
    }

    h.center
        .respond("recommendation_r1", action(NotificationAction::DeclineRecommendation))
        .await;
    h.center.respond("recommendation_r2", ResponseAction::Tap).await;

    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::RecommendationDeclined {
            recommendation_id: "r1".into()
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::OpenRecommendationDetails {
            recommendation_id: "r2".into()
        }
    );
    assert_eq!(
        h.db.recommendation("r1").unwrap().unwrap().status,
        RecommendationStatus::Declined
    );
    assert_eq!(
        h.db.recommendation("r2").unwrap().unwrap().status,
        RecommendationStatus::Viewed
    );
}

#[tokio::test]
async fn test_malformed_action_is_logged_and_ignored() {
    let h = harness().await;
    h.add_goal("water", "hydration");
    let mut events = h.engine.subscribe();

    let identifier = h.deliver_goal("water", "hydration").await;
    h.center
        .respond(&identifier, ResponseAction::Action("LAUNCH_ROCKET".into()))
        .await;
    // An action from another kind's set is malformed too
    h.center.respond(&identifier, action(NotificationAction::Upgrade)).await;

    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
    assert_eq!(h.db.goal("water").unwrap().unwrap().status, GoalStatus::Active);
    assert!(h.engine.scheduler().personalization().history().samples("goal_reminders").is_empty());
}

#[tokio::test]
async fn test_only_engaged_responses_feed_personalization() {
    let h = harness().await;
    h.add_goal("a", "hydration");
    h.add_goal("b", "hydration");

    let first = h.deliver_goal("a", "hydration").await;
    let second = h.deliver_goal("b", "hydration").await;
    h.center.respond(&first, ResponseAction::Dismiss).await;
    h.center.respond(&second, ResponseAction::Tap).await;

    let history = h.engine.scheduler().personalization().history();
    assert_eq!(history.samples("goal_reminders"), &[8u8]);
    assert_eq!(h.engine.router().state(&first), Some(NotificationState::Dismissed));
}

#[tokio::test]
async fn test_foreground_presentation_policy() {
    let h = harness().await;
    let spec = NotificationSpec::new(
        NotificationPayload::HealthAlert(HealthAlertPayload {
            alert_id: "hr-high".into(),
            metric: "heart_rate".into(),
            value: 128.0,
        }),
        "High heart rate",
        "Your resting heart rate is unusually high",
    );
    h.engine.scheduler().schedule_health_alert(spec).await;

    assert_eq!(
        h.center.deliver("health_alert_hr-high", true),
        Some(PresentationOptions::FULL)
    );
    assert_eq!(
        h.engine.router().state("health_alert_hr-high"),
        Some(NotificationState::Delivered)
    );
}

#[tokio::test]
async fn test_session_and_offer_actions() {
    let h = harness().await;
    h.engine
        .scheduler()
        .update_preferences([("marketing".to_string(), true)].into_iter().collect());
    let mut events = h.engine.subscribe();

    let session = NotificationSpec::new(
        NotificationPayload::Session(SessionPayload {
            session_id: "calm".into(),
            starts_at: Some(at(NOW_DAY, 12, 0)),
        }),
        "Meditation",
        "",
    );
    let offer = NotificationSpec::new(
        NotificationPayload::PremiumOffer(PremiumOfferPayload {
            offer_id: "summer".into(),
            discount_percent: None,
        }),
        "Premium",
        "",
    );
    h.engine.scheduler().schedule_session(session).await;
    h.engine.scheduler().schedule_premium_offer(offer).await;
    h.center.deliver("session_calm", false);
    h.center.deliver("premium_offer_summer", false);

    h.center
        .respond("session_calm", action(NotificationAction::RescheduleSession))
        .await;
    h.center
        .respond("premium_offer_summer", action(NotificationAction::Upgrade))
        .await;

    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::RescheduleAudioSession {
            session_id: "calm".into()
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        AppEvent::OpenSubscriptionUI {
            offer_id: "summer".into()
        }
    );
    assert!(h.is_pending("session_calm").await);
}
