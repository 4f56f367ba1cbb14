//! Top-level wiring: store, scheduler, router and delivery service.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::clock::Clock;
use crate::delivery::{AuthorizationProvider, DeliveryService, NotificationHandler};
use crate::events::AppEvent;
use crate::router::ResponseRouter;
use crate::scheduler::NotificationScheduler;
use crate::storage::{Config, Database};

/// A running notification engine.
///
/// The delivery service only keeps a weak reference to the router, so the
/// engine must be kept alive for responses to be handled.
pub struct NotificationEngine {
    db: Arc<Database>,
    scheduler: Arc<NotificationScheduler>,
    router: Arc<ResponseRouter>,
}

impl NotificationEngine {
    /// Build the engine, ask for authorization when it is not yet granted
    /// and register the router as the delivery service's handler.
    pub async fn start(
        db: Arc<Database>,
        delivery: Arc<dyn DeliveryService>,
        authorization: Arc<dyn AuthorizationProvider>,
        config: Config,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = Arc::new(NotificationScheduler::new(
            db.clone(),
            delivery.clone(),
            authorization,
            config,
            clock,
        ));
        if !scheduler.is_authorized() {
            scheduler.request_authorization().await;
        }

        let router = Arc::new(ResponseRouter::new(db.clone(), scheduler.clone()));
        let handler: Arc<dyn NotificationHandler> = router.clone();
        delivery.set_handler(Arc::downgrade(&handler));

        scheduler.refresh().await;
        tracing::info!(
            authorized = scheduler.is_authorized(),
            pending = scheduler.pending().len(),
            "notification engine started"
        );

        Self {
            db,
            scheduler,
            router,
        }
    }

    pub fn scheduler(&self) -> &Arc<NotificationScheduler> {
        &self.scheduler
    }

    pub fn router(&self) -> &Arc<ResponseRouter> {
        &self.router
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Events produced by handled notification responses.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.router.subscribe()
    }
}
