//! Delivery service seams.
//!
//! The platform's notification center is an external collaborator. The
//! engine talks to it through [`DeliveryService`], asks permission through
//! [`AuthorizationProvider`], and receives its callbacks through
//! [`NotificationHandler`], which the response router implements and
//! registers once at construction.

mod memory;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use crate::error::DeliveryError;
use crate::notification::{DeliveredNotification, NotificationRequest};

pub use memory::MemoryDeliveryCenter;

/// The platform notification center.
#[async_trait]
pub trait DeliveryService: Send + Sync {
    /// Register (or replace) a request under its identifier.
    async fn register(&self, request: NotificationRequest) -> Result<(), DeliveryError>;

    /// Authoritative list of requests waiting to fire.
    async fn pending(&self) -> Vec<NotificationRequest>;

    /// Authoritative list of notifications already shown.
    async fn delivered(&self) -> Vec<DeliveredNotification>;

    /// Remove the identifiers from both the pending and delivered lists.
    async fn cancel(&self, identifiers: &[String]);

    /// Clear both lists.
    async fn cancel_all(&self);

    /// Install the callback target for presentation and responses.
    fn set_handler(&self, handler: Weak<dyn NotificationHandler>);
}

/// Permission to post notifications.
#[async_trait]
pub trait AuthorizationProvider: Send + Sync {
    fn is_authorized(&self) -> bool;

    /// Prompt the user; resolves to whether permission was granted.
    async fn request_authorization(&self) -> bool;
}

/// Callbacks from the delivery service back into the engine.
#[async_trait]
pub trait NotificationHandler: Send + Sync {
    /// A notification is about to be shown while the app is in the foreground.
    fn will_present(&self, notification: &DeliveredNotification) -> PresentationOptions;

    /// The user responded to a delivered notification.
    async fn did_respond(&self, response: NotificationResponse);
}

/// How a foreground notification is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationOptions {
    pub banner: bool,
    pub sound: bool,
    pub badge: bool,
    pub list: bool,
}

impl PresentationOptions {
    pub const FULL: Self = Self {
        banner: true,
        sound: true,
        badge: true,
        list: true,
    };
    pub const STANDARD: Self = Self {
        banner: true,
        sound: true,
        badge: false,
        list: true,
    };
    pub const LIST_ONLY: Self = Self {
        banner: false,
        sound: false,
        badge: false,
        list: true,
    };
}

/// What the user did with a delivered notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum ResponseAction {
    /// Opened the notification itself.
    Tap,
    /// Swiped it away.
    Dismiss,
    /// Chose a named action button.
    Action(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub notification: DeliveredNotification,
    pub action: ResponseAction,
    pub responded_at: NaiveDateTime,
}

/// Authorization with a fixed answer, for tests and headless use.
#[derive(Debug)]
pub struct StaticAuthorization {
    granted: AtomicBool,
    grant_on_request: bool,
}

impl StaticAuthorization {
    pub fn granted() -> Self {
        Self {
            granted: AtomicBool::new(true),
            grant_on_request: true,
        }
    }

    pub fn denied() -> Self {
        Self {
            granted: AtomicBool::new(false),
            grant_on_request: false,
        }
    }

    /// Not yet authorized, but the prompt will be accepted.
    pub fn undetermined() -> Self {
        Self {
            granted: AtomicBool::new(false),
            grant_on_request: true,
        }
    }
}

#[async_trait]
impl AuthorizationProvider for StaticAuthorization {
    fn is_authorized(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    async fn request_authorization(&self) -> bool {
        if self.grant_on_request {
            self.granted.store(true, Ordering::SeqCst);
        }
        self.is_authorized()
    }
}
