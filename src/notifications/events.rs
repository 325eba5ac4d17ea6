//! Notification events
//!
//! Every outbound notification travels over the bus as one of these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{Notification, NotificationKind, Recipient};

/// Event types for notifications
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// Receipt for a personal purchase
    OrderConfirmation(Notification),
    /// Receipt with minted registration codes
    BusinessOrderConfirmation(Notification),
    /// Billing support must process a certificate refund
    RefundRequested(Notification),
}

impl Event {
    pub fn from_notification(notification: Notification) -> Self {
        match notification.kind {
            NotificationKind::OrderConfirmation => Event::OrderConfirmation(notification),
            NotificationKind::BusinessOrderConfirmation => Event::BusinessOrderConfirmation(notification),
            NotificationKind::RefundRequested => Event::RefundRequested(notification),
        }
    }

    /// Get the event type name
    pub fn event_type(&self) -> &'static str {
        self.notification().kind.as_str()
    }

    pub fn notification(&self) -> &Notification {
        match self {
            Event::OrderConfirmation(n) | Event::BusinessOrderConfirmation(n) | Event::RefundRequested(n) => n,
        }
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.notification().recipients
    }
}

/// Event with delivery metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
