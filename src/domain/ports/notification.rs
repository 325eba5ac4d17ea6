//! Notification port for fire-and-forget outbound messages
//!
//! Mail delivery is owned elsewhere. Callers catch and log every failure
//! returned by [`NotificationPort::send`]; a notification never fails the
//! operation that triggered it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainResult;

/// Template selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    OrderConfirmation,
    /// Carries the minted registration codes
    BusinessOrderConfirmation,
    /// Sent to billing support when a certificate refund is requested
    RefundRequested,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderConfirmation => "order_confirmation",
            Self::BusinessOrderConfirmation => "business_order_confirmation",
            Self::RefundRequested => "refund_requested",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientKind {
    Purchaser,
    CompanyContact,
    InvoiceRecipient,
    BillingSupport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub kind: RecipientKind,
    pub name: String,
    /// Set when the recipient is a platform user
    pub user_id: Option<i32>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub recipients: Vec<Recipient>,
    pub subject: String,
    /// Template context
    pub context: serde_json::Value,
    pub attachment: Option<Attachment>,
}

#[async_trait]
pub trait NotificationPort: Send + Sync {
    /// Hand the notification to the delivery layer.
    ///
    /// Errors are `DomainError::Delivery`.
    async fn send(&self, notification: Notification) -> DomainResult<()>;
}
