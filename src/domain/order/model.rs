//! Order domain entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default currency for new carts (lower case ISO 4217)
pub const DEFAULT_CURRENCY: &str = "usd";

/// Order status
///
/// Transitions are one-directional: `Cart -> Paying -> Purchased -> Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// The user is selecting what they want to purchase
    Cart,
    /// The user has been sent to the payment processor; the order must not be modified
    Paying,
    /// The user has successfully purchased the items in the order
    Purchased,
    /// The order has been refunded
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cart => "cart",
            Self::Paying => "paying",
            Self::Purchased => "purchased",
            Self::Refunded => "refunded",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cart" => Some(Self::Cart),
            "paying" => Some(Self::Paying),
            "purchased" => Some(Self::Purchased),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }

    /// Whether a purchase may still be committed from this status
    pub fn is_purchasable(&self) -> bool {
        matches!(self, Self::Cart | Self::Paying)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Purchase classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Personal,
    /// Any line with quantity > 1; seats are bought as registration codes
    Business,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "personal" => Some(Self::Personal),
            "business" => Some(Self::Business),
            _ => None,
        }
    }
}

/// Billing snapshot recorded when the processor confirms payment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub first_name: String,
    pub last_name: String,
    pub street1: String,
    pub street2: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
    /// Last 4 digits of the card
    pub card_last4: String,
    pub card_type: String,
    /// Raw processor reply, kept for completeness
    pub processor_reply_dump: String,
}

/// Billing details entered for a business (bulk) purchase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BulkBillingDetails {
    #[validate(length(max = 255))]
    pub company_name: Option<String>,
    #[validate(length(max = 255))]
    pub company_contact_name: Option<String>,
    #[validate(email)]
    pub company_contact_email: Option<String>,
    #[validate(length(max = 255))]
    pub recipient_name: Option<String>,
    #[validate(email)]
    pub recipient_email: Option<String>,
    /// Purchase order number of the buying organization
    #[validate(length(max = 63))]
    pub customer_reference_number: Option<String>,
}

/// Order: a shopping cart before purchase, a receipt afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub currency: String,
    pub status: OrderStatus,
    pub purchase_time: Option<DateTime<Utc>>,
    pub refunded_time: Option<DateTime<Utc>>,
    pub billing: BillingDetails,
    pub order_type: OrderType,
    pub bulk: BulkBillingDetails,
}

impl Order {
    /// A fresh, unsaved cart for `user_id`
    pub fn new_cart(user_id: i32) -> Self {
        Self {
            id: 0,
            user_id,
            currency: DEFAULT_CURRENCY.to_string(),
            status: OrderStatus::Cart,
            purchase_time: None,
            refunded_time: None,
            billing: BillingDetails::default(),
            order_type: OrderType::Personal,
            bulk: BulkBillingDetails::default(),
        }
    }

    pub fn is_cart(&self) -> bool {
        self.status == OrderStatus::Cart
    }

    pub fn is_business(&self) -> bool {
        self.order_type == OrderType::Business
    }

    /// Copy the processor's billing snapshot onto the order.
    ///
    /// Street lines, card data and the raw processor reply are only kept
    /// when `retain_full` is set.
    pub fn record_billing(&mut self, billing: BillingDetails, retain_full: bool) {
        let BillingDetails {
            first_name,
            last_name,
            street1,
            street2,
            city,
            state,
            postal_code,
            country,
            card_last4,
            card_type,
            processor_reply_dump,
        } = billing;

        self.billing.first_name = first_name;
        self.billing.last_name = last_name;
        self.billing.city = city;
        self.billing.state = state;
        self.billing.postal_code = postal_code;
        self.billing.country = country;
        if retain_full {
            self.billing.street1 = street1;
            self.billing.street2 = street2;
            self.billing.card_last4 = card_last4;
            self.billing.card_type = card_type;
            self.billing.processor_reply_dump = processor_reply_dump;
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
