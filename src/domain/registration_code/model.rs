//! Registration code, redemption and invoice entities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Where a registration code came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSource {
    /// Minted by a purchased bundle order
    Order(i32),
    /// Issued against an invoice, no card payment
    Invoice(i32),
    /// Neither reference set (administrative grant)
    Unassigned,
}

/// A single-use grant of free enrollment in a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseRegistrationCode {
    pub id: i32,
    /// Globally unique
    pub code: String,
    pub course_id: String,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    pub order_id: Option<i32>,
    pub invoice_id: Option<i32>,
}

impl CourseRegistrationCode {
    pub fn new(
        code: impl Into<String>,
        course_id: impl Into<String>,
        created_by: i32,
        order_id: Option<i32>,
        invoice_id: Option<i32>,
    ) -> Self {
        Self {
            id: 0,
            code: code.into(),
            course_id: course_id.into(),
            created_by,
            created_at: Utc::now(),
            order_id,
            invoice_id,
        }
    }

    /// The order reference wins if both happen to be set; storage does not
    /// enforce exclusivity.
    pub fn source(&self) -> CodeSource {
        match (self.order_id, self.invoice_id) {
            (Some(order_id), _) => CodeSource::Order(order_id),
            (None, Some(invoice_id)) => CodeSource::Invoice(invoice_id),
            (None, None) => CodeSource::Unassigned,
        }
    }
}

/// Record that a registration code was consumed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationCodeRedemption {
    pub id: i32,
    /// `None` for invoice-sourced codes redeemed directly by a user
    pub order_id: Option<i32>,
    pub registration_code_id: i32,
    pub redeemed_by: i32,
    pub redeemed_at: DateTime<Utc>,
}

impl RegistrationCodeRedemption {
    pub fn new(registration_code_id: i32, redeemed_by: i32, order_id: Option<i32>) -> Self {
        Self {
            id: 0,
            order_id,
            registration_code_id,
            redeemed_by,
            redeemed_at: Utc::now(),
        }
    }
}

/// Billing record for bulk purchases settled outside card payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Invoice {
    pub id: i32,
    #[validate(length(min = 1, max = 255))]
    pub company_name: String,
    #[validate(length(min = 1, max = 255))]
    pub company_contact_name: String,
    #[validate(email)]
    pub company_contact_email: String,
    #[validate(length(min = 1, max = 255))]
    pub recipient_name: String,
    #[validate(email)]
    pub recipient_email: String,
    #[validate(length(min = 1, max = 255))]
    pub address_line_1: String,
    pub address_line_2: Option<String>,
    pub address_line_3: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(length(max = 15))]
    pub zip: Option<String>,
    #[validate(length(max = 64))]
    pub country: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub course_id: String,
    pub total_amount: Decimal,
    pub internal_reference: Option<String>,
    #[validate(length(max = 63))]
    pub customer_reference_number: Option<String>,
    pub is_valid: bool,
}
