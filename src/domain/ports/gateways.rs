//! Outbound gateways to the catalog, enrollments and identity verification
//!
//! These are owned by other subsystems. The cart only ever talks to them
//! through the traits below, so tests can run against in-memory fakes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::DomainResult;

/// Mode used when a requested mode is not offered by the course
pub const DEFAULT_MODE_SLUG: &str = "honor";
pub const DEFAULT_MODE_NAME: &str = "Honor Code Certificate";
/// Mode whose certificates are refundable and reported on
pub const VERIFIED_MODE_SLUG: &str = "verified";

// ── Catalog ────────────────────────────────────────────────────

/// Purchasable enrollment mode of a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMode {
    pub slug: String,
    pub name: String,
    pub min_price: Decimal,
    pub currency: String,
}

impl CourseMode {
    /// Free `honor` mode priced in usd
    pub fn default_mode() -> Self {
        Self {
            slug: DEFAULT_MODE_SLUG.to_string(),
            name: DEFAULT_MODE_NAME.to_string(),
            min_price: Decimal::ZERO,
            currency: "usd".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub display_name: String,
    pub modes: Vec<CourseMode>,
}

impl Course {
    pub fn mode(&self, slug: &str) -> Option<&CourseMode> {
        self.modes.iter().find(|m| m.slug == slug)
    }

    /// The requested mode, or the default mode when the course doesn't offer it
    pub fn mode_or_default(&self, slug: &str) -> CourseMode {
        self.mode(slug).cloned().unwrap_or_else(CourseMode::default_mode)
    }

    /// Minimum price of `slug` in `currency`, zero when not offered
    pub fn min_price_for(&self, slug: &str, currency: &str) -> Decimal {
        self.modes
            .iter()
            .find(|m| m.slug == slug && m.currency == currency)
            .map(|m| m.min_price)
            .unwrap_or(Decimal::ZERO)
    }
}

/// Read-only course catalog
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn course_exists(&self, course_id: &str) -> DomainResult<bool>;
    async fn get_course(&self, course_id: &str) -> DomainResult<Option<Course>>;
}

// ── Enrollment ─────────────────────────────────────────────────

/// Handle to a user's enrollment in a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: i32,
    pub user_id: i32,
    pub course_id: String,
    pub mode: String,
    pub is_active: bool,
    /// Still inside the refund window
    pub refund_eligible: bool,
}

impl Enrollment {
    pub fn refundable(&self) -> bool {
        self.refund_eligible
    }
}

#[async_trait]
pub trait EnrollmentGateway: Send + Sync {
    async fn is_enrolled(&self, user_id: i32, course_id: &str) -> DomainResult<bool>;
    async fn get_or_create_enrollment(&self, user_id: i32, course_id: &str) -> DomainResult<Enrollment>;
    async fn enroll(&self, user_id: i32, course_id: &str, mode: &str) -> DomainResult<Enrollment>;
    async fn change_mode(&self, enrollment_id: i32, mode: &str) -> DomainResult<()>;
    async fn activate(&self, enrollment_id: i32) -> DomainResult<()>;
}

// ── Identity verification ──────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationAttempt {
    pub id: i32,
    pub user_id: i32,
}

#[async_trait]
pub trait VerificationGateway: Send + Sync {
    /// Pending attempt for the user, if one is waiting to be submitted
    async fn active_verification_for(&self, user_id: i32) -> DomainResult<Option<VerificationAttempt>>;
    async fn submit(&self, attempt: &VerificationAttempt) -> DomainResult<()>;
}
