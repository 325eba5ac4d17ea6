//! In-memory fakes for the external gateways, and a ready-wired shop

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rust_decimal::Decimal;

use crate::application::context::ShopContext;
use crate::application::services::{
    CartService, CheckoutService, DiscountService, RefundService, RegistrationCodeService, ReportingService,
};
use crate::config::ShopConfig;
use crate::domain::order::{BillingDetails, Order};
use crate::domain::order_item::OrderItem;
use crate::domain::ports::{
    CatalogGateway, Course, CourseMode, Enrollment, EnrollmentGateway, Notification, NotificationPort,
    VerificationAttempt, VerificationGateway,
};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::infrastructure::storage::InMemoryRepositoryProvider;

pub const COURSE_A: &str = "course-v1:MITx+6.002x+2024";
pub const COURSE_B: &str = "course-v1:StanfordX+DB+2024";

pub fn sample_billing() -> BillingDetails {
    BillingDetails {
        first_name: "John".into(),
        last_name: "Smith".into(),
        street1: "11 Cambridge Center".into(),
        street2: "Suite 101".into(),
        city: "Cambridge".into(),
        state: "MA".into(),
        postal_code: "02142".into(),
        country: "US".into(),
        card_last4: "1111".into(),
        card_type: "001".into(),
        processor_reply_dump: "{\"decision\":\"ACCEPT\"}".into(),
    }
}

fn mode(slug: &str, name: &str, min_price: Decimal) -> CourseMode {
    CourseMode {
        slug: slug.into(),
        name: name.into(),
        min_price,
        currency: "usd".into(),
    }
}

// ── Catalog ────────────────────────────────────────────────────

pub struct FakeCatalog {
    courses: Mutex<HashMap<String, Course>>,
}

impl FakeCatalog {
    fn seeded() -> Self {
        let courses = [
            Course {
                id: COURSE_A.into(),
                display_name: "Circuits and Electronics".into(),
                modes: vec![
                    mode("honor", "Honor Code Certificate", Decimal::ZERO),
                    mode("verified", "Verified Certificate", Decimal::new(10000, 2)),
                ],
            },
            Course {
                id: COURSE_B.into(),
                display_name: "Introduction to Databases".into(),
                modes: vec![
                    mode("honor", "Honor Code Certificate", Decimal::ZERO),
                    mode("verified", "Verified Certificate", Decimal::new(5000, 2)),
                ],
            },
        ];
        Self {
            courses: Mutex::new(courses.into_iter().map(|c| (c.id.clone(), c)).collect()),
        }
    }

    pub fn remove_course(&self, course_id: &str) {
        self.courses.lock().remove(course_id);
    }
}

#[async_trait]
impl CatalogGateway for FakeCatalog {
    async fn course_exists(&self, course_id: &str) -> DomainResult<bool> {
        Ok(self.courses.lock().contains_key(course_id))
    }

    async fn get_course(&self, course_id: &str) -> DomainResult<Option<Course>> {
        Ok(self.courses.lock().get(course_id).cloned())
    }
}

// ── Enrollments ────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeEnrollments {
    enrollments: Mutex<Vec<Enrollment>>,
    failing_courses: Mutex<HashSet<String>>,
}

impl FakeEnrollments {
    /// Active enrollment, created or upgraded in place
    pub fn enroll_now(&self, user_id: i32, course_id: &str, mode: &str) -> Enrollment {
        let mut enrollments = self.enrollments.lock();
        if let Some(existing) = enrollments
            .iter_mut()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
        {
            existing.mode = mode.to_string();
            existing.is_active = true;
            return existing.clone();
        }
        let enrollment = Enrollment {
            id: enrollments.len() as i32 + 1,
            user_id,
            course_id: course_id.to_string(),
            mode: mode.to_string(),
            is_active: true,
            refund_eligible: false,
        };
        enrollments.push(enrollment.clone());
        enrollment
    }

    pub fn find(&self, user_id: i32, course_id: &str) -> Option<Enrollment> {
        self.enrollments
            .lock()
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned()
    }

    /// Mode of the user's active enrollment
    pub fn mode_of(&self, user_id: i32, course_id: &str) -> Option<String> {
        self.find(user_id, course_id).filter(|e| e.is_active).map(|e| e.mode)
    }

    pub fn fail_enrollment_in(&self, course_id: &str) {
        self.failing_courses.lock().insert(course_id.to_string());
    }

    fn by_id(&self, enrollment_id: i32, apply: impl FnOnce(&mut Enrollment)) -> DomainResult<()> {
        let mut enrollments = self.enrollments.lock();
        let enrollment = enrollments
            .iter_mut()
            .find(|e| e.id == enrollment_id)
            .ok_or_else(|| DomainError::not_found("Enrollment", "id", enrollment_id))?;
        apply(enrollment);
        Ok(())
    }
}

#[async_trait]
impl EnrollmentGateway for FakeEnrollments {
    async fn is_enrolled(&self, user_id: i32, course_id: &str) -> DomainResult<bool> {
        Ok(self.mode_of(user_id, course_id).is_some())
    }

    async fn get_or_create_enrollment(&self, user_id: i32, course_id: &str) -> DomainResult<Enrollment> {
        if let Some(existing) = self.find(user_id, course_id) {
            return Ok(existing);
        }
        let mut enrollments = self.enrollments.lock();
        let enrollment = Enrollment {
            id: enrollments.len() as i32 + 1,
            user_id,
            course_id: course_id.to_string(),
            mode: "honor".to_string(),
            is_active: false,
            refund_eligible: false,
        };
        enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn enroll(&self, user_id: i32, course_id: &str, mode: &str) -> DomainResult<Enrollment> {
        if self.failing_courses.lock().contains(course_id) {
            return Err(DomainError::Storage(format!("enrollment service rejected {}", course_id)));
        }
        Ok(self.enroll_now(user_id, course_id, mode))
    }

    async fn change_mode(&self, enrollment_id: i32, mode: &str) -> DomainResult<()> {
        self.by_id(enrollment_id, |e| e.mode = mode.to_string())
    }

    async fn activate(&self, enrollment_id: i32) -> DomainResult<()> {
        self.by_id(enrollment_id, |e| e.is_active = true)
    }
}

// ── Verification ───────────────────────────────────────────────

#[derive(Default)]
pub struct FakeVerifications {
    pending: Mutex<HashMap<i32, i32>>,
    submitted: Mutex<Vec<i32>>,
    failing: Mutex<bool>,
}

impl FakeVerifications {
    pub fn add_pending(&self, user_id: i32, attempt_id: i32) {
        self.pending.lock().insert(user_id, attempt_id);
    }

    pub fn fail_submissions(&self) {
        *self.failing.lock() = true;
    }

    pub fn submitted(&self) -> Vec<i32> {
        self.submitted.lock().clone()
    }
}

#[async_trait]
impl VerificationGateway for FakeVerifications {
    async fn active_verification_for(&self, user_id: i32) -> DomainResult<Option<VerificationAttempt>> {
        Ok(self
            .pending
            .lock()
            .get(&user_id)
            .map(|&id| VerificationAttempt { id, user_id }))
    }

    async fn submit(&self, attempt: &VerificationAttempt) -> DomainResult<()> {
        if *self.failing.lock() {
            return Err(DomainError::Storage("verification backend offline".into()));
        }
        self.pending.lock().remove(&attempt.user_id);
        self.submitted.lock().push(attempt.id);
        Ok(())
    }
}

// ── Notifications ──────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
    failing: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    pub fn fail_all(&self) {
        *self.failing.lock() = true;
    }
}

#[async_trait]
impl NotificationPort for RecordingNotifier {
    async fn send(&self, notification: Notification) -> DomainResult<()> {
        if *self.failing.lock() {
            return Err(DomainError::Delivery("smtp unavailable".into()));
        }
        self.sent.lock().push(notification);
        Ok(())
    }
}

// ── Shop ───────────────────────────────────────────────────────

pub struct TestShop {
    pub ctx: ShopContext,
    pub catalog: Arc<FakeCatalog>,
    pub enrollments: Arc<FakeEnrollments>,
    pub verifications: Arc<FakeVerifications>,
    pub notifier: Arc<RecordingNotifier>,
}

impl TestShop {
    pub fn new() -> Self {
        Self::with_config(ShopConfig::default())
    }

    pub fn with_config(shop: ShopConfig) -> Self {
        Self::with_repos(Arc::new(InMemoryRepositoryProvider::new()), shop)
    }

    /// Same fakes over any repository provider
    pub fn with_repos(repos: Arc<dyn RepositoryProvider>, shop: ShopConfig) -> Self {
        let catalog = Arc::new(FakeCatalog::seeded());
        let enrollments = Arc::new(FakeEnrollments::default());
        let verifications = Arc::new(FakeVerifications::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let codes = Arc::new(RegistrationCodeService::new(repos.clone(), shop.registration_code_length));

        let ctx = ShopContext {
            repos,
            catalog: catalog.clone(),
            enrollments: enrollments.clone(),
            verifications: verifications.clone(),
            notifier: notifier.clone(),
            codes,
            shop,
        };
        Self {
            ctx,
            catalog,
            enrollments,
            verifications,
            notifier,
        }
    }

    pub async fn cart(&self, user_id: i32) -> Order {
        self.cart_service().get_or_create_cart(user_id).await.unwrap()
    }

    pub async fn items(&self, order_id: i32) -> Vec<OrderItem> {
        self.ctx.repos.order_items().find_by_order(order_id).await.unwrap()
    }

    pub fn cart_service(&self) -> CartService {
        CartService::new(self.ctx.clone())
    }

    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.ctx.clone())
    }

    pub fn discounts(&self) -> DiscountService {
        DiscountService::new(self.ctx.clone())
    }

    pub fn reporting(&self) -> ReportingService {
        ReportingService::new(self.ctx.clone())
    }

    pub fn refunds(&self) -> RefundService {
        RefundService::new(self.ctx.clone())
    }
}
