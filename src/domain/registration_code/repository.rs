//! Registration code repository interfaces

use async_trait::async_trait;

use super::model::{CourseRegistrationCode, Invoice, RegistrationCodeRedemption};
use crate::domain::order_item::Discount;
use crate::domain::DomainResult;

#[async_trait]
pub trait RegistrationCodeRepository: Send + Sync {
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<CourseRegistrationCode>>;

    /// Insert a code. Fails with `DomainError::Conflict` when the code string is taken.
    async fn save(&self, code: CourseRegistrationCode) -> DomainResult<CourseRegistrationCode>;

    async fn find_by_order(&self, order_id: i32) -> DomainResult<Vec<CourseRegistrationCode>>;

    /// Codes minted by an order for one course, in creation order
    async fn find_by_order_and_course(
        &self,
        order_id: i32,
        course_id: &str,
    ) -> DomainResult<Vec<CourseRegistrationCode>>;

    async fn find_by_invoice(&self, invoice_id: i32) -> DomainResult<Vec<CourseRegistrationCode>>;
}

#[async_trait]
pub trait CodeRedemptionRepository: Send + Sync {
    async fn find_for_code(&self, registration_code_id: i32) -> DomainResult<Option<RegistrationCodeRedemption>>;

    /// Record the redemption of `code` and, when given, write `discount`, in
    /// one atomic step.
    ///
    /// Always reads the primary store. Fails with
    /// `DomainError::CodeAlreadyRedeemed` if the code already has a redemption.
    async fn redeem(
        &self,
        code: &CourseRegistrationCode,
        redemption: RegistrationCodeRedemption,
        discount: Option<&Discount>,
    ) -> DomainResult<RegistrationCodeRedemption>;

    async fn delete_for_order(&self, user_id: i32, order_id: i32) -> DomainResult<u64>;
}

#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Invoice>>;
    async fn save(&self, invoice: Invoice) -> DomainResult<Invoice>;
    /// Returns `false` when no invoice has this id
    async fn set_valid(&self, id: i32, is_valid: bool) -> DomainResult<bool>;
}
