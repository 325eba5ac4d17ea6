//! Registration code issuance port

use async_trait::async_trait;

use crate::domain::registration_code::CourseRegistrationCode;
use crate::domain::DomainResult;

#[async_trait]
pub trait CodeIssuer: Send + Sync {
    /// Mint and store one fresh code for `course_id`.
    ///
    /// `order_id` is set for codes bought in a bundle, `invoice_id` for codes
    /// settled by invoice.
    async fn mint_registration_code(
        &self,
        user_id: i32,
        course_id: &str,
        invoice_id: Option<i32>,
        order_id: Option<i32>,
    ) -> DomainResult<CourseRegistrationCode>;
}
