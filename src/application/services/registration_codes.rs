//! Registration code issuance and invoices

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use tracing::{info, warn};
use validator::Validate;

use crate::domain::ports::CodeIssuer;
use crate::domain::registration_code::{CourseRegistrationCode, Invoice};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::money::{round_cents, to_cents};

/// Upper-case letters and digits without the easily confused `0 O 1 I`
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Fresh codes tried before giving up on a collision streak
const MAX_MINT_ATTEMPTS: usize = 10;

/// Longest code the store accepts
pub const MAX_CODE_LENGTH: usize = 32;

pub fn random_code(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub struct RegistrationCodeService {
    repos: Arc<dyn RepositoryProvider>,
    code_length: usize,
}

impl RegistrationCodeService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, code_length: usize) -> Self {
        Self {
            repos,
            code_length: code_length.clamp(1, MAX_CODE_LENGTH),
        }
    }

    // ── Invoices ───────────────────────────────────────────────

    pub async fn create_invoice(&self, mut invoice: Invoice) -> DomainResult<Invoice> {
        invoice
            .validate()
            .map_err(|e| DomainError::Validation(format!("Invalid invoice: {}", e)))?;
        invoice.total_amount = round_cents(invoice.total_amount);
        to_cents(invoice.total_amount)?;
        let invoice = self.repos.invoices().save(invoice).await?;
        info!(invoice_id = invoice.id, course_id = %invoice.course_id, "Invoice created");
        Ok(invoice)
    }

    /// Mint `count` codes settled by a valid invoice
    pub async fn mint_for_invoice(
        &self,
        invoice_id: i32,
        created_by: i32,
        count: usize,
    ) -> DomainResult<Vec<CourseRegistrationCode>> {
        let invoice = self
            .repos
            .invoices()
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Invoice", "id", invoice_id))?;
        if !invoice.is_valid {
            return Err(DomainError::Validation(format!("Invoice {} is no longer valid", invoice_id)));
        }

        let mut codes = Vec::with_capacity(count);
        for _ in 0..count {
            codes.push(
                self.mint_registration_code(created_by, &invoice.course_id, Some(invoice_id), None)
                    .await?,
            );
        }
        info!(invoice_id, count, course_id = %invoice.course_id, "Minted invoice registration codes");
        Ok(codes)
    }

    pub async fn set_invoice_validity(&self, invoice_id: i32, is_valid: bool) -> DomainResult<()> {
        if !self.repos.invoices().set_valid(invoice_id, is_valid).await? {
            return Err(DomainError::not_found("Invoice", "id", invoice_id));
        }
        info!(invoice_id, is_valid, "Invoice validity changed");
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────

    pub async fn codes_for_order(&self, order_id: i32) -> DomainResult<Vec<CourseRegistrationCode>> {
        self.repos.registration_codes().find_by_order(order_id).await
    }

    /// Codes minted by an order for one course, oldest first
    pub async fn codes_for_order_and_course(
        &self,
        order_id: i32,
        course_id: &str,
    ) -> DomainResult<Vec<CourseRegistrationCode>> {
        self.repos
            .registration_codes()
            .find_by_order_and_course(order_id, course_id)
            .await
    }

    pub async fn codes_for_invoice(&self, invoice_id: i32) -> DomainResult<Vec<CourseRegistrationCode>> {
        self.repos.registration_codes().find_by_invoice(invoice_id).await
    }

    pub async fn is_redeemed(&self, code: &str) -> DomainResult<bool> {
        let Some(code) = self.repos.registration_codes().find_by_code(code).await? else {
            return Err(DomainError::not_found("CourseRegistrationCode", "code", code));
        };
        Ok(self.repos.code_redemptions().find_for_code(code.id).await?.is_some())
    }
}

#[async_trait]
impl CodeIssuer for RegistrationCodeService {
    async fn mint_registration_code(
        &self,
        user_id: i32,
        course_id: &str,
        invoice_id: Option<i32>,
        order_id: Option<i32>,
    ) -> DomainResult<CourseRegistrationCode> {
        for attempt in 1..=MAX_MINT_ATTEMPTS {
            let candidate = CourseRegistrationCode::new(
                random_code(self.code_length),
                course_id,
                user_id,
                order_id,
                invoice_id,
            );
            match self.repos.registration_codes().save(candidate).await {
                Ok(code) => return Ok(code),
                Err(DomainError::Conflict(_)) => {
                    warn!(course_id, attempt, "Registration code collision, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(DomainError::Conflict(format!(
            "Could not mint a unique registration code for {} after {} attempts",
            course_id, MAX_MINT_ATTEMPTS
        )))
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::infrastructure::storage::InMemoryRepositoryProvider;

    fn service(length: usize) -> RegistrationCodeService {
        RegistrationCodeService::new(Arc::new(InMemoryRepositoryProvider::new()), length)
    }

    fn invoice() -> Invoice {
        Invoice {
            id: 0,
            company_name: "Acme Learning".into(),
            company_contact_name: "Jane Buyer".into(),
            company_contact_email: "jane@acme.example".into(),
            recipient_name: "Accounts Payable".into(),
            recipient_email: "ap@acme.example".into(),
            address_line_1: "1 Main St".into(),
            address_line_2: None,
            address_line_3: None,
            city: Some("Boston".into()),
            state: Some("MA".into()),
            zip: Some("02110".into()),
            country: Some("US".into()),
            course_id: "course-v1:edX+DemoX+Demo".into(),
            total_amount: Decimal::new(150000, 2),
            internal_reference: Some("SF-1".into()),
            customer_reference_number: Some("PO-7781".into()),
            is_valid: true,
        }
    }

    #[test]
    fn random_codes_use_unambiguous_alphabet() {
        let code = random_code(64);
        assert_eq!(code.len(), 64);
        assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        assert!(!code.contains('0') && !code.contains('O') && !code.contains('I') && !code.contains('1'));
    }

    #[tokio::test]
    async fn minted_codes_have_configured_length() {
        let svc = service(12);
        let code = svc
            .mint_registration_code(1, "course-v1:edX+DemoX+Demo", None, Some(5))
            .await
            .unwrap();
        assert_eq!(code.code.len(), 12);
        assert_eq!(code.order_id, Some(5));
        assert_eq!(svc.codes_for_order(5).await.unwrap().len(), 1);
        assert!(!svc.is_redeemed(&code.code).await.unwrap());
    }

    #[tokio::test]
    async fn exhausted_alphabet_reports_conflict() {
        // one-character codes: 32 possibilities, the 33rd must fail
        let svc = service(1);
        let mut minted = 0;
        let mut failed = false;
        for _ in 0..200 {
            match svc.mint_registration_code(1, "c", None, None).await {
                Ok(_) => minted += 1,
                Err(DomainError::Conflict(_)) => {
                    failed = true;
                    break;
                }
                Err(e) => panic!("unexpected error {e}"),
            }
        }
        assert!(minted <= CODE_ALPHABET.len());
        assert!(failed);
    }

    #[tokio::test]
    async fn invoice_lifecycle() {
        let svc = service(8);
        let inv = svc.create_invoice(invoice()).await.unwrap();

        let codes = svc.mint_for_invoice(inv.id, 1, 3).await.unwrap();
        assert_eq!(codes.len(), 3);
        assert!(codes.iter().all(|c| c.invoice_id == Some(inv.id) && c.order_id.is_none()));
        assert_eq!(svc.codes_for_invoice(inv.id).await.unwrap().len(), 3);

        svc.set_invoice_validity(inv.id, false).await.unwrap();
        assert!(matches!(
            svc.mint_for_invoice(inv.id, 1, 1).await,
            Err(DomainError::Validation(_))
        ));
        assert!(svc.set_invoice_validity(999, true).await.is_err());
    }

    #[tokio::test]
    async fn invalid_invoice_is_rejected() {
        let svc = service(8);
        let mut bad = invoice();
        bad.company_contact_email = "not an email".into();
        assert!(matches!(svc.create_invoice(bad).await, Err(DomainError::Validation(_))));

        let mut huge = invoice();
        huge.total_amount = Decimal::MAX;
        assert!(matches!(svc.create_invoice(huge).await, Err(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn invoice_total_is_rounded_to_the_cent() {
        let svc = service(8);
        let mut inv = invoice();
        inv.total_amount = Decimal::new(1500005, 3);
        let inv = svc.create_invoice(inv).await.unwrap();
        assert_eq!(inv.total_amount, Decimal::new(150001, 2));
    }
}
