//! SeaORM implementation of the registration code, code redemption and
//! invoice repositories

use async_trait::async_trait;
use log::{debug, info, warn};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};

use super::order_item_repository::write_discount;
use super::{db_err, is_unique_violation};
use crate::domain::order_item::Discount;
use crate::domain::registration_code::{
    CodeRedemptionRepository, CourseRegistrationCode, Invoice, InvoiceRepository, RegistrationCodeRedemption,
    RegistrationCodeRepository,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{invoice, registration_code, registration_code_redemption};
use crate::shared::money::{from_cents, to_cents};

// ── Conversion helpers ──────────────────────────────────────────

fn code_to_domain(m: registration_code::Model) -> CourseRegistrationCode {
    CourseRegistrationCode {
        id: m.id,
        code: m.code,
        course_id: m.course_id,
        created_by: m.created_by,
        created_at: m.created_at,
        order_id: m.order_id,
        invoice_id: m.invoice_id,
    }
}

fn redemption_to_domain(m: registration_code_redemption::Model) -> RegistrationCodeRedemption {
    RegistrationCodeRedemption {
        id: m.id,
        order_id: m.order_id,
        registration_code_id: m.registration_code_id,
        redeemed_by: m.redeemed_by,
        redeemed_at: m.redeemed_at,
    }
}

fn invoice_to_domain(m: invoice::Model) -> Invoice {
    Invoice {
        id: m.id,
        company_name: m.company_name,
        company_contact_name: m.company_contact_name,
        company_contact_email: m.company_contact_email,
        recipient_name: m.recipient_name,
        recipient_email: m.recipient_email,
        address_line_1: m.address_line_1,
        address_line_2: m.address_line_2,
        address_line_3: m.address_line_3,
        city: m.city,
        state: m.state,
        zip: m.zip,
        country: m.country,
        course_id: m.course_id,
        total_amount: from_cents(m.total_amount),
        internal_reference: m.internal_reference,
        customer_reference_number: m.customer_reference_number,
        is_valid: m.is_valid,
    }
}

fn codes_to_domain(models: Vec<registration_code::Model>) -> Vec<CourseRegistrationCode> {
    models.into_iter().map(code_to_domain).collect()
}

// ── RegistrationCodeRepository impl ─────────────────────────────

pub struct SeaOrmRegistrationCodeRepository {
    db: DatabaseConnection,
}

impl SeaOrmRegistrationCodeRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RegistrationCodeRepository for SeaOrmRegistrationCodeRepository {
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<CourseRegistrationCode>> {
        let model = registration_code::Entity::find()
            .filter(registration_code::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(code_to_domain))
    }

    async fn save(&self, code: CourseRegistrationCode) -> DomainResult<CourseRegistrationCode> {
        let active = registration_code::ActiveModel {
            id: NotSet,
            code: Set(code.code.clone()),
            course_id: Set(code.course_id),
            created_by: Set(code.created_by),
            created_at: Set(code.created_at),
            order_id: Set(code.order_id),
            invoice_id: Set(code.invoice_id),
        };
        match active.insert(&self.db).await {
            Ok(model) => {
                debug!("Registration code {} stored for {}", model.id, model.course_id);
                Ok(code_to_domain(model))
            }
            Err(e) if is_unique_violation(&e) => Err(DomainError::Conflict(format!(
                "Registration code {} already exists",
                code.code
            ))),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn find_by_order(&self, order_id: i32) -> DomainResult<Vec<CourseRegistrationCode>> {
        let models = registration_code::Entity::find()
            .filter(registration_code::Column::OrderId.eq(order_id))
            .order_by_asc(registration_code::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(codes_to_domain(models))
    }

    async fn find_by_order_and_course(
        &self,
        order_id: i32,
        course_id: &str,
    ) -> DomainResult<Vec<CourseRegistrationCode>> {
        let models = registration_code::Entity::find()
            .filter(registration_code::Column::OrderId.eq(order_id))
            .filter(registration_code::Column::CourseId.eq(course_id))
            .order_by_asc(registration_code::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(codes_to_domain(models))
    }

    async fn find_by_invoice(&self, invoice_id: i32) -> DomainResult<Vec<CourseRegistrationCode>> {
        let models = registration_code::Entity::find()
            .filter(registration_code::Column::InvoiceId.eq(invoice_id))
            .order_by_asc(registration_code::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(codes_to_domain(models))
    }
}

// ── CodeRedemptionRepository impl ───────────────────────────────

/// Always bound to the primary connection; a redemption check must never
/// see replica lag.
pub struct SeaOrmCodeRedemptionRepository {
    db: DatabaseConnection,
}

impl SeaOrmCodeRedemptionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CodeRedemptionRepository for SeaOrmCodeRedemptionRepository {
    async fn find_for_code(&self, registration_code_id: i32) -> DomainResult<Option<RegistrationCodeRedemption>> {
        let model = registration_code_redemption::Entity::find()
            .filter(registration_code_redemption::Column::RegistrationCodeId.eq(registration_code_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(redemption_to_domain))
    }

    async fn redeem(
        &self,
        code: &CourseRegistrationCode,
        redemption: RegistrationCodeRedemption,
        discount: Option<&Discount>,
    ) -> DomainResult<RegistrationCodeRedemption> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let inserted = registration_code_redemption::ActiveModel {
            id: NotSet,
            order_id: Set(redemption.order_id),
            registration_code_id: Set(code.id),
            redeemed_by: Set(redemption.redeemed_by),
            redeemed_at: Set(redemption.redeemed_at),
        }
        .insert(&txn)
        .await;

        let model = match inserted {
            Ok(model) => model,
            Err(e) => {
                txn.rollback().await.map_err(db_err)?;
                if is_unique_violation(&e) {
                    warn!("Registration code {} was already redeemed", code.code);
                    return Err(DomainError::CodeAlreadyRedeemed(code.code.clone()));
                }
                return Err(db_err(e));
            }
        };

        if let Some(discount) = discount {
            if let Err(e) = write_discount(&txn, discount).await {
                txn.rollback().await.map_err(db_err)?;
                return Err(e);
            }
        }
        txn.commit().await.map_err(db_err)?;

        info!("Registration code {} redeemed by user {}", code.code, redemption.redeemed_by);
        Ok(redemption_to_domain(model))
    }

    async fn delete_for_order(&self, user_id: i32, order_id: i32) -> DomainResult<u64> {
        let result = registration_code_redemption::Entity::delete_many()
            .filter(registration_code_redemption::Column::OrderId.eq(order_id))
            .filter(registration_code_redemption::Column::RedeemedBy.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

// ── InvoiceRepository impl ──────────────────────────────────────

pub struct SeaOrmInvoiceRepository {
    db: DatabaseConnection,
}

impl SeaOrmInvoiceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl InvoiceRepository for SeaOrmInvoiceRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Invoice>> {
        let model = invoice::Entity::find_by_id(id).one(&self.db).await.map_err(db_err)?;
        Ok(model.map(invoice_to_domain))
    }

    async fn save(&self, inv: Invoice) -> DomainResult<Invoice> {
        debug!("Saving invoice for {}", inv.company_name);
        let total_amount = to_cents(inv.total_amount)?;
        let model = invoice::ActiveModel {
            id: NotSet,
            company_name: Set(inv.company_name),
            company_contact_name: Set(inv.company_contact_name),
            company_contact_email: Set(inv.company_contact_email),
            recipient_name: Set(inv.recipient_name),
            recipient_email: Set(inv.recipient_email),
            address_line_1: Set(inv.address_line_1),
            address_line_2: Set(inv.address_line_2),
            address_line_3: Set(inv.address_line_3),
            city: Set(inv.city),
            state: Set(inv.state),
            zip: Set(inv.zip),
            country: Set(inv.country),
            course_id: Set(inv.course_id),
            total_amount: Set(total_amount),
            internal_reference: Set(inv.internal_reference),
            customer_reference_number: Set(inv.customer_reference_number),
            is_valid: Set(inv.is_valid),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(invoice_to_domain(model))
    }

    async fn set_valid(&self, id: i32, is_valid: bool) -> DomainResult<bool> {
        let result = invoice::Entity::update_many()
            .col_expr(invoice::Column::IsValid, Expr::value(is_valid))
            .filter(invoice::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}
