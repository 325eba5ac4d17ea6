//! SeaORM implementation of OrderItemRepository and CourseAnnotationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::{corrupt, db_err};
use crate::domain::order::OrderStatus;
use crate::domain::order_item::{
    Certificate, CodeBundle, CourseAnnotationRepository, CourseSeat, Discount, Donation, DonationType, ItemKind,
    ItemKindTag, OrderItem, OrderItemRepository,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{course_annotation, order, order_item};
use crate::shared::money::{from_cents, to_cents};

pub struct SeaOrmOrderItemRepository {
    db: DatabaseConnection,
}

impl SeaOrmOrderItemRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

pub(crate) fn parse_status(s: &str) -> DomainResult<OrderStatus> {
    OrderStatus::from_str(s).ok_or_else(|| corrupt("status", s))
}

fn required(column: &str, value: Option<String>, kind: &str) -> DomainResult<String> {
    value.ok_or_else(|| corrupt(column, &format!("NULL for {}", kind)))
}

fn kind_from_model(m: &order_item::Model) -> DomainResult<ItemKind> {
    let tag = ItemKindTag::from_str(&m.kind).ok_or_else(|| corrupt("kind", &m.kind))?;
    Ok(match tag {
        ItemKindTag::CourseSeat => ItemKind::CourseSeat(CourseSeat {
            course_id: required("course_id", m.course_id.clone(), &m.kind)?,
            mode: required("mode", m.mode.clone(), &m.kind)?,
        }),
        ItemKindTag::CodeBundle => ItemKind::CodeBundle(CodeBundle {
            course_id: required("course_id", m.course_id.clone(), &m.kind)?,
            mode: required("mode", m.mode.clone(), &m.kind)?,
        }),
        ItemKindTag::Certificate => ItemKind::Certificate(Certificate {
            course_id: required("course_id", m.course_id.clone(), &m.kind)?,
            enrollment_id: m
                .enrollment_id
                .ok_or_else(|| corrupt("enrollment_id", "NULL for certificate"))?,
            mode: required("mode", m.mode.clone(), &m.kind)?,
        }),
        ItemKindTag::Donation => {
            let raw = required("donation_type", m.donation_type.clone(), &m.kind)?;
            ItemKind::Donation(Donation {
                donation_type: DonationType::from_str(&raw).ok_or_else(|| corrupt("donation_type", &raw))?,
                course_id: m.course_id.clone(),
            })
        }
    })
}

pub(crate) fn item_to_domain(m: order_item::Model) -> DomainResult<OrderItem> {
    let kind = kind_from_model(&m)?;
    Ok(OrderItem {
        id: m.id,
        order_id: m.order_id,
        user_id: m.user_id,
        status: parse_status(&m.status)?,
        qty: m.qty,
        unit_cost: from_cents(m.unit_cost),
        list_price: m.list_price.map(from_cents),
        line_desc: m.line_desc,
        currency: m.currency,
        fulfilled_time: m.fulfilled_time,
        refund_requested_time: m.refund_requested_time,
        service_fee: from_cents(m.service_fee),
        report_comments: m.report_comments,
        kind,
    })
}

/// Full active model; `id` is left unset for items not stored yet
pub(crate) fn item_to_active(item: &OrderItem) -> DomainResult<order_item::ActiveModel> {
    let (enrollment_id, donation_type) = match &item.kind {
        ItemKind::Certificate(cert) => (Some(cert.enrollment_id), None),
        ItemKind::Donation(donation) => (None, Some(donation.donation_type.as_str().to_string())),
        ItemKind::CourseSeat(_) | ItemKind::CodeBundle(_) => (None, None),
    };
    Ok(order_item::ActiveModel {
        id: if item.id == 0 { NotSet } else { Set(item.id) },
        order_id: Set(item.order_id),
        user_id: Set(item.user_id),
        status: Set(item.status.as_str().to_string()),
        kind: Set(item.tag().as_str().to_string()),
        qty: Set(item.qty),
        unit_cost: Set(to_cents(item.unit_cost)?),
        list_price: Set(item.list_price.map(to_cents).transpose()?),
        service_fee: Set(to_cents(item.service_fee)?),
        line_desc: Set(item.line_desc.clone()),
        currency: Set(item.currency.clone()),
        fulfilled_time: Set(item.fulfilled_time),
        refund_requested_time: Set(item.refund_requested_time),
        report_comments: Set(item.report_comments.clone()),
        course_id: Set(item.course_id().map(str::to_string)),
        mode: Set(item.kind.mode().map(str::to_string)),
        enrollment_id: Set(enrollment_id),
        donation_type: Set(donation_type),
    })
}

pub(crate) async fn insert_item<C: ConnectionTrait>(conn: &C, item: &OrderItem) -> DomainResult<OrderItem> {
    let mut active = item_to_active(item)?;
    active.id = NotSet;
    let model = active.insert(conn).await.map_err(db_err)?;
    item_to_domain(model)
}

// ── Cart-guarded writes ─────────────────────────────────────────

fn cart_status() -> &'static str {
    OrderStatus::Cart.as_str()
}

/// Why a guarded write on line `id` matched no row
async fn stale_line<C: ConnectionTrait>(conn: &C, id: i32) -> DomainResult<DomainError> {
    let model = order_item::Entity::find_by_id(id).one(conn).await.map_err(db_err)?;
    Ok(match model {
        None => DomainError::not_found("OrderItem", "id", id),
        Some(m) if m.status != cart_status() => DomainError::not_in_cart("Order item", id),
        Some(m) if m.list_price.is_some() => DomainError::ItemAlreadyDiscounted(id),
        Some(_) => DomainError::Conflict(format!("Order item {} was repriced", id)),
    })
}

/// Take the order row's write lock while it is still a cart.
///
/// Status transitions update the same row, so they wait for the caller's
/// transaction.
async fn lock_cart<C: ConnectionTrait>(conn: &C, order_id: i32) -> DomainResult<()> {
    let locked = order::Entity::update_many()
        .col_expr(order::Column::Status, Expr::col(order::Column::Status).into())
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.eq(cart_status()))
        .exec(conn)
        .await
        .map_err(db_err)?;
    if locked.rows_affected > 0 {
        return Ok(());
    }
    match order::Entity::find_by_id(order_id).one(conn).await.map_err(db_err)? {
        Some(_) => Err(DomainError::not_in_cart("Order", order_id)),
        None => Err(DomainError::not_found("Order", "id", order_id)),
    }
}

/// Compare-and-set of a discount onto an undiscounted cart line
pub(crate) async fn write_discount<C: ConnectionTrait>(conn: &C, discount: &Discount) -> DomainResult<()> {
    let list_price = to_cents(discount.list_price)?;
    let result = order_item::Entity::update_many()
        .col_expr(order_item::Column::UnitCost, Expr::value(to_cents(discount.unit_cost)?))
        .col_expr(order_item::Column::ListPrice, Expr::value(Some(list_price)))
        .filter(order_item::Column::Id.eq(discount.item_id))
        .filter(order_item::Column::OrderId.eq(discount.order_id))
        .filter(order_item::Column::Status.eq(cart_status()))
        .filter(order_item::Column::ListPrice.is_null())
        .filter(order_item::Column::UnitCost.eq(list_price))
        .exec(conn)
        .await
        .map_err(db_err)?;
    if result.rows_affected > 0 {
        return Ok(());
    }
    Err(stale_line(conn, discount.item_id).await?)
}

fn models_to_domain(models: Vec<order_item::Model>) -> DomainResult<Vec<OrderItem>> {
    models.into_iter().map(item_to_domain).collect()
}

// ── OrderItemRepository impl ────────────────────────────────────

#[async_trait]
impl OrderItemRepository for SeaOrmOrderItemRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<OrderItem>> {
        order_item::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(item_to_domain)
            .transpose()
    }

    async fn find_by_order(&self, order_id: i32) -> DomainResult<Vec<OrderItem>> {
        let models = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }

    async fn find_in_order(
        &self,
        order_id: i32,
        course_id: &str,
        kind: ItemKindTag,
    ) -> DomainResult<Option<OrderItem>> {
        order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .filter(order_item::Column::CourseId.eq(course_id))
            .filter(order_item::Column::Kind.eq(kind.as_str()))
            .order_by_asc(order_item::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(item_to_domain)
            .transpose()
    }

    async fn save(&self, item: OrderItem) -> DomainResult<OrderItem> {
        debug!("Saving {} item for order {}", item.tag(), item.order_id);
        let txn = self.db.begin().await.map_err(db_err)?;
        if let Err(e) = lock_cart(&txn, item.order_id).await {
            txn.rollback().await.map_err(db_err)?;
            return Err(e);
        }
        let saved = insert_item(&txn, &item).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(saved)
    }

    async fn update(&self, item: &OrderItem) -> DomainResult<()> {
        debug!("Updating order item: {}", item.id);
        let mut active = item_to_active(item)?;
        active.id = NotSet;
        active.order_id = NotSet;
        active.status = NotSet;
        active.list_price = NotSet;
        let result = order_item::Entity::update_many()
            .set(active)
            .filter(order_item::Column::Id.eq(item.id))
            .filter(order_item::Column::Status.eq(cart_status()))
            .filter(order_item::Column::ListPrice.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected > 0 {
            return Ok(());
        }
        Err(stale_line(&self.db, item.id).await?)
    }

    async fn set_quantity(&self, id: i32, qty: i32) -> DomainResult<()> {
        let result = order_item::Entity::update_many()
            .col_expr(order_item::Column::Qty, Expr::value(qty))
            .filter(order_item::Column::Id.eq(id))
            .filter(order_item::Column::Status.eq(cart_status()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected > 0 {
            return Ok(());
        }
        Err(stale_line(&self.db, id).await?)
    }

    async fn reset_price(&self, id: i32) -> DomainResult<bool> {
        let result = order_item::Entity::update_many()
            .col_expr(order_item::Column::UnitCost, Expr::col(order_item::Column::ListPrice).into())
            .col_expr(order_item::Column::ListPrice, Expr::value(Option::<i64>::None))
            .filter(order_item::Column::Id.eq(id))
            .filter(order_item::Column::Status.eq(cart_status()))
            .filter(order_item::Column::ListPrice.is_not_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected > 0 {
            return Ok(true);
        }
        match stale_line(&self.db, id).await? {
            // Undiscounted cart line
            DomainError::Conflict(_) => Ok(false),
            e => Err(e),
        }
    }

    async fn delete(&self, id: i32) -> DomainResult<bool> {
        let result = order_item::Entity::delete_many()
            .filter(order_item::Column::Id.eq(id))
            .filter(order_item::Column::Status.eq(cart_status()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected > 0 {
            return Ok(true);
        }
        match stale_line(&self.db, id).await? {
            DomainError::NotFound { .. } => Ok(false),
            e => Err(e),
        }
    }

    async fn delete_by_order(&self, order_id: i32) -> DomainResult<u64> {
        let txn = self.db.begin().await.map_err(db_err)?;
        if let Err(e) = lock_cart(&txn, order_id).await {
            txn.rollback().await.map_err(db_err)?;
            return match e {
                DomainError::NotFound { .. } => Ok(0),
                e => Err(e),
            };
        }
        let result = order_item::Entity::delete_many()
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn mark_fulfilled(&self, id: i32, at: DateTime<Utc>) -> DomainResult<bool> {
        let result = order_item::Entity::update_many()
            .col_expr(order_item::Column::FulfilledTime, Expr::value(at))
            .filter(order_item::Column::Id.eq(id))
            .filter(order_item::Column::FulfilledTime.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected > 0 {
            return Ok(true);
        }
        match self.find_by_id(id).await? {
            Some(_) => Ok(false),
            None => Err(DomainError::not_found("OrderItem", "id", id)),
        }
    }

    async fn find_purchased_certificates(
        &self,
        user_id: i32,
        course_id: &str,
        mode: &str,
    ) -> DomainResult<Vec<OrderItem>> {
        let models = order_item::Entity::find()
            .filter(order_item::Column::UserId.eq(user_id))
            .filter(order_item::Column::CourseId.eq(course_id))
            .filter(order_item::Column::Mode.eq(mode))
            .filter(order_item::Column::Kind.eq(ItemKindTag::Certificate.as_str()))
            .filter(order_item::Column::Status.eq(OrderStatus::Purchased.as_str()))
            .order_by_asc(order_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        models_to_domain(models)
    }
}

// ── CourseAnnotationRepository impl ─────────────────────────────

pub struct SeaOrmCourseAnnotationRepository {
    db: DatabaseConnection,
}

impl SeaOrmCourseAnnotationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn find_model(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Option<course_annotation::Model>> {
        course_annotation::Entity::find()
            .filter(course_annotation::Column::Kind.eq(kind.as_str()))
            .filter(course_annotation::Column::CourseId.eq(course_id))
            .one(&self.db)
            .await
            .map_err(db_err)
    }
}

#[async_trait]
impl CourseAnnotationRepository for SeaOrmCourseAnnotationRepository {
    async fn find_annotation(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Option<String>> {
        Ok(self.find_model(kind, course_id).await?.map(|m| m.annotation))
    }

    async fn set_annotation(&self, kind: ItemKindTag, course_id: &str, annotation: &str) -> DomainResult<()> {
        match self.find_model(kind, course_id).await? {
            Some(existing) => {
                let mut active: course_annotation::ActiveModel = existing.into();
                active.annotation = Set(annotation.to_string());
                active.update(&self.db).await.map_err(db_err)?;
            }
            None => {
                course_annotation::ActiveModel {
                    id: NotSet,
                    kind: Set(kind.as_str().to_string()),
                    course_id: Set(course_id.to_string()),
                    annotation: Set(annotation.to_string()),
                }
                .insert(&self.db)
                .await
                .map_err(db_err)?;
            }
        }
        Ok(())
    }
}
