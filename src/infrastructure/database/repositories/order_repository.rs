//! SeaORM implementation of OrderRepository
//!
//! Status changes are conditional `UPDATE ... WHERE status IN (...)` writes
//! inside a transaction that also mirrors the status onto the items.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use super::{corrupt, db_err};
use super::order_item_repository::{insert_item, parse_status};
use crate::domain::order::{
    BillingDetails, BulkBillingDetails, Order, OrderRepository, OrderStatus, OrderType, PurchaseCommit,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{order, order_item};

pub struct SeaOrmOrderRepository {
    db: DatabaseConnection,
}

impl SeaOrmOrderRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: order::Model) -> DomainResult<Order> {
    Ok(Order {
        id: m.id,
        user_id: m.user_id,
        currency: m.currency,
        status: parse_status(&m.status)?,
        purchase_time: m.purchase_time,
        refunded_time: m.refunded_time,
        billing: BillingDetails {
            first_name: m.bill_to_first,
            last_name: m.bill_to_last,
            street1: m.bill_to_street1,
            street2: m.bill_to_street2,
            city: m.bill_to_city,
            state: m.bill_to_state,
            postal_code: m.bill_to_postalcode,
            country: m.bill_to_country,
            card_last4: m.bill_to_ccnum,
            card_type: m.bill_to_cardtype,
            processor_reply_dump: m.processor_reply_dump,
        },
        order_type: OrderType::from_str(&m.order_type).ok_or_else(|| corrupt("order_type", &m.order_type))?,
        bulk: BulkBillingDetails {
            company_name: m.company_name,
            company_contact_name: m.company_contact_name,
            company_contact_email: m.company_contact_email,
            recipient_name: m.recipient_name,
            recipient_email: m.recipient_email,
            customer_reference_number: m.customer_reference_number,
        },
    })
}

/// Every column except status and timestamps
fn details_to_active(o: &Order) -> order::ActiveModel {
    let billing = o.billing.clone();
    let bulk = o.bulk.clone();
    order::ActiveModel {
        id: Set(o.id),
        user_id: Set(o.user_id),
        currency: Set(o.currency.clone()),
        bill_to_first: Set(billing.first_name),
        bill_to_last: Set(billing.last_name),
        bill_to_street1: Set(billing.street1),
        bill_to_street2: Set(billing.street2),
        bill_to_city: Set(billing.city),
        bill_to_state: Set(billing.state),
        bill_to_postalcode: Set(billing.postal_code),
        bill_to_country: Set(billing.country),
        bill_to_ccnum: Set(billing.card_last4),
        bill_to_cardtype: Set(billing.card_type),
        processor_reply_dump: Set(billing.processor_reply_dump),
        order_type: Set(o.order_type.as_str().to_string()),
        company_name: Set(bulk.company_name),
        company_contact_name: Set(bulk.company_contact_name),
        company_contact_email: Set(bulk.company_contact_email),
        recipient_name: Set(bulk.recipient_name),
        recipient_email: Set(bulk.recipient_email),
        customer_reference_number: Set(bulk.customer_reference_number),
        ..Default::default()
    }
}

fn statuses(from: &[OrderStatus]) -> Vec<&'static str> {
    from.iter().map(OrderStatus::as_str).collect()
}

/// Move the order to `to` if it is still in one of `from`; no other column changes
async fn claim<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
    from: &[OrderStatus],
    to: OrderStatus,
    purchased_at: Option<DateTime<Utc>>,
) -> DomainResult<bool> {
    let mut update = order::Entity::update_many()
        .col_expr(order::Column::Status, Expr::value(to.as_str()))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::Status.is_in(statuses(from)));
    if let Some(at) = purchased_at {
        update = update.col_expr(order::Column::PurchaseTime, Expr::value(at));
    }
    let result = update.exec(conn).await.map_err(db_err)?;
    Ok(result.rows_affected > 0)
}

async fn mirror_status<C: ConnectionTrait>(conn: &C, order_id: i32, status: OrderStatus) -> DomainResult<()> {
    order_item::Entity::update_many()
        .col_expr(order_item::Column::Status, Expr::value(status.as_str()))
        .filter(order_item::Column::OrderId.eq(order_id))
        .exec(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

// ── OrderRepository impl ────────────────────────────────────────

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Order>> {
        order::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_newest_cart(&self, user_id: i32) -> DomainResult<Option<Order>> {
        order::Entity::find()
            .filter(order::Column::UserId.eq(user_id))
            .filter(order::Column::Status.eq(OrderStatus::Cart.as_str()))
            .order_by_desc(order::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn save(&self, o: Order) -> DomainResult<Order> {
        debug!("Creating order for user {}", o.user_id);
        let mut active = details_to_active(&o);
        active.id = NotSet;
        active.status = Set(o.status.as_str().to_string());
        active.purchase_time = Set(o.purchase_time);
        active.refunded_time = Set(o.refunded_time);
        let model = active.insert(&self.db).await.map_err(db_err)?;
        model_to_domain(model)
    }

    async fn update(&self, o: &Order) -> DomainResult<()> {
        debug!("Updating order details: {}", o.id);
        match details_to_active(o).update(&self.db).await {
            Ok(_) => Ok(()),
            Err(DbErr::RecordNotUpdated) => Err(DomainError::not_found("Order", "id", o.id)),
            Err(e) => Err(db_err(e)),
        }
    }

    async fn transition(
        &self,
        order_id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
        purchased_at: Option<DateTime<Utc>>,
    ) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;
        if !claim(&txn, order_id, from, to, purchased_at).await? {
            txn.rollback().await.map_err(db_err)?;
            return match self.find_by_id(order_id).await? {
                Some(_) => Ok(false),
                None => Err(DomainError::not_found("Order", "id", order_id)),
            };
        }
        mirror_status(&txn, order_id, to).await?;
        txn.commit().await.map_err(db_err)?;
        info!("Order {} moved to {}", order_id, to);
        Ok(true)
    }

    async fn commit_purchase(&self, commit: PurchaseCommit) -> DomainResult<bool> {
        let PurchaseCommit {
            order,
            expected,
            removed_items,
            added_items,
        } = commit;

        let txn = self.db.begin().await.map_err(db_err)?;
        if !claim(&txn, order.id, &expected, order.status, order.purchase_time).await? {
            txn.rollback().await.map_err(db_err)?;
            return match self.find_by_id(order.id).await? {
                Some(_) => Ok(false),
                None => Err(DomainError::not_found("Order", "id", order.id)),
            };
        }

        details_to_active(&order).update(&txn).await.map_err(db_err)?;
        if !removed_items.is_empty() {
            order_item::Entity::delete_many()
                .filter(order_item::Column::Id.is_in(removed_items))
                .filter(order_item::Column::OrderId.eq(order.id))
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        for mut item in added_items {
            item.order_id = order.id;
            insert_item(&txn, &item).await?;
        }
        mirror_status(&txn, order.id, order.status).await?;
        txn.commit().await.map_err(db_err)?;

        info!("Order {} committed as {} ({})", order.id, order.status, order.order_type.as_str());
        Ok(true)
    }

    async fn refund_item(&self, order_id: i32, item_id: i32, at: DateTime<Utc>) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let refunded = order_item::Entity::update_many()
            .col_expr(order_item::Column::Status, Expr::value(OrderStatus::Refunded.as_str()))
            .col_expr(order_item::Column::RefundRequestedTime, Expr::value(at))
            .filter(order_item::Column::Id.eq(item_id))
            .filter(order_item::Column::OrderId.eq(order_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if refunded.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Err(DomainError::not_found("OrderItem", "id", item_id));
        }

        order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(OrderStatus::Refunded.as_str()))
            .col_expr(order::Column::RefundedTime, Expr::value(at))
            .filter(order::Column::Id.eq(order_id))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;
        info!("Order {} item {} refunded", order_id, item_id);
        Ok(())
    }
}
