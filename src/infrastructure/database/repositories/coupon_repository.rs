//! SeaORM implementation of CouponRepository and CouponRedemptionRepository

use async_trait::async_trait;
use log::{debug, info};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};

use super::db_err;
use super::order_item_repository::write_discount;
use crate::domain::coupon::{Coupon, CouponRedemption, CouponRedemptionRepository, CouponRepository};
use crate::domain::order_item::Discount;
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{coupon, coupon_redemption};

// ── Conversion helpers ──────────────────────────────────────────

fn coupon_to_domain(m: coupon::Model) -> Coupon {
    Coupon {
        id: m.id,
        code: m.code,
        description: m.description,
        course_id: m.course_id,
        percentage_discount: m.percentage_discount,
        created_by: m.created_by,
        created_at: m.created_at,
        is_active: m.is_active,
    }
}

fn redemption_to_domain(m: coupon_redemption::Model) -> CouponRedemption {
    CouponRedemption {
        id: m.id,
        order_id: m.order_id,
        user_id: m.user_id,
        coupon_id: m.coupon_id,
    }
}

// ── CouponRepository impl ───────────────────────────────────────

pub struct SeaOrmCouponRepository {
    db: DatabaseConnection,
}

impl SeaOrmCouponRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CouponRepository for SeaOrmCouponRepository {
    async fn find_active_by_code(&self, code: &str) -> DomainResult<Option<Coupon>> {
        let model = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code))
            .filter(coupon::Column::IsActive.eq(true))
            .order_by_asc(coupon::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(coupon_to_domain))
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Coupon>> {
        let model = coupon::Entity::find_by_id(id).one(&self.db).await.map_err(db_err)?;
        Ok(model.map(coupon_to_domain))
    }

    async fn find_active(&self) -> DomainResult<Vec<Coupon>> {
        let models = coupon::Entity::find()
            .filter(coupon::Column::IsActive.eq(true))
            .order_by_asc(coupon::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(coupon_to_domain).collect())
    }

    async fn find_all(&self) -> DomainResult<Vec<Coupon>> {
        let models = coupon::Entity::find()
            .order_by_asc(coupon::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(coupon_to_domain).collect())
    }

    async fn save(&self, c: Coupon) -> DomainResult<Coupon> {
        debug!("Saving coupon {} for {}", c.code, c.course_id);
        let model = coupon::ActiveModel {
            id: NotSet,
            code: Set(c.code),
            description: Set(c.description),
            course_id: Set(c.course_id),
            percentage_discount: Set(c.percentage_discount),
            created_by: Set(c.created_by),
            created_at: Set(c.created_at),
            is_active: Set(c.is_active),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;
        Ok(coupon_to_domain(model))
    }

    async fn deactivate(&self, id: i32) -> DomainResult<bool> {
        let result = coupon::Entity::update_many()
            .col_expr(coupon::Column::IsActive, Expr::value(false))
            .filter(coupon::Column::Id.eq(id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected > 0)
    }
}

// ── CouponRedemptionRepository impl ─────────────────────────────

pub struct SeaOrmCouponRedemptionRepository {
    db: DatabaseConnection,
}

impl SeaOrmCouponRedemptionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CouponRedemptionRepository for SeaOrmCouponRedemptionRepository {
    async fn find_for_order(&self, order_id: i32, user_id: i32) -> DomainResult<Vec<CouponRedemption>> {
        let models = coupon_redemption::Entity::find()
            .filter(coupon_redemption::Column::OrderId.eq(order_id))
            .filter(coupon_redemption::Column::UserId.eq(user_id))
            .order_by_asc(coupon_redemption::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(redemption_to_domain).collect())
    }

    async fn redeem(&self, redemption: CouponRedemption, discount: &Discount) -> DomainResult<CouponRedemption> {
        let txn = self.db.begin().await.map_err(db_err)?;
        if let Err(e) = write_discount(&txn, discount).await {
            txn.rollback().await.map_err(db_err)?;
            return Err(e);
        }
        let model = coupon_redemption::ActiveModel {
            id: NotSet,
            order_id: Set(redemption.order_id),
            user_id: Set(redemption.user_id),
            coupon_id: Set(redemption.coupon_id),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(
            "Coupon {} redeemed on order {} item {}",
            redemption.coupon_id, redemption.order_id, discount.item_id
        );
        Ok(redemption_to_domain(model))
    }

    async fn delete_for_order(&self, user_id: i32, order_id: i32) -> DomainResult<u64> {
        let result = coupon_redemption::Entity::delete_many()
            .filter(coupon_redemption::Column::OrderId.eq(order_id))
            .filter(coupon_redemption::Column::UserId.eq(user_id))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
