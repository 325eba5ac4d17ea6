//! In-memory storage implementation
//!
//! All tables sit behind one lock, so every multi-row operation (status
//! mirroring, purchase commit, redemption + price write) is atomic.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::coupon::{Coupon, CouponRedemption, CouponRedemptionRepository, CouponRepository};
use crate::domain::order::{Order, OrderRepository, OrderStatus, PurchaseCommit};
use crate::domain::order_item::{CourseAnnotationRepository, Discount, ItemKindTag, OrderItem, OrderItemRepository};
use crate::domain::registration_code::{
    CodeRedemptionRepository, CourseRegistrationCode, Invoice, InvoiceRepository, RegistrationCodeRedemption,
    RegistrationCodeRepository,
};
use crate::domain::reporting::{MonetaryField, ReportingRepository};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// Rows keyed by id; `BTreeMap` keeps scans in insertion order
#[derive(Default)]
struct MemoryState {
    orders: BTreeMap<i32, Order>,
    items: BTreeMap<i32, OrderItem>,
    annotations: HashMap<(ItemKindTag, String), String>,
    coupons: BTreeMap<i32, Coupon>,
    coupon_redemptions: BTreeMap<i32, CouponRedemption>,
    codes: BTreeMap<i32, CourseRegistrationCode>,
    code_redemptions: BTreeMap<i32, RegistrationCodeRedemption>,
    invoices: BTreeMap<i32, Invoice>,
    last_id: i32,
}

impl MemoryState {
    fn next_id(&mut self) -> i32 {
        self.last_id += 1;
        self.last_id
    }

    fn ensure_cart_order(&self, order_id: i32) -> DomainResult<()> {
        match self.orders.get(&order_id) {
            None => Err(DomainError::not_found("Order", "id", order_id)),
            Some(order) if order.status != OrderStatus::Cart => Err(DomainError::not_in_cart("Order", order_id)),
            Some(_) => Ok(()),
        }
    }

    fn cart_item_mut(&mut self, id: i32) -> DomainResult<&mut OrderItem> {
        let item = self
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("OrderItem", "id", id))?;
        if item.status != OrderStatus::Cart {
            return Err(DomainError::not_in_cart("Order item", id));
        }
        Ok(item)
    }

    fn write_discount(&mut self, discount: &Discount) -> DomainResult<()> {
        let item = self
            .items
            .get_mut(&discount.item_id)
            .ok_or_else(|| DomainError::not_found("OrderItem", "id", discount.item_id))?;
        discount.apply_to(item)
    }

    fn set_order_status(&mut self, order_id: i32, status: OrderStatus) {
        for item in self.items.values_mut().filter(|i| i.order_id == order_id) {
            item.status = status;
        }
    }

    fn certificates<'a>(
        &'a self,
        course_id: &'a str,
        mode: &'a str,
        status: OrderStatus,
    ) -> impl Iterator<Item = &'a OrderItem> + 'a {
        self.items.values().filter(move |i| {
            i.tag() == ItemKindTag::Certificate
                && i.status == status
                && i.course_id() == Some(course_id)
                && i.kind.mode() == Some(mode)
        })
    }
}

/// In-memory storage for development and testing
#[derive(Default)]
pub struct InMemoryRepositoryProvider {
    state: RwLock<MemoryState>,
}

impl InMemoryRepositoryProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
    fn orders(&self) -> &dyn OrderRepository {
        self
    }

    fn order_items(&self) -> &dyn OrderItemRepository {
        self
    }

    fn annotations(&self) -> &dyn CourseAnnotationRepository {
        self
    }

    fn coupons(&self) -> &dyn CouponRepository {
        self
    }

    fn coupon_redemptions(&self) -> &dyn CouponRedemptionRepository {
        self
    }

    fn registration_codes(&self) -> &dyn RegistrationCodeRepository {
        self
    }

    fn code_redemptions(&self) -> &dyn CodeRedemptionRepository {
        self
    }

    fn invoices(&self) -> &dyn InvoiceRepository {
        self
    }

    fn reporting(&self) -> &dyn ReportingRepository {
        self
    }
}

// ── Orders ─────────────────────────────────────────────────────

#[async_trait]
impl OrderRepository for InMemoryRepositoryProvider {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Order>> {
        Ok(self.state.read().orders.get(&id).cloned())
    }

    async fn find_newest_cart(&self, user_id: i32) -> DomainResult<Option<Order>> {
        Ok(self
            .state
            .read()
            .orders
            .values()
            .rev()
            .find(|o| o.user_id == user_id && o.status == OrderStatus::Cart)
            .cloned())
    }

    async fn save(&self, mut order: Order) -> DomainResult<Order> {
        let mut state = self.state.write();
        order.id = state.next_id();
        state.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update(&self, order: &Order) -> DomainResult<()> {
        let mut state = self.state.write();
        let stored = state
            .orders
            .get_mut(&order.id)
            .ok_or_else(|| DomainError::not_found("Order", "id", order.id))?;
        stored.currency = order.currency.clone();
        stored.billing = order.billing.clone();
        stored.order_type = order.order_type;
        stored.bulk = order.bulk.clone();
        Ok(())
    }

    async fn transition(
        &self,
        order_id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
        purchased_at: Option<DateTime<Utc>>,
    ) -> DomainResult<bool> {
        let mut state = self.state.write();
        let Some(order) = state.orders.get_mut(&order_id) else {
            return Err(DomainError::not_found("Order", "id", order_id));
        };
        if !from.contains(&order.status) {
            return Ok(false);
        }
        order.status = to;
        if purchased_at.is_some() {
            order.purchase_time = purchased_at;
        }
        state.set_order_status(order_id, to);
        Ok(true)
    }

    async fn commit_purchase(&self, commit: PurchaseCommit) -> DomainResult<bool> {
        let PurchaseCommit {
            order,
            expected,
            removed_items,
            added_items,
        } = commit;

        let mut state = self.state.write();
        match state.orders.get(&order.id) {
            None => return Err(DomainError::not_found("Order", "id", order.id)),
            Some(stored) if !expected.contains(&stored.status) => return Ok(false),
            Some(_) => {}
        }

        for id in removed_items {
            state.items.remove(&id);
        }
        for mut item in added_items {
            item.id = state.next_id();
            item.order_id = order.id;
            state.items.insert(item.id, item);
        }
        state.set_order_status(order.id, order.status);
        state.orders.insert(order.id, order);
        Ok(true)
    }

    async fn refund_item(&self, order_id: i32, item_id: i32, at: DateTime<Utc>) -> DomainResult<()> {
        let mut state = self.state.write();
        if !state.orders.contains_key(&order_id) {
            return Err(DomainError::not_found("Order", "id", order_id));
        }
        let item = state
            .items
            .get_mut(&item_id)
            .filter(|i| i.order_id == order_id)
            .ok_or_else(|| DomainError::not_found("OrderItem", "id", item_id))?;
        item.status = OrderStatus::Refunded;
        item.refund_requested_time = Some(at);

        if let Some(order) = state.orders.get_mut(&order_id) {
            order.status = OrderStatus::Refunded;
            order.refunded_time = Some(at);
        }
        Ok(())
    }
}

// ── Order items ────────────────────────────────────────────────

#[async_trait]
impl OrderItemRepository for InMemoryRepositoryProvider {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<OrderItem>> {
        Ok(self.state.read().items.get(&id).cloned())
    }

    async fn find_by_order(&self, order_id: i32) -> DomainResult<Vec<OrderItem>> {
        Ok(self
            .state
            .read()
            .items
            .values()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn find_in_order(
        &self,
        order_id: i32,
        course_id: &str,
        kind: ItemKindTag,
    ) -> DomainResult<Option<OrderItem>> {
        Ok(self
            .state
            .read()
            .items
            .values()
            .find(|i| i.order_id == order_id && i.tag() == kind && i.course_id() == Some(course_id))
            .cloned())
    }

    async fn save(&self, mut item: OrderItem) -> DomainResult<OrderItem> {
        let mut state = self.state.write();
        state.ensure_cart_order(item.order_id)?;
        item.id = state.next_id();
        state.items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, item: &OrderItem) -> DomainResult<()> {
        let mut state = self.state.write();
        let stored = state.cart_item_mut(item.id)?;
        if stored.has_discount() {
            return Err(DomainError::ItemAlreadyDiscounted(item.id));
        }
        *stored = OrderItem {
            order_id: stored.order_id,
            status: stored.status,
            list_price: None,
            ..item.clone()
        };
        Ok(())
    }

    async fn set_quantity(&self, id: i32, qty: i32) -> DomainResult<()> {
        self.state.write().cart_item_mut(id)?.qty = qty;
        Ok(())
    }

    async fn reset_price(&self, id: i32) -> DomainResult<bool> {
        Ok(self.state.write().cart_item_mut(id)?.reset_price())
    }

    async fn delete(&self, id: i32) -> DomainResult<bool> {
        let mut state = self.state.write();
        match state.items.get(&id).map(|i| i.status) {
            None => Ok(false),
            Some(OrderStatus::Cart) => Ok(state.items.remove(&id).is_some()),
            Some(_) => Err(DomainError::not_in_cart("Order item", id)),
        }
    }

    async fn delete_by_order(&self, order_id: i32) -> DomainResult<u64> {
        let mut state = self.state.write();
        if state.orders.contains_key(&order_id) {
            state.ensure_cart_order(order_id)?;
        }
        let before = state.items.len();
        state
            .items
            .retain(|_, i| !(i.order_id == order_id && i.status == OrderStatus::Cart));
        Ok((before - state.items.len()) as u64)
    }

    async fn mark_fulfilled(&self, id: i32, at: DateTime<Utc>) -> DomainResult<bool> {
        let mut state = self.state.write();
        let item = state
            .items
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("OrderItem", "id", id))?;
        if item.fulfilled_time.is_some() {
            return Ok(false);
        }
        item.fulfilled_time = Some(at);
        Ok(true)
    }

    async fn find_purchased_certificates(
        &self,
        user_id: i32,
        course_id: &str,
        mode: &str,
    ) -> DomainResult<Vec<OrderItem>> {
        let state = self.state.read();
        Ok(state
            .certificates(course_id, mode, OrderStatus::Purchased)
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CourseAnnotationRepository for InMemoryRepositoryProvider {
    async fn find_annotation(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Option<String>> {
        Ok(self
            .state
            .read()
            .annotations
            .get(&(kind, course_id.to_string()))
            .cloned())
    }

    async fn set_annotation(&self, kind: ItemKindTag, course_id: &str, annotation: &str) -> DomainResult<()> {
        self.state
            .write()
            .annotations
            .insert((kind, course_id.to_string()), annotation.to_string());
        Ok(())
    }
}

// ── Coupons ────────────────────────────────────────────────────

#[async_trait]
impl CouponRepository for InMemoryRepositoryProvider {
    async fn find_active_by_code(&self, code: &str) -> DomainResult<Option<Coupon>> {
        Ok(self
            .state
            .read()
            .coupons
            .values()
            .find(|c| c.is_active && c.code == code)
            .cloned())
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Coupon>> {
        Ok(self.state.read().coupons.get(&id).cloned())
    }

    async fn find_active(&self) -> DomainResult<Vec<Coupon>> {
        Ok(self
            .state
            .read()
            .coupons
            .values()
            .filter(|c| c.is_active)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> DomainResult<Vec<Coupon>> {
        Ok(self.state.read().coupons.values().cloned().collect())
    }

    async fn save(&self, mut coupon: Coupon) -> DomainResult<Coupon> {
        let mut state = self.state.write();
        coupon.id = state.next_id();
        state.coupons.insert(coupon.id, coupon.clone());
        Ok(coupon)
    }

    async fn deactivate(&self, id: i32) -> DomainResult<bool> {
        Ok(match self.state.write().coupons.get_mut(&id) {
            Some(coupon) => {
                coupon.is_active = false;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl CouponRedemptionRepository for InMemoryRepositoryProvider {
    async fn find_for_order(&self, order_id: i32, user_id: i32) -> DomainResult<Vec<CouponRedemption>> {
        Ok(self
            .state
            .read()
            .coupon_redemptions
            .values()
            .filter(|r| r.order_id == order_id && r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn redeem(&self, mut redemption: CouponRedemption, discount: &Discount) -> DomainResult<CouponRedemption> {
        let mut state = self.state.write();
        state.write_discount(discount)?;
        redemption.id = state.next_id();
        state.coupon_redemptions.insert(redemption.id, redemption.clone());
        Ok(redemption)
    }

    async fn delete_for_order(&self, user_id: i32, order_id: i32) -> DomainResult<u64> {
        let mut state = self.state.write();
        let before = state.coupon_redemptions.len();
        state
            .coupon_redemptions
            .retain(|_, r| !(r.order_id == order_id && r.user_id == user_id));
        Ok((before - state.coupon_redemptions.len()) as u64)
    }
}

// ── Registration codes ─────────────────────────────────────────

#[async_trait]
impl RegistrationCodeRepository for InMemoryRepositoryProvider {
    async fn find_by_code(&self, code: &str) -> DomainResult<Option<CourseRegistrationCode>> {
        Ok(self.state.read().codes.values().find(|c| c.code == code).cloned())
    }

    async fn save(&self, mut code: CourseRegistrationCode) -> DomainResult<CourseRegistrationCode> {
        let mut state = self.state.write();
        if state.codes.values().any(|c| c.code == code.code) {
            return Err(DomainError::Conflict(format!("Registration code {}", code.code)));
        }
        code.id = state.next_id();
        state.codes.insert(code.id, code.clone());
        Ok(code)
    }

    async fn find_by_order(&self, order_id: i32) -> DomainResult<Vec<CourseRegistrationCode>> {
        Ok(self
            .state
            .read()
            .codes
            .values()
            .filter(|c| c.order_id == Some(order_id))
            .cloned()
            .collect())
    }

    async fn find_by_order_and_course(
        &self,
        order_id: i32,
        course_id: &str,
    ) -> DomainResult<Vec<CourseRegistrationCode>> {
        Ok(self
            .state
            .read()
            .codes
            .values()
            .filter(|c| c.order_id == Some(order_id) && c.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn find_by_invoice(&self, invoice_id: i32) -> DomainResult<Vec<CourseRegistrationCode>> {
        Ok(self
            .state
            .read()
            .codes
            .values()
            .filter(|c| c.invoice_id == Some(invoice_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CodeRedemptionRepository for InMemoryRepositoryProvider {
    async fn find_for_code(&self, registration_code_id: i32) -> DomainResult<Option<RegistrationCodeRedemption>> {
        Ok(self
            .state
            .read()
            .code_redemptions
            .values()
            .find(|r| r.registration_code_id == registration_code_id)
            .cloned())
    }

    async fn redeem(
        &self,
        code: &CourseRegistrationCode,
        mut redemption: RegistrationCodeRedemption,
        discount: Option<&Discount>,
    ) -> DomainResult<RegistrationCodeRedemption> {
        let mut state = self.state.write();
        if state
            .code_redemptions
            .values()
            .any(|r| r.registration_code_id == code.id)
        {
            return Err(DomainError::CodeAlreadyRedeemed(code.code.clone()));
        }
        if let Some(discount) = discount {
            state.write_discount(discount)?;
        }
        redemption.id = state.next_id();
        state.code_redemptions.insert(redemption.id, redemption.clone());
        Ok(redemption)
    }

    async fn delete_for_order(&self, user_id: i32, order_id: i32) -> DomainResult<u64> {
        let mut state = self.state.write();
        let before = state.code_redemptions.len();
        state
            .code_redemptions
            .retain(|_, r| !(r.order_id == Some(order_id) && r.redeemed_by == user_id));
        Ok((before - state.code_redemptions.len()) as u64)
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryRepositoryProvider {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Invoice>> {
        Ok(self.state.read().invoices.get(&id).cloned())
    }

    async fn save(&self, mut invoice: Invoice) -> DomainResult<Invoice> {
        let mut state = self.state.write();
        invoice.id = state.next_id();
        state.invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn set_valid(&self, id: i32, is_valid: bool) -> DomainResult<bool> {
        Ok(match self.state.write().invoices.get_mut(&id) {
            Some(invoice) => {
                invoice.is_valid = is_valid;
                true
            }
            None => false,
        })
    }
}

// ── Reporting ──────────────────────────────────────────────────

#[async_trait]
impl ReportingRepository for InMemoryRepositoryProvider {
    async fn purchased_line_cost_total(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Decimal> {
        Ok(self
            .state
            .read()
            .items
            .values()
            .filter(|i| i.tag() == kind && i.status == OrderStatus::Purchased && i.course_id() == Some(course_id))
            .map(OrderItem::line_cost)
            .sum())
    }

    async fn certificate_count(&self, course_id: &str, mode: &str, status: OrderStatus) -> DomainResult<u64> {
        Ok(self.state.read().certificates(course_id, mode, status).count() as u64)
    }

    async fn certificate_field_sum(
        &self,
        course_id: &str,
        mode: &str,
        status: OrderStatus,
        field: MonetaryField,
    ) -> DomainResult<Decimal> {
        let state = self.state.read();
        Ok(state
            .certificates(course_id, mode, status)
            .map(|i| match field {
                MonetaryField::UnitCost => i.unit_cost,
                MonetaryField::ListPrice => i.list_price.unwrap_or(Decimal::ZERO),
                MonetaryField::ServiceFee => i.service_fee,
            })
            .sum())
    }

    async fn certificates_above(
        &self,
        course_id: &str,
        mode: &str,
        status: OrderStatus,
        min_unit_cost: Decimal,
    ) -> DomainResult<u64> {
        let state = self.state.read();
        Ok(state
            .certificates(course_id, mode, status)
            .filter(|i| i.unit_cost > min_unit_cost)
            .count() as u64)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_item::{CourseSeat, ItemKind};

    fn seat(order: &Order, course: &str) -> OrderItem {
        let mut item = OrderItem::new(
            order.id,
            order.user_id,
            order.status,
            ItemKind::CourseSeat(CourseSeat {
                course_id: course.into(),
                mode: "honor".into(),
            }),
        );
        item.unit_cost = Decimal::new(4000, 2);
        item
    }

    fn redemption(order: &Order) -> CouponRedemption {
        CouponRedemption {
            id: 0,
            order_id: order.id,
            user_id: order.user_id,
            coupon_id: 9,
        }
    }

    #[tokio::test]
    async fn newest_cart_wins() {
        let repos = InMemoryRepositoryProvider::new();
        let first = repos.orders().save(Order::new_cart(1)).await.unwrap();
        let second = repos.orders().save(Order::new_cart(1)).await.unwrap();
        assert!(second.id > first.id);
        let found = repos.orders().find_newest_cart(1).await.unwrap().unwrap();
        assert_eq!(found.id, second.id);
        assert!(repos.orders().find_newest_cart(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transition_is_guarded_and_mirrors_items() {
        let repos = InMemoryRepositoryProvider::new();
        let order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        repos.order_items().save(seat(&order, "c1")).await.unwrap();

        let now = Utc::now();
        assert!(repos
            .orders()
            .transition(order.id, &[OrderStatus::Cart], OrderStatus::Purchased, Some(now))
            .await
            .unwrap());
        assert!(!repos
            .orders()
            .transition(order.id, &[OrderStatus::Cart], OrderStatus::Paying, None)
            .await
            .unwrap());

        let stored = repos.orders().find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Purchased);
        assert_eq!(stored.purchase_time, Some(now));
        let items = repos.order_items().find_by_order(order.id).await.unwrap();
        assert!(items.iter().all(|i| i.status == OrderStatus::Purchased));
    }

    #[tokio::test]
    async fn update_never_touches_status() {
        let repos = InMemoryRepositoryProvider::new();
        let mut order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        order.status = OrderStatus::Refunded;
        order.currency = "eur".into();
        repos.orders().update(&order).await.unwrap();

        let stored = repos.orders().find_by_id(order.id).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Cart);
        assert_eq!(stored.currency, "eur");
    }

    #[tokio::test]
    async fn commit_replaces_items_once() {
        let repos = InMemoryRepositoryProvider::new();
        let order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        let old = repos.order_items().save(seat(&order, "c1")).await.unwrap();

        let mut purchased = order.clone();
        purchased.status = OrderStatus::Purchased;
        let commit = PurchaseCommit {
            order: purchased,
            expected: vec![OrderStatus::Cart, OrderStatus::Paying],
            removed_items: vec![old.id],
            added_items: vec![seat(&order, "c2")],
        };
        assert!(repos.orders().commit_purchase(commit.clone()).await.unwrap());
        assert!(!repos.orders().commit_purchase(commit).await.unwrap());

        let items = repos.order_items().find_by_order(order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].course_id(), Some("c2"));
        assert_eq!(items[0].status, OrderStatus::Purchased);
    }

    #[tokio::test]
    async fn duplicate_code_string_conflicts() {
        let repos = InMemoryRepositoryProvider::new();
        repos
            .registration_codes()
            .save(CourseRegistrationCode::new("ABCD2345", "c1", 1, None, None))
            .await
            .unwrap();
        let err = repos
            .registration_codes()
            .save(CourseRegistrationCode::new("ABCD2345", "c2", 1, None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn code_redeems_once() {
        let repos = InMemoryRepositoryProvider::new();
        let code = repos
            .registration_codes()
            .save(CourseRegistrationCode::new("ZZZZ9999", "c1", 1, None, None))
            .await
            .unwrap();
        repos
            .code_redemptions()
            .redeem(&code, RegistrationCodeRedemption::new(code.id, 5, None), None)
            .await
            .unwrap();
        let err = repos
            .code_redemptions()
            .redeem(&code, RegistrationCodeRedemption::new(code.id, 6, None), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CodeAlreadyRedeemed(_)));
        assert_eq!(
            repos.code_redemptions().find_for_code(code.id).await.unwrap().unwrap().redeemed_by,
            5
        );
    }

    #[tokio::test]
    async fn cart_writes_stop_once_the_order_leaves_the_cart() {
        let repos = InMemoryRepositoryProvider::new();
        let order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        let item = repos.order_items().save(seat(&order, "c1")).await.unwrap();
        repos
            .orders()
            .transition(order.id, &[OrderStatus::Cart], OrderStatus::Paying, None)
            .await
            .unwrap();

        let items = repos.order_items();
        assert!(matches!(items.set_quantity(item.id, 7).await, Err(DomainError::Validation(_))));
        assert!(matches!(items.reset_price(item.id).await, Err(DomainError::Validation(_))));
        assert!(matches!(items.update(&item).await, Err(DomainError::Validation(_))));
        assert!(matches!(items.delete(item.id).await, Err(DomainError::Validation(_))));
        assert!(matches!(items.delete_by_order(order.id).await, Err(DomainError::Validation(_))));
        assert!(matches!(items.save(seat(&order, "c2")).await, Err(DomainError::Validation(_))));

        let discount = item.discount(Decimal::ZERO);
        assert!(repos.coupon_redemptions().redeem(redemption(&order), &discount).await.is_err());
        assert!(repos.coupon_redemptions().find_for_order(order.id, 1).await.unwrap().is_empty());

        let stored = items.find_by_order(order.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].qty, 1);
        assert_eq!(stored[0].unit_cost, Decimal::new(4000, 2));
        assert!(stored[0].list_price.is_none());
    }

    #[tokio::test]
    async fn one_discount_per_line_across_coupons_and_codes() {
        let repos = InMemoryRepositoryProvider::new();
        let order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        let item = repos.order_items().save(seat(&order, "c1")).await.unwrap();
        let code = repos
            .registration_codes()
            .save(CourseRegistrationCode::new("FREE2345", "c1", 1, None, None))
            .await
            .unwrap();

        // Both discounts were computed from the same undiscounted read.
        let coupon_discount = item.discount(Decimal::new(3200, 2));
        let code_discount = item.discount(Decimal::ZERO);

        repos
            .coupon_redemptions()
            .redeem(redemption(&order), &coupon_discount)
            .await
            .unwrap();
        let err = repos
            .code_redemptions()
            .redeem(
                &code,
                RegistrationCodeRedemption::new(code.id, 1, Some(order.id)),
                Some(&code_discount),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ItemAlreadyDiscounted(id) if id == item.id));
        assert!(repos.code_redemptions().find_for_code(code.id).await.unwrap().is_none());

        let stored = repos.order_items().find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.unit_cost, Decimal::new(3200, 2));
        assert_eq!(stored.list_price, Some(Decimal::new(4000, 2)));
    }

    #[tokio::test]
    async fn quantity_change_survives_a_redemption() {
        let repos = InMemoryRepositoryProvider::new();
        let order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        let item = repos.order_items().save(seat(&order, "c1")).await.unwrap();

        let discount = item.discount(Decimal::new(2000, 2));
        repos.order_items().set_quantity(item.id, 3).await.unwrap();
        repos
            .coupon_redemptions()
            .redeem(redemption(&order), &discount)
            .await
            .unwrap();

        let stored = repos.order_items().find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.qty, 3);
        assert_eq!(stored.unit_cost, Decimal::new(2000, 2));

        assert!(repos.order_items().reset_price(item.id).await.unwrap());
        assert!(!repos.order_items().reset_price(item.id).await.unwrap());
        let stored = repos.order_items().find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.qty, 3);
        assert_eq!(stored.unit_cost, Decimal::new(4000, 2));
    }

    #[tokio::test]
    async fn update_refuses_a_discounted_line() {
        let repos = InMemoryRepositoryProvider::new();
        let order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        let mut item = repos.order_items().save(seat(&order, "c1")).await.unwrap();
        let discount = item.discount(Decimal::ZERO);
        repos.coupon_redemptions().redeem(redemption(&order), &discount).await.unwrap();

        item.unit_cost = Decimal::new(9900, 2);
        let err = repos.order_items().update(&item).await.unwrap_err();
        assert!(matches!(err, DomainError::ItemAlreadyDiscounted(_)));
        let stored = repos.order_items().find_by_id(item.id).await.unwrap().unwrap();
        assert_eq!(stored.unit_cost, Decimal::ZERO);
    }

    #[tokio::test]
    async fn mark_fulfilled_stamps_once() {
        let repos = InMemoryRepositoryProvider::new();
        let order = repos.orders().save(Order::new_cart(1)).await.unwrap();
        let item = repos.order_items().save(seat(&order, "c1")).await.unwrap();
        assert!(repos.order_items().mark_fulfilled(item.id, Utc::now()).await.unwrap());
        assert!(!repos.order_items().mark_fulfilled(item.id, Utc::now()).await.unwrap());
        assert!(repos.order_items().mark_fulfilled(999, Utc::now()).await.is_err());
    }
}
