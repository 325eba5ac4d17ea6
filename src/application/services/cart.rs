//! Cart service: everything a user does before paying

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::{info, warn};
use validator::Validate;

use crate::application::context::ShopContext;
use crate::application::items::{
    self, certificate, code_bundle, course_seat, donation, generate_receipt_instructions, PriceRequest,
};
use crate::domain::order::{BulkBillingDetails, Order};
use crate::domain::order_item::{ItemKindTag, ItemRef, OrderItem};
use crate::domain::{DomainError, DomainResult};

/// Per-item receipt instructions plus their de-duplicated union
pub type ReceiptInstructions = (BTreeMap<ItemRef, BTreeSet<String>>, BTreeSet<String>);

pub struct CartService {
    ctx: ShopContext,
}

impl CartService {
    pub fn new(ctx: ShopContext) -> Self {
        Self { ctx }
    }

    // ── Cart lookup ────────────────────────────────────────────

    /// The user's newest `cart` order, created when there is none.
    ///
    /// Two concurrent first calls may both create a cart; later calls always
    /// see the newest one.
    pub async fn get_or_create_cart(&self, user_id: i32) -> DomainResult<Order> {
        if let Some(cart) = self.ctx.repos.orders().find_newest_cart(user_id).await? {
            return Ok(cart);
        }
        let mut cart = Order::new_cart(user_id);
        cart.currency = self.ctx.shop.default_currency.clone();
        let cart = self.ctx.repos.orders().save(cart).await?;
        info!(user_id, order_id = cart.id, "Created cart");
        Ok(cart)
    }

    pub async fn items(&self, order_id: i32) -> DomainResult<Vec<OrderItem>> {
        self.ctx.repos.order_items().find_by_order(order_id).await
    }

    /// Whether the order holds any item, or any item of `kind` when given
    pub async fn has_items(&self, order: &Order, kind: Option<ItemKindTag>) -> DomainResult<bool> {
        let items = self.items(order.id).await?;
        Ok(match kind {
            Some(kind) => items.iter().any(|item| item.tag() == kind),
            None => !items.is_empty(),
        })
    }

    /// Whether the user's cart holds any item of one of `kinds` (any item when empty)
    pub async fn user_cart_has_items(&self, user_id: i32, kinds: &[ItemKindTag]) -> DomainResult<bool> {
        let cart = self.get_or_create_cart(user_id).await?;
        if kinds.is_empty() {
            return self.has_items(&cart, None).await;
        }
        for kind in kinds {
            if self.has_items(&cart, Some(*kind)).await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Sum of line costs over items whose status matches the order's
    pub async fn total_cost(&self, order: &Order) -> DomainResult<Decimal> {
        Ok(self
            .items(order.id)
            .await?
            .iter()
            .filter(|item| item.status == order.status)
            .map(OrderItem::line_cost)
            .sum())
    }

    // ── Adding items ───────────────────────────────────────────

    pub async fn add_course_seat(
        &self,
        order: &mut Order,
        course_id: &str,
        price: &PriceRequest,
    ) -> DomainResult<OrderItem> {
        course_seat::add_to_order(&self.ctx, order, course_id, price).await
    }

    pub async fn add_code_bundle(
        &self,
        order: &mut Order,
        course_id: &str,
        qty: i32,
        price: &PriceRequest,
    ) -> DomainResult<OrderItem> {
        code_bundle::add_to_order(&self.ctx, order, course_id, qty, price).await
    }

    pub async fn add_certificate(
        &self,
        order: &mut Order,
        course_id: &str,
        cost: Decimal,
        mode: &str,
        currency: Option<&str>,
    ) -> DomainResult<OrderItem> {
        certificate::add_to_order(&self.ctx, order, course_id, cost, mode, currency).await
    }

    pub async fn add_donation(
        &self,
        order: &mut Order,
        amount: Decimal,
        course_id: Option<&str>,
        currency: Option<&str>,
    ) -> DomainResult<OrderItem> {
        donation::add_to_order(&self.ctx, order, amount, course_id, currency).await
    }

    // ── Editing the cart ───────────────────────────────────────

    pub async fn remove_item(&self, order: &Order, item_id: i32) -> DomainResult<()> {
        items::ensure_cart(order)?;
        let item = self.item_in_order(order, item_id).await?;
        self.ctx.repos.order_items().delete(item.id).await?;
        info!(user_id = order.user_id, order_id = order.id, item_id, "Removed item from cart");
        Ok(())
    }

    /// Change the quantity of a seat or bundle line.
    ///
    /// Any line above one switches the order to a business purchase at checkout.
    pub async fn update_item_quantity(&self, order: &Order, item_id: i32, qty: i32) -> DomainResult<OrderItem> {
        items::ensure_cart(order)?;
        if qty < 1 {
            return Err(DomainError::Validation(format!("Quantity must be at least 1, got {}", qty)));
        }
        let item = self.item_in_order(order, item_id).await?;
        if !matches!(item.tag(), ItemKindTag::CourseSeat | ItemKindTag::CodeBundle) {
            warn!(order_id = order.id, item_id, kind = %item.tag(), "Quantity change on fixed-quantity item");
            return Err(DomainError::Validation(format!(
                "Quantity of {} items cannot be changed",
                item.tag()
            )));
        }
        self.ctx.repos.order_items().set_quantity(item.id, qty).await?;
        info!(order_id = order.id, item_id, qty, "Updated item quantity");
        self.item_in_order(order, item_id).await
    }

    /// Remove every item from the cart
    pub async fn clear(&self, order: &Order) -> DomainResult<u64> {
        items::ensure_cart(order)?;
        let removed = self.ctx.repos.order_items().delete_by_order(order.id).await?;
        info!(user_id = order.user_id, order_id = order.id, removed, "Cleared cart");
        Ok(removed)
    }

    /// Put every discounted line back to its list price
    pub async fn reset_cart_items_prices(&self, order: &Order) -> DomainResult<()> {
        items::ensure_cart(order)?;
        for item in self.items(order.id).await? {
            if item.has_discount() && self.ctx.repos.order_items().reset_price(item.id).await? {
                info!(order_id = order.id, item_id = item.id, "Restored list price");
            }
        }
        Ok(())
    }

    /// Record the optional company and recipient details of a business purchase
    pub async fn add_billing_details(&self, order: &mut Order, details: BulkBillingDetails) -> DomainResult<()> {
        details
            .validate()
            .map_err(|e| DomainError::Validation(format!("Invalid billing details: {}", e)))?;
        order.bulk = details;
        self.ctx.repos.orders().update(order).await?;
        info!(order_id = order.id, "Recorded business billing details");
        Ok(())
    }

    // ── Receipt ────────────────────────────────────────────────

    pub async fn generate_receipt_instructions(&self, order: &Order) -> DomainResult<ReceiptInstructions> {
        let mut by_item = BTreeMap::new();
        let mut all = BTreeSet::new();
        for item in self.items(order.id).await? {
            let (item_ref, instructions) = generate_receipt_instructions(&item, &self.ctx);
            all.extend(instructions.iter().cloned());
            by_item.insert(item_ref, instructions);
        }
        Ok((by_item, all))
    }

    async fn item_in_order(&self, order: &Order, item_id: i32) -> DomainResult<OrderItem> {
        match self.ctx.repos.order_items().find_by_id(item_id).await? {
            Some(item) if item.order_id == order.id => Ok(item),
            _ => Err(DomainError::not_found("OrderItem", "id", item_id)),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderStatus;
    use crate::test_support::{TestShop, COURSE_A, COURSE_B};

    #[tokio::test]
    async fn single_cart_per_user() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let first = carts.get_or_create_cart(9).await.unwrap();
        let second = carts.get_or_create_cart(9).await.unwrap();
        assert_eq!(first.id, second.id);

        let other = carts.get_or_create_cart(10).await.unwrap();
        assert_ne!(first.id, other.id);
    }

    #[tokio::test]
    async fn new_cart_after_purchase() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let cart = carts.get_or_create_cart(9).await.unwrap();
        shop.ctx
            .repos
            .orders()
            .transition(cart.id, &[OrderStatus::Cart], OrderStatus::Purchased, None)
            .await
            .unwrap();

        let next = carts.get_or_create_cart(9).await.unwrap();
        assert_ne!(next.id, cart.id);
        assert!(next.is_cart());
    }

    #[tokio::test]
    async fn total_cost_sums_line_costs() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let mut cart = carts.get_or_create_cart(9).await.unwrap();
        carts
            .add_course_seat(&mut cart, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();
        carts
            .add_code_bundle(&mut cart, COURSE_B, 3, &PriceRequest::default().with_cost(Decimal::new(1000, 2)))
            .await
            .unwrap();

        assert_eq!(carts.total_cost(&cart).await.unwrap(), Decimal::new(13000, 2));
    }

    #[tokio::test]
    async fn has_items_by_kind() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        assert!(!carts.user_cart_has_items(9, &[]).await.unwrap());

        let mut cart = carts.get_or_create_cart(9).await.unwrap();
        carts.add_donation(&mut cart, Decimal::TEN, None, None).await.unwrap();

        assert!(carts.user_cart_has_items(9, &[]).await.unwrap());
        assert!(carts
            .user_cart_has_items(9, &[ItemKindTag::CourseSeat, ItemKindTag::Donation])
            .await
            .unwrap());
        assert!(!carts.user_cart_has_items(9, &[ItemKindTag::Certificate]).await.unwrap());
        assert!(carts.has_items(&cart, Some(ItemKindTag::Donation)).await.unwrap());
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let mut cart = carts.get_or_create_cart(9).await.unwrap();
        let seat = carts
            .add_course_seat(&mut cart, COURSE_A, &PriceRequest::default())
            .await
            .unwrap();
        carts.add_course_seat(&mut cart, COURSE_B, &PriceRequest::default()).await.unwrap();

        carts.remove_item(&cart, seat.id).await.unwrap();
        assert_eq!(carts.items(cart.id).await.unwrap().len(), 1);

        let err = carts.remove_item(&cart, seat.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));

        assert_eq!(carts.clear(&cart).await.unwrap(), 1);
        assert!(carts.items(cart.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cannot_remove_from_other_users_cart() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let mut mine = carts.get_or_create_cart(9).await.unwrap();
        let theirs = carts.get_or_create_cart(10).await.unwrap();
        let seat = carts
            .add_course_seat(&mut mine, COURSE_A, &PriceRequest::default())
            .await
            .unwrap();

        assert!(carts.remove_item(&theirs, seat.id).await.is_err());
        assert_eq!(carts.items(mine.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn quantity_only_for_seats_and_bundles() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let mut cart = carts.get_or_create_cart(9).await.unwrap();
        let seat = carts
            .add_course_seat(&mut cart, COURSE_A, &PriceRequest::default())
            .await
            .unwrap();
        let gift = carts.add_donation(&mut cart, Decimal::TEN, None, None).await.unwrap();

        let updated = carts.update_item_quantity(&cart, seat.id, 4).await.unwrap();
        assert_eq!(updated.qty, 4);

        assert!(matches!(
            carts.update_item_quantity(&cart, gift.id, 2).await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            carts.update_item_quantity(&cart, seat.id, 0).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn reset_prices_restores_list_price() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let mut cart = carts.get_or_create_cart(9).await.unwrap();
        carts
            .add_course_seat(&mut cart, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();
        let discounts = shop.discounts();
        discounts.create_coupon("HALF", COURSE_A, 50, None, 1).await.unwrap();
        discounts.redeem_coupon(&cart, "HALF").await.unwrap();
        assert_eq!(carts.items(cart.id).await.unwrap()[0].unit_cost, Decimal::new(5000, 2));

        carts.reset_cart_items_prices(&cart).await.unwrap();
        let items = carts.items(cart.id).await.unwrap();
        assert_eq!(items[0].unit_cost, Decimal::new(10000, 2));
        assert!(items[0].list_price.is_none());
    }

    #[tokio::test]
    async fn billing_details_are_validated() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let mut cart = carts.get_or_create_cart(9).await.unwrap();

        let bad = BulkBillingDetails {
            company_contact_email: Some("nope".into()),
            ..Default::default()
        };
        assert!(matches!(
            carts.add_billing_details(&mut cart, bad).await,
            Err(DomainError::Validation(_))
        ));

        let good = BulkBillingDetails {
            company_name: Some("Acme".into()),
            company_contact_email: Some("buyer@acme.example".into()),
            customer_reference_number: Some("PO-1".into()),
            ..Default::default()
        };
        carts.add_billing_details(&mut cart, good.clone()).await.unwrap();
        assert_eq!(carts.get_or_create_cart(9).await.unwrap().bulk, good);
    }

    #[tokio::test]
    async fn receipt_instructions_are_deduplicated() {
        let shop = TestShop::new();
        let carts = shop.cart_service();
        let mut cart = carts.get_or_create_cart(9).await.unwrap();
        let a = carts.add_course_seat(&mut cart, COURSE_A, &PriceRequest::default()).await.unwrap();
        let b = carts.add_course_seat(&mut cart, COURSE_B, &PriceRequest::default()).await.unwrap();
        carts.add_donation(&mut cart, Decimal::TEN, None, None).await.unwrap();

        let (by_item, all) = carts.generate_receipt_instructions(&cart).await.unwrap();
        assert_eq!(by_item.len(), 3);
        assert_eq!(by_item[&a.item_ref()], by_item[&b.item_ref()]);
        assert_eq!(all.len(), 2);
    }
}
