//! Discount service for coupons and registration codes
//!
//! A discount rewrites one cart line (`list_price` keeps the old price) and
//! records a redemption in the same atomic write. A line carries at most one
//! discount. Removing redemptions never restores the price.

use tracing::{info, warn};

use crate::application::context::ShopContext;
use crate::application::items::ensure_cart;
use crate::domain::coupon::{Coupon, CouponRedemption};
use crate::domain::order::Order;
use crate::domain::order_item::OrderItem;
use crate::domain::registration_code::{CodeSource, CourseRegistrationCode, RegistrationCodeRedemption};
use crate::domain::ports::DEFAULT_MODE_SLUG;
use crate::domain::{DomainError, DomainResult};

pub struct DiscountService {
    ctx: ShopContext,
}

impl DiscountService {
    pub fn new(ctx: ShopContext) -> Self {
        Self { ctx }
    }

    // ── Coupons ────────────────────────────────────────────────

    /// Apply the active coupon `code` to the first cart line for its course.
    ///
    /// Returns whether a line matched. Fails with `MultipleCoupons` when the
    /// order already has a redemption of a coupon with a different code, or
    /// of this very coupon.
    pub async fn redeem_coupon(&self, order: &Order, code: &str) -> DomainResult<bool> {
        ensure_cart(order)?;
        let coupon = self
            .ctx
            .repos
            .coupons()
            .find_active_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("Coupon", "code", code))?;

        let existing = self
            .ctx
            .repos
            .coupon_redemptions()
            .find_for_order(order.id, order.user_id)
            .await?;
        for redemption in existing {
            let Some(redeemed) = self.ctx.repos.coupons().find_by_id(redemption.coupon_id).await? else {
                continue;
            };
            if coupon.is_blocked_by(&redeemed) {
                warn!(user_id = order.user_id, order_id = order.id, code, "Coupon redemption already exists");
                return Err(DomainError::MultipleCoupons(order.id));
            }
        }

        let items = self.ctx.repos.order_items().find_by_order(order.id).await?;
        let Some(item) = first_for_course(items, &coupon.course_id) else {
            return Ok(false);
        };
        if item.has_discount() {
            warn!(order_id = order.id, item_id = item.id, code, "Item already discounted");
            return Err(DomainError::ItemAlreadyDiscounted(item.id));
        }

        let discount = item.discount(coupon.discounted_price(item.unit_cost));
        self.ctx
            .repos
            .coupon_redemptions()
            .redeem(
                CouponRedemption {
                    id: 0,
                    order_id: order.id,
                    user_id: order.user_id,
                    coupon_id: coupon.id,
                },
                &discount,
            )
            .await?;

        metrics::counter!("shoppingcart_coupon_redemptions_total").increment(1);
        info!(
            user_id = order.user_id,
            order_id = order.id,
            item_id = item.id,
            code,
            price = %discount.unit_cost,
            "Discount generated"
        );
        Ok(true)
    }

    /// Delete the coupon redemptions of a user's cart
    pub async fn remove_coupon_redemptions(&self, user_id: i32, order_id: i32) -> DomainResult<u64> {
        let removed = self
            .ctx
            .repos
            .coupon_redemptions()
            .delete_for_order(user_id, order_id)
            .await?;
        if removed > 0 {
            info!(user_id, order_id, removed, "Coupon redemption entry removed");
        }
        Ok(removed)
    }

    // ── Registration codes ─────────────────────────────────────

    /// Make the cart line for the code's course free.
    ///
    /// A code is single use across the whole platform.
    pub async fn redeem_registration_code(&self, order: &Order, code: &str) -> DomainResult<CourseRegistrationCode> {
        ensure_cart(order)?;
        let reg_code = self.find_code(code).await?;
        self.ensure_unredeemed(&reg_code).await?;

        let items = self.ctx.repos.order_items().find_by_order(order.id).await?;
        let Some(item) = first_for_course(items, &reg_code.course_id) else {
            warn!(order_id = order.id, code, "Course item does not exist against registration code");
            return Err(DomainError::NoItemForCode(code.to_string()));
        };
        if item.has_discount() {
            warn!(order_id = order.id, item_id = item.id, code, "Item already discounted");
            return Err(DomainError::ItemAlreadyDiscounted(item.id));
        }

        let discount = item.discount(rust_decimal::Decimal::ZERO);
        self.ctx
            .repos
            .code_redemptions()
            .redeem(
                &reg_code,
                RegistrationCodeRedemption::new(reg_code.id, order.user_id, Some(order.id)),
                Some(&discount),
            )
            .await?;

        metrics::counter!("shoppingcart_code_redemptions_total", "source" => "order").increment(1);
        info!(user_id = order.user_id, order_id = order.id, item_id = item.id, code, "Registration code used");
        Ok(reg_code)
    }

    /// Redeem an invoice-sourced code directly, without a cart, and enroll
    /// the user in its course.
    pub async fn redeem_invoice_code(&self, user_id: i32, code: &str) -> DomainResult<RegistrationCodeRedemption> {
        let reg_code = self.find_code(code).await?;
        let CodeSource::Invoice(invoice_id) = reg_code.source() else {
            return Err(DomainError::Validation(format!("Code {} was not issued against an invoice", code)));
        };
        let invoice = self
            .ctx
            .repos
            .invoices()
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Invoice", "id", invoice_id))?;
        if !invoice.is_valid {
            warn!(user_id, invoice_id, code, "Code belongs to an invalidated invoice");
            return Err(DomainError::Validation(format!("Invoice {} is no longer valid", invoice_id)));
        }
        self.ensure_unredeemed(&reg_code).await?;

        let redemption = self
            .ctx
            .repos
            .code_redemptions()
            .redeem(&reg_code, RegistrationCodeRedemption::new(reg_code.id, user_id, None), None)
            .await?;
        self.ctx
            .enrollments
            .enroll(user_id, &reg_code.course_id, DEFAULT_MODE_SLUG)
            .await?;

        metrics::counter!("shoppingcart_code_redemptions_total", "source" => "invoice").increment(1);
        info!(user_id, invoice_id, code, "Invoice registration code redeemed");
        Ok(redemption)
    }

    /// Delete the code redemptions of a user's cart
    pub async fn remove_code_redemptions(&self, user_id: i32, order_id: i32) -> DomainResult<u64> {
        let removed = self
            .ctx
            .repos
            .code_redemptions()
            .delete_for_order(user_id, order_id)
            .await?;
        if removed > 0 {
            info!(user_id, order_id, removed, "Registration code redemption entry removed");
        }
        Ok(removed)
    }

    async fn find_code(&self, code: &str) -> DomainResult<CourseRegistrationCode> {
        self.ctx
            .repos
            .registration_codes()
            .find_by_code(code)
            .await?
            .ok_or_else(|| DomainError::not_found("CourseRegistrationCode", "code", code))
    }

    async fn ensure_unredeemed(&self, code: &CourseRegistrationCode) -> DomainResult<()> {
        if self.ctx.repos.code_redemptions().find_for_code(code.id).await?.is_some() {
            warn!(code = %code.code, "Registration code already used");
            return Err(DomainError::CodeAlreadyRedeemed(code.code.clone()));
        }
        Ok(())
    }

    // ── Coupon administration ──────────────────────────────────

    pub async fn create_coupon(
        &self,
        code: &str,
        course_id: &str,
        percentage_discount: i32,
        description: Option<String>,
        created_by: i32,
    ) -> DomainResult<Coupon> {
        if code.trim().is_empty() || code.len() > 32 {
            return Err(DomainError::Validation("Coupon code must be 1-32 characters".into()));
        }
        if !(0..=100).contains(&percentage_discount) {
            return Err(DomainError::Validation(format!(
                "Percentage discount must be between 0 and 100, got {}",
                percentage_discount
            )));
        }
        let mut coupon = Coupon::new(code, course_id, percentage_discount, created_by);
        coupon.description = description;
        let coupon = self.ctx.repos.coupons().save(coupon).await?;
        info!(coupon_id = coupon.id, code, course_id, percentage_discount, "Coupon created");
        Ok(coupon)
    }

    /// Soft delete
    pub async fn deactivate_coupon(&self, coupon_id: i32) -> DomainResult<()> {
        if !self.ctx.repos.coupons().deactivate(coupon_id).await? {
            return Err(DomainError::not_found("Coupon", "id", coupon_id));
        }
        info!(coupon_id, "Coupon deactivated");
        Ok(())
    }

    pub async fn list_active_coupons(&self) -> DomainResult<Vec<Coupon>> {
        self.ctx.repos.coupons().find_active().await
    }

    pub async fn list_all_coupons(&self) -> DomainResult<Vec<Coupon>> {
        self.ctx.repos.coupons().find_all().await
    }
}

fn first_for_course(items: Vec<OrderItem>, course_id: &str) -> Option<OrderItem> {
    items.into_iter().find(|item| item.course_id() == Some(course_id))
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::application::items::PriceRequest;
    use crate::domain::registration_code::Invoice;
    use crate::domain::ErrorKind;
    use crate::test_support::{sample_billing, TestShop, COURSE_A, COURSE_B};

    async fn cart_with_verified_seat(shop: &TestShop, user_id: i32) -> (Order, OrderItem) {
        let mut cart = shop.cart(user_id).await;
        let item = shop
            .cart_service()
            .add_course_seat(&mut cart, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();
        (cart, item)
    }

    async fn code_for(shop: &TestShop, course_id: &str, order_id: Option<i32>, invoice_id: Option<i32>) -> CourseRegistrationCode {
        shop.ctx
            .codes
            .mint_registration_code(99, course_id, invoice_id, order_id)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn twenty_percent_coupon() {
        let shop = TestShop::new();
        let discounts = shop.discounts();
        discounts.create_coupon("SAVE20", COURSE_A, 20, None, 1).await.unwrap();
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;

        assert!(discounts.redeem_coupon(&cart, "SAVE20").await.unwrap());

        let item = &shop.items(cart.id).await[0];
        assert_eq!(item.unit_cost, Decimal::new(8000, 2));
        assert_eq!(item.list_price, Some(Decimal::new(10000, 2)));
    }

    #[tokio::test]
    async fn coupon_for_other_course_matches_nothing() {
        let shop = TestShop::new();
        let discounts = shop.discounts();
        discounts.create_coupon("B10", COURSE_B, 10, None, 1).await.unwrap();
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;

        assert!(!discounts.redeem_coupon(&cart, "B10").await.unwrap());
        assert!(shop
            .ctx
            .repos
            .coupon_redemptions()
            .find_for_order(cart.id, 2)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn second_coupon_conflicts() {
        let shop = TestShop::new();
        let discounts = shop.discounts();
        discounts.create_coupon("SAVE20", COURSE_A, 20, None, 1).await.unwrap();
        discounts.create_coupon("OTHER", COURSE_A, 50, None, 1).await.unwrap();
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;
        discounts.redeem_coupon(&cart, "SAVE20").await.unwrap();

        // same coupon again
        let err = discounts.redeem_coupon(&cart, "SAVE20").await.unwrap_err();
        assert!(matches!(err, DomainError::MultipleCoupons(_)));
        assert_eq!(err.kind(), ErrorKind::RedemptionConflict);

        // different code
        let err = discounts.redeem_coupon(&cart, "OTHER").await.unwrap_err();
        assert!(matches!(err, DomainError::MultipleCoupons(_)));

        assert_eq!(shop.items(cart.id).await[0].unit_cost, Decimal::new(8000, 2));
    }

    #[tokio::test]
    async fn inactive_coupon_is_not_found() {
        let shop = TestShop::new();
        let discounts = shop.discounts();
        let coupon = discounts.create_coupon("GONE", COURSE_A, 20, None, 1).await.unwrap();
        discounts.deactivate_coupon(coupon.id).await.unwrap();
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;

        let err = discounts.redeem_coupon(&cart, "GONE").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        assert!(discounts.list_active_coupons().await.unwrap().is_empty());
        assert_eq!(discounts.list_all_coupons().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn coupon_validation() {
        let discounts = TestShop::new().discounts();
        assert!(discounts.create_coupon("", COURSE_A, 20, None, 1).await.is_err());
        assert!(discounts.create_coupon("BIG", COURSE_A, 120, None, 1).await.is_err());
        assert!(discounts.deactivate_coupon(404).await.is_err());
    }

    #[tokio::test]
    async fn registration_code_makes_line_free_once() {
        let shop = TestShop::new();
        let discounts = shop.discounts();
        let code = code_for(&shop, COURSE_A, None, None).await;
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;

        discounts.redeem_registration_code(&cart, &code.code).await.unwrap();
        let item = &shop.items(cart.id).await[0];
        assert_eq!(item.unit_cost, Decimal::ZERO);
        assert_eq!(item.list_price, Some(Decimal::new(10000, 2)));

        // another user, another cart
        let (other, _) = cart_with_verified_seat(&shop, 3).await;
        let err = discounts.redeem_registration_code(&other, &code.code).await.unwrap_err();
        assert!(matches!(err, DomainError::CodeAlreadyRedeemed(_)));
        assert_eq!(shop.items(other.id).await[0].unit_cost, Decimal::new(10000, 2));
    }

    #[tokio::test]
    async fn code_without_matching_line() {
        let shop = TestShop::new();
        let code = code_for(&shop, COURSE_B, None, None).await;
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;

        let err = shop.discounts().redeem_registration_code(&cart, &code.code).await.unwrap_err();
        assert!(matches!(err, DomainError::NoItemForCode(_)));
        assert_eq!(err.kind(), ErrorKind::RedemptionNotApplicable);
        assert!(shop.ctx.repos.code_redemptions().find_for_code(code.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn coupon_and_code_exclusive_on_one_line() {
        let shop = TestShop::new();
        let discounts = shop.discounts();
        discounts.create_coupon("SAVE20", COURSE_A, 20, None, 1).await.unwrap();
        let code = code_for(&shop, COURSE_A, None, None).await;
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;

        discounts.redeem_coupon(&cart, "SAVE20").await.unwrap();
        let err = discounts.redeem_registration_code(&cart, &code.code).await.unwrap_err();
        assert!(matches!(err, DomainError::ItemAlreadyDiscounted(_)));
        assert!(shop.ctx.repos.code_redemptions().find_for_code(code.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn removal_keeps_discounted_price() {
        let shop = TestShop::new();
        let discounts = shop.discounts();
        discounts.create_coupon("SAVE20", COURSE_A, 20, None, 1).await.unwrap();
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;
        discounts.redeem_coupon(&cart, "SAVE20").await.unwrap();

        assert_eq!(discounts.remove_coupon_redemptions(2, cart.id).await.unwrap(), 1);
        assert_eq!(discounts.remove_coupon_redemptions(2, cart.id).await.unwrap(), 0);
        assert_eq!(shop.items(cart.id).await[0].unit_cost, Decimal::new(8000, 2));
    }

    #[tokio::test]
    async fn code_redeemed_cart_goes_through_free_enrollment() {
        let shop = TestShop::new();
        let code = code_for(&shop, COURSE_A, None, None).await;
        let (cart, _) = cart_with_verified_seat(&shop, 2).await;
        shop.discounts().redeem_registration_code(&cart, &code.code).await.unwrap();

        let order = shop.checkout().free_enrollment(cart.id).await.unwrap();
        assert!(!order.is_cart());
        assert!(shop.enrollments.mode_of(2, COURSE_A).is_some());
        assert_ne!(shop.cart(2).await.id, cart.id);
    }

    #[tokio::test]
    async fn bought_code_redeemed_by_colleague() {
        let shop = TestShop::new();
        let mut buyer_cart = shop.cart(2).await;
        shop.cart_service()
            .add_code_bundle(&mut buyer_cart, COURSE_A, 2, &PriceRequest::mode("verified"))
            .await
            .unwrap();
        shop.checkout().purchase(buyer_cart.id, sample_billing()).await.unwrap();
        let codes = shop
            .ctx
            .repos
            .registration_codes()
            .find_by_order_and_course(buyer_cart.id, COURSE_A)
            .await
            .unwrap();

        let (cart, _) = cart_with_verified_seat(&shop, 3).await;
        shop.discounts().redeem_registration_code(&cart, &codes[0].code).await.unwrap();
        shop.checkout().free_enrollment(cart.id).await.unwrap();
        assert_eq!(shop.enrollments.mode_of(3, COURSE_A).as_deref(), Some("honor"));
    }

    #[tokio::test]
    async fn invoice_code_redeemed_without_cart() {
        let shop = TestShop::new();
        let invoice = shop
            .ctx
            .repos
            .invoices()
            .save(Invoice {
                id: 0,
                company_name: "Acme".into(),
                company_contact_name: "Jane".into(),
                company_contact_email: "jane@acme.example".into(),
                recipient_name: "AP".into(),
                recipient_email: "ap@acme.example".into(),
                address_line_1: "1 Main St".into(),
                address_line_2: None,
                address_line_3: None,
                city: None,
                state: None,
                zip: None,
                country: None,
                course_id: COURSE_A.into(),
                total_amount: Decimal::new(50000, 2),
                internal_reference: None,
                customer_reference_number: None,
                is_valid: true,
            })
            .await
            .unwrap();
        let code = code_for(&shop, COURSE_A, None, Some(invoice.id)).await;

        let redemption = shop.discounts().redeem_invoice_code(4, &code.code).await.unwrap();
        assert!(redemption.order_id.is_none());
        assert_eq!(redemption.redeemed_by, 4);
        assert!(shop.enrollments.mode_of(4, COURSE_A).is_some());

        let err = shop.discounts().redeem_invoice_code(5, &code.code).await.unwrap_err();
        assert!(matches!(err, DomainError::CodeAlreadyRedeemed(_)));
    }

    #[tokio::test]
    async fn order_code_cannot_be_redeemed_as_invoice_code() {
        let shop = TestShop::new();
        let code = code_for(&shop, COURSE_A, Some(77), None).await;
        let err = shop.discounts().redeem_invoice_code(4, &code.code).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
