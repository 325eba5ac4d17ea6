//! OrderItem domain entity
//!
//! A line item is a common shape plus a variant payload. The variant set is
//! closed; behaviour per variant lives in `application::items`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::order::{OrderStatus, DEFAULT_CURRENCY};
use crate::domain::{DomainError, DomainResult};
use crate::shared::money::round_cents;

/// Discriminant of [`ItemKind`], stored alongside every row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKindTag {
    CourseSeat,
    CodeBundle,
    Certificate,
    Donation,
}

impl ItemKindTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CourseSeat => "course_seat",
            Self::CodeBundle => "code_bundle",
            Self::Certificate => "certificate",
            Self::Donation => "donation",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "course_seat" => Some(Self::CourseSeat),
            "code_bundle" => Some(Self::CodeBundle),
            "certificate" => Some(Self::Certificate),
            "donation" => Some(Self::Donation),
            _ => None,
        }
    }
}

impl std::fmt::Display for ItemKindTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Paid registration for a single seat in a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseSeat {
    pub course_id: String,
    pub mode: String,
}

/// Purchase of `qty` distributable registration codes for a course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBundle {
    pub course_id: String,
    pub mode: String,
}

/// Paid certificate upgrade for an enrollment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub course_id: String,
    pub enrollment_id: i32,
    pub mode: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationType {
    /// A donation to the organization as a whole
    General,
    /// A donation to a particular course
    Course,
}

impl DonationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Course => "course",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "general" => Some(Self::General),
            "course" => Some(Self::Course),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub donation_type: DonationType,
    pub course_id: Option<String>,
}

/// Variant payload of an [`OrderItem`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemKind {
    CourseSeat(CourseSeat),
    CodeBundle(CodeBundle),
    Certificate(Certificate),
    Donation(Donation),
}

impl ItemKind {
    pub fn tag(&self) -> ItemKindTag {
        match self {
            Self::CourseSeat(_) => ItemKindTag::CourseSeat,
            Self::CodeBundle(_) => ItemKindTag::CodeBundle,
            Self::Certificate(_) => ItemKindTag::Certificate,
            Self::Donation(_) => ItemKindTag::Donation,
        }
    }

    pub fn course_id(&self) -> Option<&str> {
        match self {
            Self::CourseSeat(seat) => Some(&seat.course_id),
            Self::CodeBundle(bundle) => Some(&bundle.course_id),
            Self::Certificate(cert) => Some(&cert.course_id),
            Self::Donation(donation) => donation.course_id.as_deref(),
        }
    }

    pub fn mode(&self) -> Option<&str> {
        match self {
            Self::CourseSeat(seat) => Some(&seat.mode),
            Self::CodeBundle(bundle) => Some(&bundle.mode),
            Self::Certificate(cert) => Some(&cert.mode),
            Self::Donation(_) => None,
        }
    }
}

/// Identity of an item across variants, used to key receipt instructions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub kind: ItemKindTag,
    pub id: i32,
}

/// Line item of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    /// Denormalized, always equal to the order's user
    pub user_id: i32,
    /// Denormalized, mirrors the order's status
    pub status: OrderStatus,
    pub qty: i32,
    pub unit_cost: Decimal,
    /// Pre-discount price; only set while a discount is active
    pub list_price: Option<Decimal>,
    pub line_desc: String,
    pub currency: String,
    pub fulfilled_time: Option<DateTime<Utc>>,
    pub refund_requested_time: Option<DateTime<Utc>>,
    pub service_fee: Decimal,
    /// Not user-visible; used for reporting
    pub report_comments: String,
    pub kind: ItemKind,
}

impl OrderItem {
    /// A fresh, unsaved item owned by `order_id`/`user_id`
    pub fn new(order_id: i32, user_id: i32, status: OrderStatus, kind: ItemKind) -> Self {
        Self {
            id: 0,
            order_id,
            user_id,
            status,
            qty: 1,
            unit_cost: Decimal::ZERO,
            list_price: None,
            line_desc: "Misc. Item".to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
            fulfilled_time: None,
            refund_requested_time: None,
            service_fee: Decimal::ZERO,
            report_comments: String::new(),
            kind,
        }
    }

    /// Total cost of this line
    pub fn line_cost(&self) -> Decimal {
        Decimal::from(self.qty) * self.unit_cost
    }

    pub fn tag(&self) -> ItemKindTag {
        self.kind.tag()
    }

    pub fn course_id(&self) -> Option<&str> {
        self.kind.course_id()
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            kind: self.tag(),
            id: self.id,
        }
    }

    pub fn has_discount(&self) -> bool {
        self.list_price.is_some()
    }

    /// Price rewrite that replaces the current unit cost with `discounted`
    pub fn discount(&self, discounted: Decimal) -> Discount {
        Discount {
            item_id: self.id,
            order_id: self.order_id,
            list_price: self.unit_cost,
            unit_cost: round_cents(discounted),
        }
    }

    /// Restore the pre-discount price. Returns `false` when nothing was discounted.
    pub fn reset_price(&mut self) -> bool {
        match self.list_price.take() {
            Some(list_price) => {
                self.unit_cost = list_price;
                true
            }
            None => false,
        }
    }
}

/// Discounted price for one cart line.
///
/// Stores are written as a compare-and-set: the line must still be an
/// undiscounted cart line priced at `list_price`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discount {
    pub item_id: i32,
    pub order_id: i32,
    pub list_price: Decimal,
    pub unit_cost: Decimal,
}

impl Discount {
    /// Write the discount onto the stored line, or explain why it no longer applies
    pub fn apply_to(&self, item: &mut OrderItem) -> DomainResult<()> {
        if item.id != self.item_id || item.order_id != self.order_id {
            return Err(DomainError::not_found("OrderItem", "id", self.item_id));
        }
        if item.status != OrderStatus::Cart {
            return Err(DomainError::not_in_cart("Order item", item.id));
        }
        if item.has_discount() {
            return Err(DomainError::ItemAlreadyDiscounted(item.id));
        }
        if item.unit_cost != self.list_price {
            return Err(DomainError::Conflict(format!("Order item {} was repriced", item.id)));
        }
        item.list_price = Some(self.list_price);
        item.unit_cost = self.unit_cost;
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(course: &str) -> OrderItem {
        OrderItem::new(
            1,
            42,
            OrderStatus::Cart,
            ItemKind::CourseSeat(CourseSeat {
                course_id: course.into(),
                mode: "honor".into(),
            }),
        )
    }

    #[test]
    fn line_cost_is_qty_times_unit_cost() {
        let mut item = seat("course-v1:MITx+6.002x+2024");
        item.qty = 3;
        item.unit_cost = Decimal::new(1050, 2);
        assert_eq!(item.line_cost(), Decimal::new(3150, 2));
    }

    #[test]
    fn discount_then_reset() {
        let mut item = seat("c");
        item.unit_cost = Decimal::new(3000, 2);
        item.discount(Decimal::ZERO).apply_to(&mut item).unwrap();
        assert_eq!(item.unit_cost, Decimal::ZERO);
        assert_eq!(item.list_price, Some(Decimal::new(3000, 2)));
        assert!(item.has_discount());

        assert!(item.reset_price());
        assert_eq!(item.unit_cost, Decimal::new(3000, 2));
        assert!(item.list_price.is_none());
        assert!(!item.reset_price());
    }

    #[test]
    fn second_discount_is_refused() {
        let mut item = seat("c");
        item.unit_cost = Decimal::new(10000, 2);
        let coupon = item.discount(Decimal::new(8000, 2));
        let code = item.discount(Decimal::ZERO);

        coupon.apply_to(&mut item).unwrap();
        assert!(matches!(code.apply_to(&mut item), Err(DomainError::ItemAlreadyDiscounted(_))));
        assert_eq!(item.unit_cost, Decimal::new(8000, 2));
        assert_eq!(item.list_price, Some(Decimal::new(10000, 2)));
    }

    #[test]
    fn discount_needs_a_cart_line_at_the_expected_price() {
        let mut item = seat("c");
        item.unit_cost = Decimal::new(10000, 2);
        let discount = item.discount(Decimal::new(33333, 3));
        assert_eq!(discount.unit_cost, Decimal::new(3333, 2));

        item.unit_cost = Decimal::new(9000, 2);
        assert!(matches!(discount.apply_to(&mut item), Err(DomainError::Conflict(_))));

        item.unit_cost = Decimal::new(10000, 2);
        item.status = OrderStatus::Paying;
        assert!(matches!(discount.apply_to(&mut item), Err(DomainError::Validation(_))));
        assert!(item.list_price.is_none());
    }

    #[test]
    fn general_donation_has_no_course() {
        let item = OrderItem::new(
            1,
            42,
            OrderStatus::Cart,
            ItemKind::Donation(Donation {
                donation_type: DonationType::General,
                course_id: None,
            }),
        );
        assert_eq!(item.tag(), ItemKindTag::Donation);
        assert!(item.course_id().is_none());
        assert!(item.kind.mode().is_none());
    }

    #[test]
    fn kind_tag_roundtrip() {
        for tag in [
            ItemKindTag::CourseSeat,
            ItemKindTag::CodeBundle,
            ItemKindTag::Certificate,
            ItemKindTag::Donation,
        ] {
            assert_eq!(ItemKindTag::from_str(tag.as_str()), Some(tag));
        }
        assert!(ItemKindTag::from_str("paidcourseregistration").is_none());
    }
}
