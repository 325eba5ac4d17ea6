//! Database entities module

pub mod coupon;
pub mod coupon_redemption;
pub mod course_annotation;
pub mod invoice;
pub mod order;
pub mod order_item;
pub mod registration_code;
pub mod registration_code_redemption;

pub use coupon::Entity as Coupon;
pub use coupon_redemption::Entity as CouponRedemption;
pub use course_annotation::Entity as CourseAnnotation;
pub use invoice::Entity as Invoice;
pub use order::Entity as Order;
pub use order_item::Entity as OrderItem;
pub use registration_code::Entity as RegistrationCode;
pub use registration_code_redemption::Entity as RegistrationCodeRedemption;
