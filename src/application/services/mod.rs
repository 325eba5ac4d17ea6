//! Application services

mod cart;
mod checkout;
mod discounts;
mod refunds;
mod registration_codes;
mod reporting;

pub use cart::{CartService, ReceiptInstructions};
pub use checkout::CheckoutService;
pub use discounts::DiscountService;
pub use refunds::RefundService;
pub use registration_codes::{random_code, RegistrationCodeService, CODE_ALPHABET, MAX_CODE_LENGTH};
pub use reporting::ReportingService;
