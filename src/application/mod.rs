pub mod context;
pub mod items;
pub mod services;

// Re-export key types for convenience
pub use context::ShopContext;
pub use items::{Fulfillment, PriceRequest};
pub use services::{
    CartService, CheckoutService, DiscountService, ReceiptInstructions, RefundService,
    RegistrationCodeService, ReportingService,
};
