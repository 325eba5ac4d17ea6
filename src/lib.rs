//! # Shopping cart service
//!
//! Orders, line items and fulfillment for a course platform: paid seats,
//! bulk registration code bundles, certificate upgrades and donations,
//! with coupons, single-use registration codes, invoices, refunds and
//! finance reporting.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Entities, status machine, repository traits and gateway ports
//! - **application**: Cart, checkout, discount, refund and reporting services
//! - **infrastructure**: SeaORM storage and the in-memory provider
//! - **notifications**: Broadcast bus carrying outbound shop notifications

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod notifications;
pub mod shared;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{default_config_path, AppConfig, ShopConfig};

// Re-export storage entry points
pub use infrastructure::{
    connect_repositories, init_database, run_migrations, DatabaseConfig, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};

pub use application::{
    CartService, CheckoutService, DiscountService, RefundService, RegistrationCodeService, ReportingService,
    ShopContext,
};

// Re-export notifications
pub use notifications::{create_event_bus, Event, EventBus, SharedEventBus};
