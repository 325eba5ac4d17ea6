//! Registration code aggregate
//!
//! Codes granting free enrollment, their single-use redemption ledger, and
//! the invoices that bulk codes can be issued against.

pub mod model;
pub mod repository;

pub use model::{CodeSource, CourseRegistrationCode, Invoice, RegistrationCodeRedemption};
pub use repository::{CodeRedemptionRepository, InvoiceRepository, RegistrationCodeRepository};
