//! Read-only reporting queries
//!
//! Implementations may serve these from a read replica; slight staleness is
//! acceptable here and nowhere else.

pub mod repository;

pub use repository::{MonetaryField, ReportingRepository};
