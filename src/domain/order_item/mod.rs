//! OrderItem aggregate
//!
//! Line items of an order and the per-course reporting annotations.

pub mod model;
pub mod repository;

pub use model::{
    Certificate, CodeBundle, CourseSeat, Discount, Donation, DonationType, ItemKind, ItemKindTag, ItemRef,
    OrderItem,
};
pub use repository::{CourseAnnotationRepository, OrderItemRepository};
