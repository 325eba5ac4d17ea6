//! Domain ports (hexagonal architecture boundaries)
//!
//! Contracts for the collaborators the cart depends on but does not own:
//! the course catalog, enrollments, identity verification, mail delivery
//! and registration code issuance.

pub mod codes;
pub mod gateways;
pub mod notification;

pub use codes::CodeIssuer;
pub use gateways::{
    CatalogGateway, Course, CourseMode, Enrollment, EnrollmentGateway, VerificationAttempt,
    VerificationGateway, DEFAULT_MODE_NAME, DEFAULT_MODE_SLUG, VERIFIED_MODE_SLUG,
};
pub use notification::{
    Attachment, Notification, NotificationKind, NotificationPort, Recipient, RecipientKind,
};
