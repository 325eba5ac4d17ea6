use thiserror::Error;

/// Broad classification of [`DomainError`] used by callers that only need
/// to decide how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid cart mutation; the cart is left unchanged.
    Validation,
    /// A discount was already applied (or may not be combined).
    RedemptionConflict,
    /// A discount code matched nothing in the cart.
    RedemptionNotApplicable,
    /// A purchased item could not be delivered.
    Fulfillment,
    /// Notification side channel failed; never fatal.
    Delivery,
    NotFound,
    Storage,
}

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {entity} with {field}={value}")]
    NotFound {
        entity: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Course {0} does not exist")]
    CourseNotFound(String),

    #[error("Course {0} is already in the cart")]
    ItemAlreadyInCart(String),

    #[error("User {user_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled { user_id: i32, course_id: String },

    #[error("Trying to add a different currency into the cart (cart: {cart}, item: {item})")]
    CurrencyMismatch { cart: String, item: String },

    #[error("Mode {mode} does not exist for {course_id}")]
    InvalidMode { mode: String, course_id: String },

    #[error("Only one coupon redemption is allowed for order {0}")]
    MultipleCoupons(i32),

    #[error("Registration code {0} has already been redeemed")]
    CodeAlreadyRedeemed(String),

    #[error("Item {0} already carries a discount")]
    ItemAlreadyDiscounted(i32),

    #[error("No cart item matches registration code {0}")]
    NoItemForCode(String),

    #[error("Fulfillment failed for item {item_id}: {reason}")]
    Fulfillment { item_id: i32, reason: String },

    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Already exists: {0}")]
    Conflict(String),

    #[error("Storage: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_)
            | DomainError::CourseNotFound(_)
            | DomainError::ItemAlreadyInCart(_)
            | DomainError::AlreadyEnrolled { .. }
            | DomainError::CurrencyMismatch { .. }
            | DomainError::InvalidMode { .. } => ErrorKind::Validation,
            DomainError::MultipleCoupons(_)
            | DomainError::CodeAlreadyRedeemed(_)
            | DomainError::ItemAlreadyDiscounted(_) => ErrorKind::RedemptionConflict,
            DomainError::NoItemForCode(_) => ErrorKind::RedemptionNotApplicable,
            DomainError::Fulfillment { .. } => ErrorKind::Fulfillment,
            DomainError::Delivery(_) => ErrorKind::Delivery,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Conflict(_) | DomainError::Storage(_) => ErrorKind::Storage,
        }
    }

    pub(crate) fn not_found(entity: &'static str, field: &'static str, value: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            field,
            value: value.to_string(),
        }
    }

    /// A cart write reached a row whose order already left the cart state
    pub(crate) fn not_in_cart(entity: &str, id: i32) -> Self {
        DomainError::Validation(format!("{} {} is no longer in a cart", entity, id))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}
