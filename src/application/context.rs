//! Shared wiring for application services

use std::sync::Arc;

use crate::config::ShopConfig;
use crate::domain::ports::{
    CatalogGateway, CodeIssuer, EnrollmentGateway, NotificationPort, VerificationGateway,
};
use crate::domain::RepositoryProvider;

/// Everything a cart operation may reach: storage, the external gateways
/// and the site-wide shop switches.
///
/// Cheap to clone; every service holds its own copy.
#[derive(Clone)]
pub struct ShopContext {
    pub repos: Arc<dyn RepositoryProvider>,
    pub catalog: Arc<dyn CatalogGateway>,
    pub enrollments: Arc<dyn EnrollmentGateway>,
    pub verifications: Arc<dyn VerificationGateway>,
    pub notifier: Arc<dyn NotificationPort>,
    pub codes: Arc<dyn CodeIssuer>,
    pub shop: ShopConfig,
}
