//! Services composing the pipeline behind role checks.

use thiserror::Error;

use crate::domain::dashboard::DashboardType;
use crate::domain::role::AuthenticatedUser;
use crate::repository::errors::RepositoryError;

pub mod dashboard;
pub mod deals;
pub mod rate_limit;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Form error: {0}")]
    Form(String),

    #[error("Type constraint violated: {0}")]
    TypeConstraint(String),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Fails with [`ServiceError::Unauthorized`] unless the user's role may read
/// `dashboard`.
pub fn ensure_dashboard_access(
    user: &AuthenticatedUser,
    dashboard: DashboardType,
) -> ServiceResult<()> {
    if user.role.can_view(dashboard) {
        Ok(())
    } else {
        log::warn!(
            "User {} ({}) denied access to the {dashboard} dashboard",
            user.user_id,
            user.role
        );
        Err(ServiceError::Unauthorized)
    }
}
