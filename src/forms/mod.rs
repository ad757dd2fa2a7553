//! Form definitions for deal entry.

use thiserror::Error;
use validator::ValidationErrors;

pub mod deal;

#[derive(Debug, Error)]
/// Errors that can occur when processing form data.
pub enum FormError {
    #[error("validation errors: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("malformed form payload: {0}")]
    Malformed(String),
}
