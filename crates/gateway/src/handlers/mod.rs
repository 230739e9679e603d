//! API handlers module

pub mod agent;
pub mod format;
pub mod health;
pub mod multi_hop;
pub mod search;

use bouwrag_common::errors::{AppError, Result};
use validator::Validate;

/// Run `validator` rules and map failures to a 400
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: e.field_errors().keys().next().map(|field| field.to_string()),
    })
}
