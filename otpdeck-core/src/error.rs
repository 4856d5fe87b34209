//! Top-level error types for otpdeck.

use thiserror::Error;

use crate::bridge::BridgeError;
use crate::model::ValidationError;
use crate::service::ServiceError;
use crate::surface::SurfaceError;

/// Top-level error type encompassing all otpdeck errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Error from a remote account-service call.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Error from the cross-surface import bridge.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// Error from surface lifecycle operations.
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// A draft failed validation before submission.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Generic internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}
