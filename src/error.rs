// Error types module

use thiserror::Error;

/// Terminal failures of a transformation request
///
/// Each variant maps to exactly one HTTP status; none are retried here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Shared-secret header missing or wrong
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Unsupported HTTP method: {0}")]
    BadMethod(String),

    /// Multi-bucket request without a `toBucket`
    #[error("No destination store configured for this request")]
    MissingDestinationStore,

    #[error("Error downloading original image: {0}")]
    OriginFetchFailed(String),

    #[error("Error transforming image: {0}")]
    TransformFailed(String),

    #[error("Requested transformed image is too big: max allowed size is {max} bytes, actual size is {actual} bytes")]
    OutputTooLarge { max: usize, actual: usize },

    #[error("Could not upload transformed image to {bucket}/{key}: {message}")]
    PersistFailed {
        bucket: String,
        key: String,
        message: String,
    },
}

impl ServiceError {
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::Unauthorized => 403,
            ServiceError::BadMethod(_) => 400,
            ServiceError::OutputTooLarge { .. } => 413,
            ServiceError::MissingDestinationStore
            | ServiceError::OriginFetchFailed(_)
            | ServiceError::TransformFailed(_)
            | ServiceError::PersistFailed { .. } => 500,
        }
    }

    /// Label used for the error counter
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized => "unauthorized",
            ServiceError::BadMethod(_) => "bad_method",
            ServiceError::MissingDestinationStore => "missing_destination_store",
            ServiceError::OriginFetchFailed(_) => "origin_fetch_failed",
            ServiceError::TransformFailed(_) => "transform_failed",
            ServiceError::OutputTooLarge { .. } => "output_too_large",
            ServiceError::PersistFailed { .. } => "persist_failed",
        }
    }
}
