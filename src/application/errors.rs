use crate::domain::shared::errors::DomainError;
use thiserror::Error;

/// Failures raised by use cases before or after they reach the domain.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Invalid input data: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed request body: {0}")]
    Body(#[from] serde_json::Error),

    #[error("Image processing failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Storage failure: {0}")]
    Storage(#[source] anyhow::Error),
}
