use crate::error::ApiError;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

/// Error types for questionnaire, question and answer operations
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("{resource} with id {id} not found")]
    NotFound { resource: &'static str, id: Uuid },

    /// The resource exists but belongs to someone else
    #[error("{resource} with id {id} is owned by another user")]
    Forbidden { resource: &'static str, id: Uuid },

    #[error("'{0}' is not a valid id")]
    InvalidId(String),

    #[error("Request validation failed")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ResourceError> for ApiError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::NotFound { resource, id } => ApiError::NotFound {
                resource: resource.to_string(),
                id: id.to_string(),
            },
            // Outwardly identical to a missing resource
            ResourceError::Forbidden { resource, id } => {
                tracing::warn!("Ownership check failed on {} {}", resource, id);
                ApiError::NotFound {
                    resource: resource.to_string(),
                    id: id.to_string(),
                }
            }
            ResourceError::InvalidId(_) => ApiError::BadRequest(err.to_string()),
            ResourceError::Validation(errors) => ApiError::ValidationError(errors),
            ResourceError::Database(e) => ApiError::DatabaseError(e),
        }
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
