use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::db::StoreError;
use crate::ErrorResponse;

/// The collection a request targets; picks the wording of client messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Image,
    Article,
}

impl ResourceKind {
    pub fn not_found_message(self) -> &'static str {
        match self {
            ResourceKind::Image => "Image not found",
            ResourceKind::Article => "Article not found",
        }
    }

    pub fn deleted_message(self) -> &'static str {
        match self {
            ResourceKind::Image => "Image deleted",
            ResourceKind::Article => "Article deleted",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(&'static str),
    #[error("Invalid media type: {0}")]
    InvalidMediaType(String),
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge { limit: usize },
    #[error("No image file was uploaded")]
    MissingFile,
    #[error("{} ({})", .0.not_found_message(), .1)]
    NotFound(ResourceKind, uuid::Uuid),
    #[error("{} (malformed id {:?})", .0.not_found_message(), .1)]
    InvalidIdentity(ResourceKind, String),
    #[error("Malformed reorder batch: `images` must be an array")]
    MalformedBatch,
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Multipart error: {0}")]
    Multipart(String),
    #[error("Storage failure: {0}")]
    StorageFailure(String),
}

/// Parses a path identity; anything that is not a UUID is `InvalidIdentity`.
pub fn parse_identity(kind: ResourceKind, raw: &str) -> Result<uuid::Uuid, ApiError> {
    uuid::Uuid::parse_str(raw).map_err(|_| ApiError::InvalidIdentity(kind, raw.to_string()))
}

impl ApiError {
    /// Maps a store outcome for a known identity onto the client taxonomy.
    pub fn from_store(kind: ResourceKind, err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => ApiError::NotFound(kind, id),
            StoreError::Backend(message) => ApiError::StorageFailure(message),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::Unauthenticated(_) => "Unauthenticated",
            ApiError::InvalidMediaType(_) => "InvalidMediaType",
            ApiError::PayloadTooLarge { .. } => "PayloadTooLarge",
            ApiError::MissingFile => "MissingFile",
            ApiError::NotFound(..) | ApiError::InvalidIdentity(..) => "NotFound",
            ApiError::MalformedBatch => "MalformedBatch",
            ApiError::Validation(_) | ApiError::Multipart(_) => "BadRequest",
            ApiError::StorageFailure(_) => "InternalServerError",
        }
    }

    fn client_message(&self) -> String {
        match self {
            ApiError::Unauthenticated(reason) => reason.to_string(),
            ApiError::InvalidMediaType(_) => {
                "Only image files are allowed (jpeg, jpg, png, gif, webp)".to_string()
            }
            ApiError::PayloadTooLarge { limit } => {
                format!("Image exceeds the maximum size of {} bytes", limit)
            }
            ApiError::MissingFile => "Please upload an image".to_string(),
            ApiError::NotFound(kind, _) | ApiError::InvalidIdentity(kind, _) => {
                kind.not_found_message().to_string()
            }
            ApiError::MalformedBatch => "Invalid data structure".to_string(),
            ApiError::Validation(message) | ApiError::Multipart(message) => message.clone(),
            ApiError::StorageFailure(_) => "Server error".to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidMediaType(_)
            | ApiError::MissingFile
            | ApiError::MalformedBatch
            | ApiError::Validation(_)
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(..) | ApiError::InvalidIdentity(..) => StatusCode::NOT_FOUND,
            ApiError::StorageFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            ApiError::StorageFailure(detail) => log::error!("Storage failure: {}", detail),
            ApiError::InvalidIdentity(_, raw) => log::warn!("Rejected malformed identity {:?}", raw),
            other => log::debug!("Request rejected: {}", other),
        }
        HttpResponse::build(self.status_code())
            .json(ErrorResponse::new(self.error_type(), &self.client_message()))
    }
}
