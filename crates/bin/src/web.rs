//! HTTP plumbing shared by the handlers: error responses and CORS.
//!
//! Every failure is rendered as `{"error": "<message>"}`; storage details are
//! logged and never sent to the client.

use axum::{
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use ticket_desk::{PersistenceError, PurchaseError};
use tower_http::cors::{Any, CorsLayer};

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Purchase(#[from] PurchaseError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Purchase(e) if e.is_client_fault() => StatusCode::BAD_REQUEST,
            ApiError::Purchase(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Persistence(PersistenceError::EventNotFound { .. }) => StatusCode::NOT_FOUND,
            ApiError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller
    fn public_message(&self) -> String {
        match self {
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Purchase(e) if e.is_client_fault() => e.to_string(),
            ApiError::Persistence(PersistenceError::EventNotFound { .. }) => {
                "Event not found".to_string()
            }
            ApiError::Purchase(_) | ApiError::Persistence(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// CORS policy: any origin may call the API
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Handler for bare OPTIONS requests that are not CORS pre-flights
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("bad".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PurchaseError::InsufficientInventory).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PurchaseError::NotFound).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(PersistenceError::EventNotFound { id: 3 }).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(PurchaseError::Storage(PersistenceError::Migration(
                "broken".to_string()
            )))
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_storage_details_are_hidden() {
        let err = ApiError::from(PersistenceError::Migration("disk on fire".to_string()));
        assert_eq!(err.public_message(), "Internal server error");
    }
}
