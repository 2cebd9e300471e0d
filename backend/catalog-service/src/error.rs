/// Error types for Catalog Service
///
/// Core errors (`HierarchyError`, `RankingError`) are folded into `AppError`,
/// which maps onto HTTP responses.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::services::hierarchy::HierarchyError;
use crate::services::ranking::RankingError;

/// Result type for catalog-service operations
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    #[error("Database error: {0}")]
    Database(String),

}

impl AppError {
    /// Label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::DataIntegrity(_) => "data_integrity",
            AppError::Database(_) => "database",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DataIntegrity(_) | AppError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        // Server-side details stay in the logs
        let error_msg = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        HttpResponse::build(status).json(serde_json::json!({
            "error": error_msg,
            "status": status.as_u16(),
        }))
    }
}

impl From<HierarchyError> for AppError {
    fn from(err: HierarchyError) -> Self {
        match err {
            HierarchyError::NotFound(id) => AppError::NotFound(format!("Category {}", id)),
            other => AppError::DataIntegrity(other.to_string()),
        }
    }
}

impl From<RankingError> for AppError {
    fn from(err: RankingError) -> Self {
        AppError::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::DataIntegrity("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_hierarchy_error_conversion() {
        let err: AppError = HierarchyError::NotFound("42".into()).into();
        assert!(matches!(err, AppError::NotFound(_)));

        let err: AppError = HierarchyError::DanglingParent {
            category_id: "a".into(),
            parent_id: "b".into(),
        }
        .into();
        assert_eq!(err.kind(), "data_integrity");
    }

    #[test]
    fn test_limit_error_is_validation() {
        let err: AppError = RankingError::InvalidLimit { limit: 0, max: 100 }.into();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("between 1 and 100"));
    }
}
