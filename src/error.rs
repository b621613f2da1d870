use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::{
    pricing::{PricingError, PromotionShapeError},
    response::{ApiResponse, Meta},
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    EmptyInput(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(format!("{} not found", what.into()))
    }

    /// Stable identifier clients can branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::EmptyInput(_) => "empty_input",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Forbidden => "forbidden",
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::EmptyInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<PromotionShapeError> for AppError {
    fn from(err: PromotionShapeError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<PricingError> for AppError {
    fn from(err: PricingError) -> Self {
        match err {
            PricingError::EmptyOrder => AppError::EmptyInput(err.to_string()),
            PricingError::ProductUnavailable(_) => AppError::NotFound(err.to_string()),
            PricingError::InvalidQuantity { .. } | PricingError::TotalTooLarge(_) => {
                AppError::Validation(err.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorData {
    pub kind: String,
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => tracing::debug!(kind = self.kind(), error = %self, "request rejected"),
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                kind: self.kind().to_string(),
                error: self.to_string(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn pricing_errors_keep_their_kind() {
        let empty: AppError = PricingError::EmptyOrder.into();
        assert_eq!(empty.kind(), "empty_input");
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let missing: AppError = PricingError::ProductUnavailable(Uuid::nil()).into();
        assert_eq!(missing.kind(), "not_found");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let huge: AppError = PricingError::TotalTooLarge(Decimal::from(10_i64.pow(13))).into();
        assert_eq!(huge.kind(), "validation_error");
        assert_eq!(huge.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn shape_errors_are_validation_errors() {
        let err: AppError = PromotionShapeError::MissingSlabs.into();
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(
            err.to_string(),
            "Validation failed: slabs are required for weighted promotions"
        );
    }

    #[test]
    fn conflicts_map_to_409() {
        let err = AppError::Conflict("Product already exists".into());
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "Product already exists");
    }
}
