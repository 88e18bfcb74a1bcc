use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: Access denied")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Order creation failed: {0}")]
    OrderCreationFailed(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Upstream error: {0}")]
    BadGateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::Validation(_) | DomainError::InvalidStatus(_) => {
                AppError::BadRequest(e.to_string())
            }
            DomainError::Forbidden => AppError::Forbidden,
            DomainError::NotFound => AppError::NotFound,
            DomainError::ProductUnavailable { .. } => AppError::Unprocessable(e.to_string()),
            DomainError::PriceMismatch { .. }
            | DomainError::InsufficientStock { .. }
            | DomainError::InvalidTransition { .. } => AppError::Conflict(e.to_string()),
            DomainError::OrderCreationFailed(msg) => AppError::OrderCreationFailed(msg),
            DomainError::ResourceExhausted(msg) => AppError::ServiceUnavailable(msg),
            DomainError::PaymentFailed(msg) => AppError::BadGateway(msg),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl AppError {
    /// What the client sees. Infrastructure failures get a generic message;
    /// the detail is only logged.
    fn public_message(&self) -> String {
        match self {
            AppError::OrderCreationFailed(_) => "Failed to create order".to_string(),
            AppError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            AppError::BadGateway(_) => "Payment processor error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::OrderCreationFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        HttpResponse::build(status).json(serde_json::json!({
            "error": self.public_message()
        }))
    }
}

#[cfg(test)]
mod tests {
    use bigdecimal::BigDecimal;

    use super::*;
    use crate::domain::order::OrderStatus;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound.error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_returns_500() {
        let err = AppError::Internal("something went wrong".to_string());
        assert_eq!(
            err.error_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_details_stay_private() {
        let err = AppError::Internal("relation \"orders\" does not exist".to_string());
        assert_eq!(err.public_message(), "Internal server error");
        let err: AppError = DomainError::ResourceExhausted("timed out".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.public_message(), "Service temporarily unavailable");
    }

    #[test]
    fn business_rule_failures_explain_themselves() {
        let err: AppError = DomainError::PriceMismatch {
            expected: BigDecimal::from(200),
            asserted: BigDecimal::from(50),
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert!(err.public_message().contains("expected total 200"));

        let err: AppError = DomainError::InvalidTransition {
            from: OrderStatus::Completed,
            to: OrderStatus::Pending,
        }
        .into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.public_message(),
            "Cannot change order status from completed to pending"
        );
    }

    #[test]
    fn domain_not_found_maps_to_app_not_found() {
        let app_err: AppError = DomainError::NotFound.into();
        assert!(matches!(app_err, AppError::NotFound));
    }

    #[test]
    fn invalid_status_is_a_bad_request() {
        let app_err: AppError = DomainError::InvalidStatus("refunded".to_string()).into();
        assert_eq!(app_err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(app_err.public_message(), "Invalid status: refunded");
    }

    #[test]
    fn order_creation_failure_is_generic() {
        let app_err: AppError =
            DomainError::OrderCreationFailed("duplicate key".to_string()).into();
        assert_eq!(app_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app_err.public_message(), "Failed to create order");
    }
}
