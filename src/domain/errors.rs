use bigdecimal::BigDecimal;
use thiserror::Error;

use super::order::OrderStatus;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Product {product_id} is unavailable")]
    ProductUnavailable { product_id: i32 },

    #[error("Price mismatch: expected total {expected}, got {asserted}")]
    PriceMismatch {
        expected: BigDecimal,
        asserted: BigDecimal,
    },

    #[error("Insufficient stock for product {product_id}: requested {requested}")]
    InsufficientStock { product_id: i32, requested: i32 },

    #[error("Cannot change order status from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Order not found")]
    NotFound,

    #[error("Access denied")]
    Forbidden,

    #[error("Order creation failed: {0}")]
    OrderCreationFailed(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Payment processor error: {0}")]
    PaymentFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    /// Business-rule failures carry details meant for the caller; everything
    /// else is an infrastructure failure whose details stay server-side.
    pub fn is_business_rule(&self) -> bool {
        !matches!(
            self,
            DomainError::OrderCreationFailed(_)
                | DomainError::ResourceExhausted(_)
                | DomainError::PaymentFailed(_)
                | DomainError::Internal(_)
        )
    }
}
