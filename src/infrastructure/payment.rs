use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::ports::{PaymentGateway, PaymentIntent};

/// Stands in for the payment processor: issues a client secret without
/// charging anything.
#[derive(Debug, Clone, Default)]
pub struct SandboxPaymentGateway;

impl PaymentGateway for SandboxPaymentGateway {
    fn create_payment_intent(
        &self,
        amount_minor_units: i64,
        currency: &str,
    ) -> Result<PaymentIntent, DomainError> {
        if amount_minor_units <= 0 {
            return Err(DomainError::Validation(
                "payment amount must be positive".to_string(),
            ));
        }
        let intent_id = Uuid::new_v4().simple();
        log::info!(
            "Sandbox payment intent pi_{} for {} {}",
            intent_id,
            amount_minor_units,
            currency
        );
        Ok(PaymentIntent {
            client_secret: format!("pi_{}_secret_{}", intent_id, Uuid::new_v4().simple()),
            amount_minor_units,
            currency: currency.to_string(),
        })
    }
}
