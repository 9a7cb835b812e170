use super::{message, CheckoutStatus, FieldError, Operation, PaymentFailure};
use crate::service::{backend::BackendError, catalog::CatalogError};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CheckoutError {
    #[error("Checkout requires an authenticated user")]
    Unauthenticated,

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Invalid {}: {}", .0.field, .0.message)]
    Field(FieldError),

    #[error("Payment intent is not ready")]
    IntentNotReady,

    #[error("Payment intent unavailable: {0}")]
    IntentUnavailable(BackendError),

    #[error("A {0} is already in flight")]
    InFlight(Operation),

    #[error("Cannot {action} while the session is {status}")]
    InvalidState {
        action: &'static str,
        status: CheckoutStatus,
    },

    #[error("Promo code rejected: {0}")]
    PromoRejected(String),

    #[error("Payment failed: {0}")]
    Payment(PaymentFailure),

    #[error("Checkout session closed")]
    Closed,
}

impl CheckoutError {
    /// The text shown to the user for this error.
    pub fn user_message(&self) -> String {
        message::describe_checkout_error(self)
    }
}
