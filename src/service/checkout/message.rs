use std::sync::LazyLock;

use regex::Regex;

use super::{CheckoutError, FailureKind, PaymentFailure};
use crate::service::{
    backend::BackendError,
    gateway::{CardError, GatewayError},
};

static TEST_MODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)test\s*mode|test card|live mode|non-test card|testing").unwrap());

static MISCONFIGURATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)invalid (time|date)|time value|misconfigur|no such price").unwrap());

fn failure(kind: FailureKind, message: impl Into<String>) -> PaymentFailure {
    PaymentFailure {
        kind,
        message: message.into(),
        hint: None,
    }
}

/// Maps a tokenization failure to what the user sees. In test mode, declines and
/// test-card mistakes carry a hint listing the test card numbers.
pub fn describe_gateway_error(error: &GatewayError, test_mode: bool) -> PaymentFailure {
    let mut described = match error {
        GatewayError::Card(card) => match card {
            CardError::Declined { .. } => failure(FailureKind::CardDeclined, t!("checkout.payment.card_declined")),
            CardError::AuthenticationRequired => failure(
                FailureKind::AuthenticationRequired,
                t!("checkout.payment.authentication_required"),
            ),
            CardError::InvalidNumber => failure(FailureKind::InvalidCard, t!("checkout.payment.invalid_card")),
            CardError::Expired => failure(FailureKind::InvalidCard, t!("checkout.payment.expired_card")),
            CardError::Incomplete => failure(FailureKind::InvalidCard, t!("checkout.payment.incomplete_card")),
            CardError::InvalidCvc => failure(FailureKind::InvalidCard, t!("checkout.payment.invalid_cvc")),
            CardError::Processing(_) => failure(FailureKind::Unknown, t!("checkout.payment.processing")),
        },
        GatewayError::Network(_) => failure(FailureKind::Network, t!("checkout.payment.network")),
        GatewayError::Other(_) | GatewayError::Cancelled => failure(FailureKind::Unknown, t!("checkout.payment.generic")),
    };

    if test_mode && matches_test_mode_pattern(error) {
        described.hint = Some(test_mode_hint());
    }

    described
}

pub fn test_mode_hint() -> String {
    t!("checkout.hints.test_cards").to_string()
}

fn matches_test_mode_pattern(error: &GatewayError) -> bool {
    match error {
        GatewayError::Card(CardError::Declined { .. }) | GatewayError::Card(CardError::InvalidNumber) => true,
        GatewayError::Card(CardError::Processing(message)) | GatewayError::Other(message) => {
            TEST_MODE_REGEX.is_match(message)
        }
        _ => false,
    }
}

/// Maps a subscription-creation or promo-lookup failure to what the user sees.
pub fn describe_backend_error(error: &BackendError) -> PaymentFailure {
    match error {
        BackendError::CardDeclined(_) => failure(FailureKind::BackendDeclined, t!("checkout.payment.backend_declined")),
        BackendError::Constraint(_) => failure(FailureKind::Constraint, t!("checkout.payment.constraint")),
        BackendError::InvalidPlan(_) => failure(FailureKind::Misconfiguration, t!("checkout.payment.misconfiguration")),
        BackendError::Validation(message) | BackendError::Server(message) if MISCONFIGURATION_REGEX.is_match(message) => {
            failure(FailureKind::Misconfiguration, t!("checkout.payment.misconfiguration"))
        }
        BackendError::Network(_) => failure(FailureKind::Network, t!("checkout.payment.network")),
        BackendError::Validation(_) | BackendError::Server(_) | BackendError::Cancelled => {
            failure(FailureKind::Unknown, t!("checkout.payment.generic"))
        }
    }
}

pub fn describe_external_rejection(reason: &str) -> PaymentFailure {
    failure(
        FailureKind::ExternalRejected,
        t!("checkout.payment.external_rejected", reason = reason),
    )
}

pub fn describe_checkout_error(error: &CheckoutError) -> String {
    match error {
        CheckoutError::Unauthenticated => t!("checkout.errors.unauthenticated").to_string(),
        CheckoutError::Catalog(_) => t!("checkout.errors.plan_unavailable").to_string(),
        CheckoutError::Field(field) => field.message.clone(),
        CheckoutError::IntentNotReady => t!("checkout.errors.intent_not_ready").to_string(),
        CheckoutError::IntentUnavailable(_) => t!("checkout.errors.intent_unavailable").to_string(),
        CheckoutError::InFlight(_) => t!("checkout.errors.in_flight").to_string(),
        CheckoutError::InvalidState { .. } => t!("checkout.errors.invalid_state").to_string(),
        CheckoutError::PromoRejected(message) => message.clone(),
        CheckoutError::Payment(failure) => failure.to_string(),
        CheckoutError::Closed => t!("checkout.errors.closed").to_string(),
    }
}
