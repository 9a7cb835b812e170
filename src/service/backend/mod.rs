mod error;
mod http;
mod model;

pub use error::BackendError;
pub use http::HttpSubscriptionBackend;
pub use model::*;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::promo::{PromoCode, PromoValidation};

/// The REST backend that owns plans, promo codes, payment intents and subscriptions.
///
/// Every call takes a cancellation token. Implementations should stop work when it fires;
/// callers discard late results either way.
#[async_trait]
pub trait SubscriptionBackend: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
        cancel: &CancellationToken,
    ) -> Result<PaymentIntentResponse, BackendError>;

    /// An unknown or expired code is `Ok(PromoValidation::Invalid)`.
    async fn validate_promo_code(
        &self,
        code: &PromoCode,
        cancel: &CancellationToken,
    ) -> Result<PromoValidation, BackendError>;

    async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
        cancel: &CancellationToken,
    ) -> Result<SubscriptionResponse, BackendError>;
}
