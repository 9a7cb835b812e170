mod error;
mod http;
mod model;

pub use error::{CardError, GatewayError};
pub use http::HttpPaymentGateway;
pub use model::*;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Trusted tokenization boundary. Card data goes in, only a [`PaymentMethodHandle`] comes out.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_method(
        &self,
        card: CardDetails,
        billing_name: &str,
        cancel: &CancellationToken,
    ) -> Result<PaymentMethodHandle, GatewayError>;
}
