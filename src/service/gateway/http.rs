use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{CardDetails, CardError, GatewayError, PaymentGateway, PaymentMethodHandle};
use crate::{
    config::GatewayConfig,
    runtime::run_cancellable_result,
    utils::{
        http::{create_api_client, HttpClientError},
        parse_card_expiry,
    },
};

const PAYMENT_METHODS_PATH: &str = "v1/payment_methods";

#[derive(Debug, Deserialize)]
struct PaymentMethodResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    decline_code: Option<String>,
    message: Option<String>,
}

/// Tokenizes cards against a Stripe-compatible `payment_methods` endpoint using the publishable key.
pub struct HttpPaymentGateway {
    client: Client,
    base_url: Url,
}

impl HttpPaymentGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, HttpClientError> {
        let client = create_api_client(&config.publishable_key, config.timeout_secs)?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    async fn tokenize(&self, card: &CardDetails, billing_name: &str) -> Result<PaymentMethodHandle, GatewayError> {
        let (exp_month, exp_year) = parse_card_expiry(card.expiry()).ok_or(CardError::Incomplete)?;

        let url = self
            .base_url
            .join(PAYMENT_METHODS_PATH)
            .map_err(|e| GatewayError::Other(e.to_string()))?;

        let exp_month = exp_month.to_string();
        let exp_year = exp_year.to_string();
        let form = [
            ("type", "card"),
            ("card[number]", card.number()),
            ("card[exp_month]", exp_month.as_str()),
            ("card[exp_year]", exp_year.as_str()),
            ("card[cvc]", card.cvc()),
            ("billing_details[name]", billing_name),
        ];

        debug!("Tokenizing card {:?}", card);
        let response = self.client.post(url).form(&form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_response(status, &body));
        }

        let payment_method: PaymentMethodResponse = response.json().await?;
        Ok(PaymentMethodHandle::new(payment_method.id))
    }
}

pub(crate) fn map_error_response(status: StatusCode, body: &str) -> GatewayError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        return if status.is_server_error() {
            GatewayError::Network(format!("gateway unavailable ({})", status.as_u16()))
        } else {
            GatewayError::Other(format!("{}: {}", status.as_u16(), body.trim()))
        };
    };

    let error = envelope.error;
    let card_error = match error.code.as_deref() {
        Some("invalid_number") | Some("incorrect_number") => CardError::InvalidNumber,
        Some("expired_card") | Some("invalid_expiry_month") | Some("invalid_expiry_year") => CardError::Expired,
        Some("incomplete_number") | Some("incomplete_expiry") | Some("incomplete_cvc") | Some("incomplete") => {
            CardError::Incomplete
        }
        Some("invalid_cvc") | Some("incorrect_cvc") => CardError::InvalidCvc,
        Some("card_declined") => CardError::Declined {
            decline_code: error.decline_code,
        },
        Some("authentication_required") => CardError::AuthenticationRequired,
        _ if error.kind.as_deref() == Some("card_error") => {
            CardError::Processing(error.message.unwrap_or_else(|| "unknown card error".to_string()))
        }
        _ => {
            let message = error.message.unwrap_or_else(|| status.to_string());
            return GatewayError::Other(message);
        }
    };

    GatewayError::Card(card_error)
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn create_payment_method(
        &self,
        card: CardDetails,
        billing_name: &str,
        cancel: &CancellationToken,
    ) -> Result<PaymentMethodHandle, GatewayError> {
        run_cancellable_result(cancel, self.tokenize(&card, billing_name)).await
    }
}
