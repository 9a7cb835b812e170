use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::{
    BackendError, PaymentIntentRequest, PaymentIntentResponse, SubscriptionBackend, SubscriptionRequest,
    SubscriptionResponse,
};
use crate::{
    config::BackendConfig,
    runtime::run_cancellable_result,
    service::promo::{Discount, PromoCode, PromoValidation},
    utils::http::{create_api_client, HttpClientError},
};

const INTENTS_PATH: &str = "payments/intents";
const PROMO_VALIDATE_PATH: &str = "promo-codes/validate";
const SUBSCRIPTIONS_PATH: &str = "subscriptions";

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct PromoValidationRequest<'a> {
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct PromoValidationResponse {
    valid: bool,
    discount_percent: Option<Decimal>,
    discount_amount: Option<Decimal>,
}

pub struct HttpSubscriptionBackend {
    client: Client,
    base_url: Url,
}

impl HttpSubscriptionBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, HttpClientError> {
        let client = create_api_client(&config.api_key, config.timeout_secs)?;
        Ok(Self::with_client(client, config.base_url.clone()))
    }

    pub fn with_client(client: Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        self.base_url
            .join(path)
            .map_err(|e| BackendError::Server(format!("invalid endpoint {}: {}", path, e)))
    }

    async fn post_json<B, R>(&self, path: &str, body: &B, idempotency_key: Option<&str>) -> Result<R, BackendError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        debug!("POST {}", url);

        let mut request = self.client.post(url).json(body);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Backend responded {} on {}: {}", status, path, body);
            return Err(map_error_response(status, &body));
        }

        Ok(response.json::<R>().await?)
    }
}

/// Maps a non-success response to a [`BackendError`], preferring the backend's error code over the status.
pub(crate) fn map_error_response(status: StatusCode, body: &str) -> BackendError {
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, None),
    };

    let message = message
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    match code.as_deref() {
        Some("invalid_plan") | Some("plan_not_found") => return BackendError::InvalidPlan(message),
        Some("card_declined") => return BackendError::CardDeclined(message),
        Some("constraint_violation") | Some("foreign_key_violation") => return BackendError::Constraint(message),
        Some("validation_error") => return BackendError::Validation(message),
        _ => {}
    }

    match status {
        StatusCode::PAYMENT_REQUIRED => BackendError::CardDeclined(message),
        StatusCode::CONFLICT => BackendError::Constraint(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => BackendError::Validation(message),
        _ => BackendError::Server(format!("{}: {}", status.as_u16(), message)),
    }
}

#[async_trait]
impl SubscriptionBackend for HttpSubscriptionBackend {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
        cancel: &CancellationToken,
    ) -> Result<PaymentIntentResponse, BackendError> {
        run_cancellable_result(cancel, async {
            match self
                .post_json::<_, PaymentIntentResponse>(INTENTS_PATH, request, None)
                .await
            {
                // Intents are keyed by plan, so a 404 or validation failure means the plan does not exist.
                Err(BackendError::Validation(message)) => Err(BackendError::InvalidPlan(message)),
                Err(BackendError::Server(message)) if message.starts_with("404") => {
                    Err(BackendError::InvalidPlan(request.plan_id.clone()))
                }
                other => other,
            }
        })
        .await
    }

    async fn validate_promo_code(
        &self,
        code: &PromoCode,
        cancel: &CancellationToken,
    ) -> Result<PromoValidation, BackendError> {
        run_cancellable_result(cancel, async {
            let body = PromoValidationRequest { code: code.as_str() };
            let response: PromoValidationResponse = match self.post_json(PROMO_VALIDATE_PATH, &body, None).await {
                Ok(response) => response,
                Err(BackendError::Server(message)) if message.starts_with("404") => {
                    return Ok(PromoValidation::Invalid);
                }
                Err(BackendError::Validation(_)) => return Ok(PromoValidation::Invalid),
                Err(e) => return Err(e),
            };

            if !response.valid {
                return Ok(PromoValidation::Invalid);
            }

            match Discount::from_parts(response.discount_percent, response.discount_amount) {
                Ok(discount) => Ok(PromoValidation::Valid(discount)),
                Err(e) => {
                    warn!("Promo code {} reported valid with unusable discount: {}", code, e);
                    Ok(PromoValidation::Invalid)
                }
            }
        })
        .await
    }

    async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
        cancel: &CancellationToken,
    ) -> Result<SubscriptionResponse, BackendError> {
        run_cancellable_result(cancel, async {
            self.post_json::<_, SubscriptionResponse>(SUBSCRIPTIONS_PATH, request, Some(&request.idempotency_key))
                .await
        })
        .await
    }
}
