use serde::{Deserialize, Serialize};

use crate::service::{gateway::PaymentMethodHandle, promo::PromoCode};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentIntentRequest {
    pub plan_id: String,
    pub customer_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<PromoCode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntentResponse {
    pub client_secret: String,
    pub resolved_plan_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionRequest {
    pub plan_id: String,
    pub customer_id: String,
    #[serde(rename = "payment_method_id")]
    pub payment_method: PaymentMethodHandle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<PromoCode>,
    /// Sent as the `Idempotency-Key` header, not in the body.
    #[serde(skip)]
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SubscriptionResponse {
    pub subscription_id: String,
}
