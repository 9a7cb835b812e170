//! In-memory collaborators for checkout tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use rust_decimal_macros::dec;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::{CheckoutDeps, PaymentForm};
use crate::{
    config::CheckoutConfig,
    context::{AuthenticatedUser, StaticAuthContext},
    service::{
        backend::{
            BackendError, PaymentIntentRequest, PaymentIntentResponse, SubscriptionBackend, SubscriptionRequest,
            SubscriptionResponse,
        },
        catalog::{BillingPeriod, Order, PlanCatalog},
        gateway::{CardDetails, GatewayError, PaymentGateway, PaymentMethodHandle},
        promo::{Discount, PromoCode, PromoValidation},
    },
};

/// Holds a fake call in flight until the test releases it.
#[derive(Clone, Default)]
pub struct Gate {
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl Gate {
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }
}

async fn pass_gate(slot: &Mutex<Option<Gate>>) {
    let gate = slot.lock().unwrap().clone();
    if let Some(gate) = gate {
        gate.pass().await;
    }
}

pub struct FakeBackend {
    pub intent_calls: AtomicUsize,
    pub promo_calls: AtomicUsize,
    pub subscription_calls: AtomicUsize,
    pub intent_requests: Mutex<Vec<PaymentIntentRequest>>,
    pub subscription_requests: Mutex<Vec<SubscriptionRequest>>,
    promos: Mutex<HashMap<String, Discount>>,
    promo_error: Mutex<Option<BackendError>>,
    intent_results: Mutex<VecDeque<Result<PaymentIntentResponse, BackendError>>>,
    subscription_results: Mutex<VecDeque<Result<SubscriptionResponse, BackendError>>>,
    intent_gate: Mutex<Option<Gate>>,
    promo_gate: Mutex<Option<Gate>>,
    subscription_gate: Mutex<Option<Gate>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        let promos = HashMap::from([
            ("WELCOME20".to_string(), Discount::Percent(dec!(20))),
            ("FLAT5".to_string(), Discount::Amount(dec!(5))),
        ]);

        Self {
            intent_calls: AtomicUsize::new(0),
            promo_calls: AtomicUsize::new(0),
            subscription_calls: AtomicUsize::new(0),
            intent_requests: Mutex::new(Vec::new()),
            subscription_requests: Mutex::new(Vec::new()),
            promos: Mutex::new(promos),
            promo_error: Mutex::new(None),
            intent_results: Mutex::new(VecDeque::new()),
            subscription_results: Mutex::new(VecDeque::new()),
            intent_gate: Mutex::new(None),
            promo_gate: Mutex::new(None),
            subscription_gate: Mutex::new(None),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next_intent(&self, error: BackendError) {
        self.intent_results.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_next_subscription(&self, error: BackendError) {
        self.subscription_results.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_promos(&self, error: BackendError) {
        *self.promo_error.lock().unwrap() = Some(error);
    }

    pub fn gate_intents(&self) -> Gate {
        let gate = Gate::default();
        *self.intent_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_promos(&self) -> Gate {
        let gate = Gate::default();
        *self.promo_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_subscriptions(&self) -> Gate {
        let gate = Gate::default();
        *self.subscription_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn intents(&self) -> usize {
        self.intent_calls.load(Ordering::SeqCst)
    }

    pub fn subscriptions(&self) -> usize {
        self.subscription_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubscriptionBackend for FakeBackend {
    async fn create_payment_intent(
        &self,
        request: &PaymentIntentRequest,
        _cancel: &CancellationToken,
    ) -> Result<PaymentIntentResponse, BackendError> {
        let n = self.intent_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.intent_requests.lock().unwrap().push(request.clone());
        pass_gate(&self.intent_gate).await;

        let scripted = self.intent_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(PaymentIntentResponse {
                client_secret: format!("pi_{}_secret", n),
                resolved_plan_id: request.plan_id.clone(),
            })
        })
    }

    async fn validate_promo_code(
        &self,
        code: &PromoCode,
        _cancel: &CancellationToken,
    ) -> Result<PromoValidation, BackendError> {
        self.promo_calls.fetch_add(1, Ordering::SeqCst);
        pass_gate(&self.promo_gate).await;

        if let Some(error) = self.promo_error.lock().unwrap().clone() {
            return Err(error);
        }

        Ok(match self.promos.lock().unwrap().get(code.as_str()) {
            Some(discount) => PromoValidation::Valid(*discount),
            None => PromoValidation::Invalid,
        })
    }

    async fn create_subscription(
        &self,
        request: &SubscriptionRequest,
        _cancel: &CancellationToken,
    ) -> Result<SubscriptionResponse, BackendError> {
        let n = self.subscription_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.subscription_requests.lock().unwrap().push(request.clone());
        pass_gate(&self.subscription_gate).await;

        let scripted = self.subscription_results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(SubscriptionResponse {
                subscription_id: format!("sub_{}", n),
            })
        })
    }
}

#[derive(Default)]
pub struct FakeGateway {
    pub calls: AtomicUsize,
    pub billing_names: Mutex<Vec<String>>,
    results: Mutex<VecDeque<Result<PaymentMethodHandle, GatewayError>>>,
    gate: Mutex<Option<Gate>>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_next(&self, error: GatewayError) {
        self.results.lock().unwrap().push_back(Err(error));
    }

    pub fn gate(&self) -> Gate {
        let gate = Gate::default();
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn tokenizations(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_method(
        &self,
        _card: CardDetails,
        billing_name: &str,
        _cancel: &CancellationToken,
    ) -> Result<PaymentMethodHandle, GatewayError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.billing_names.lock().unwrap().push(billing_name.to_string());
        pass_gate(&self.gate).await;

        let scripted = self.results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(PaymentMethodHandle::new(format!("pm_{}", n))))
    }
}

pub fn signed_in_deps(backend: &Arc<FakeBackend>, gateway: &Arc<FakeGateway>) -> CheckoutDeps {
    CheckoutDeps {
        backend: backend.clone(),
        gateway: gateway.clone(),
        auth: Arc::new(StaticAuthContext::signed_in(AuthenticatedUser::new("user_1", "ada@voxshift.io"))),
    }
}

pub fn anonymous_deps(backend: &Arc<FakeBackend>, gateway: &Arc<FakeGateway>) -> CheckoutDeps {
    CheckoutDeps {
        backend: backend.clone(),
        gateway: gateway.clone(),
        auth: Arc::new(StaticAuthContext::anonymous()),
    }
}

pub fn pro_yearly() -> Order {
    PlanCatalog::standard().order("pro", BillingPeriod::Yearly).unwrap()
}

pub fn test_config() -> CheckoutConfig {
    CheckoutConfig {
        test_mode: true,
        ..CheckoutConfig::default()
    }
}

pub fn card_form() -> PaymentForm {
    PaymentForm::card("Ada Lovelace", CardDetails::new("4242 4242 4242 4242", "12/40", "123"))
}

pub fn incomplete_card_form() -> PaymentForm {
    PaymentForm::card("", CardDetails::new("4242", "", ""))
}
