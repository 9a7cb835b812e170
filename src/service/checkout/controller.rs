use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{
    message::{describe_backend_error, describe_external_rejection, describe_gateway_error},
    reference::{idempotency_key, payment_reference, support_reference},
    validation::{promo_field_error, validate_form},
    CheckoutError, CheckoutSession, CheckoutStatus, ExternalOutcome, FailureSource, IntentTicket, OrderSummary,
    PaymentForm, PaymentInstructions, SubmissionOutcome, SubmissionTicket, SupportReference,
};
use crate::{
    config::CheckoutConfig,
    context::AuthContext,
    runtime::run_cancellable_result,
    service::{
        backend::{BackendError, PaymentIntentRequest, SubscriptionBackend, SubscriptionRequest},
        catalog::Order,
        gateway::{CardDetails, GatewayError, PaymentGateway},
        promo::{AppliedPromo, PromoCode, PromoValidation},
    },
    utils::format_money,
};

/// Collaborators a checkout controller is wired with.
#[derive(Clone)]
pub struct CheckoutDeps {
    pub backend: Arc<dyn SubscriptionBackend>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub auth: Arc<dyn AuthContext>,
}

/// Drives one [`CheckoutSession`] against the backend and the gateway.
///
/// The session lock is never held across a collaborator call. Each call runs under a
/// child of the teardown token, and once [`CheckoutController::close`] fires no result
/// is applied to the session.
pub struct CheckoutController {
    id: Uuid,
    session: Mutex<CheckoutSession>,
    backend: Arc<dyn SubscriptionBackend>,
    gateway: Arc<dyn PaymentGateway>,
    config: CheckoutConfig,
    teardown: CancellationToken,
}

impl CheckoutController {
    /// Creates the session for the signed-in user without contacting the backend.
    pub async fn new(order: Order, deps: &CheckoutDeps, config: CheckoutConfig) -> Result<Arc<Self>, CheckoutError> {
        let user = deps.auth.current_user().await.ok_or_else(|| {
            warn!("Refusing checkout for {}: no authenticated user", order.plan_id);
            CheckoutError::Unauthenticated
        })?;

        let id = Uuid::new_v4();
        info!(
            "Opening checkout session {} for user {} ({}, {})",
            id, user.user_id, order.plan_id, order.unit_price
        );

        Ok(Arc::new(Self {
            id,
            session: Mutex::new(CheckoutSession::new(id, user.user_id, order, Utc::now())),
            backend: Arc::clone(&deps.backend),
            gateway: Arc::clone(&deps.gateway),
            config,
            teardown: CancellationToken::new(),
        }))
    }

    /// Creates the session and immediately requests its payment intent. An intent
    /// failure leaves the session open; submission stays blocked until
    /// [`CheckoutController::refresh_intent`] succeeds.
    pub async fn open(order: Order, deps: &CheckoutDeps, config: CheckoutConfig) -> Result<Arc<Self>, CheckoutError> {
        let controller = Self::new(order, deps, config).await?;

        if let Err(e) = controller.acquire_intent().await {
            warn!("Checkout session {} opened without a payment intent: {}", controller.id, e);
        }

        Ok(controller)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.teardown.is_cancelled()
    }

    /// Tears the session down. In-flight calls are cancelled and late results dropped.
    pub fn close(&self) {
        if !self.teardown.is_cancelled() {
            info!("Closing checkout session {}", self.id);
            self.teardown.cancel();
        }
    }

    async fn lock(&self) -> Result<MutexGuard<'_, CheckoutSession>, CheckoutError> {
        if self.teardown.is_cancelled() {
            return Err(CheckoutError::Closed);
        }
        let guard = self.session.lock().await;
        if self.teardown.is_cancelled() {
            return Err(CheckoutError::Closed);
        }
        Ok(guard)
    }

    /// Copy of the current session state. Readable after close.
    pub async fn snapshot(&self) -> CheckoutSession {
        self.session.lock().await.clone()
    }

    pub async fn status(&self) -> CheckoutStatus {
        self.session.lock().await.status()
    }

    pub async fn summary(&self) -> Result<OrderSummary, CheckoutError> {
        let session = self.lock().await?;
        Ok(session.summary(self.config.tax_rate, &self.config.currency, Utc::now()))
    }

    /// Requests a payment intent for the current pricing unless a usable one is ready
    /// or a request is already on its way.
    pub async fn acquire_intent(&self) -> Result<(), CheckoutError> {
        let ticket = {
            let mut session = self.lock().await?;
            match session.begin_intent_request(self.config.tax_rate, Utc::now())? {
                Some(ticket) => ticket,
                None => {
                    debug!("Session {}: payment intent already ready or in flight", self.id);
                    return Ok(());
                }
            }
        };

        self.request_intent(ticket).await
    }

    /// Replaces an unavailable or expired intent.
    pub async fn refresh_intent(&self) -> Result<(), CheckoutError> {
        self.acquire_intent().await
    }

    async fn request_intent(&self, ticket: IntentTicket) -> Result<(), CheckoutError> {
        debug!(
            "Session {}: requesting payment intent (pricing version {}, amount {})",
            self.id, ticket.pricing_version, ticket.amount
        );

        let request = PaymentIntentRequest {
            plan_id: ticket.plan_id.clone(),
            customer_id: ticket.customer_id.clone(),
            promo_code: ticket.promo_code.clone(),
        };
        let cancel = self.teardown.child_token();
        let result = run_cancellable_result(&cancel, self.backend.create_payment_intent(&request, &cancel)).await;

        let mut session = self.lock().await?;
        match result {
            Ok(response) => {
                if session.intent_acquired(&ticket, response, Utc::now(), self.config.intent_ttl()) {
                    info!("Session {}: payment intent ready", self.id);
                } else {
                    debug!(
                        "Session {}: discarding stale payment intent for pricing version {}",
                        self.id, ticket.pricing_version
                    );
                }
                Ok(())
            }
            Err(BackendError::Cancelled) => Err(CheckoutError::Closed),
            Err(e) => {
                warn!("Session {}: payment intent request failed: {}", self.id, e);
                if session.intent_failed(&ticket, e.to_string()) {
                    Err(CheckoutError::IntentUnavailable(e))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Validates `raw` with the backend and attaches it, replacing any previous promo.
    /// Pricing stays untouched when the code is rejected.
    pub async fn apply_promo(&self, raw: &str) -> Result<OrderSummary, CheckoutError> {
        let code = match PromoCode::parse(raw) {
            Ok(code) => code,
            Err(e) => {
                let field = promo_field_error(&e);
                self.lock().await?.field_error(&field);
                return Err(CheckoutError::Field(field));
            }
        };

        self.lock().await?.begin_promo()?;
        info!("Session {}: validating promo code {}", self.id, code);

        let cancel = self.teardown.child_token();
        let result = run_cancellable_result(&cancel, self.backend.validate_promo_code(&code, &cancel)).await;

        {
            let mut session = self.lock().await?;
            match result {
                Ok(PromoValidation::Valid(discount)) => {
                    let notice = t!("checkout.promo.applied", code = code.as_str()).to_string();
                    if !session.promo_applied(AppliedPromo { code: code.clone(), discount }, notice) {
                        debug!("Session {}: discarding promo code {} validated out of turn", self.id, code);
                        return Ok(session.summary(self.config.tax_rate, &self.config.currency, Utc::now()));
                    }
                    info!("Session {}: promo code {} applied ({:?})", self.id, code, discount);
                }
                Ok(PromoValidation::Invalid) => {
                    let message = t!("checkout.promo.invalid", code = code.as_str()).to_string();
                    session.promo_rejected(message.clone());
                    info!("Session {}: promo code {} rejected", self.id, code);
                    return Err(CheckoutError::PromoRejected(message));
                }
                Err(BackendError::Cancelled) => return Err(CheckoutError::Closed),
                Err(e) => {
                    let message = t!("checkout.promo.unavailable").to_string();
                    session.promo_rejected(message.clone());
                    warn!("Session {}: promo validation failed: {}", self.id, e);
                    return Err(CheckoutError::PromoRejected(message));
                }
            }
        }

        if let Err(e) = self.acquire_intent().await {
            warn!("Session {}: no payment intent after promo change: {}", self.id, e);
        }

        self.summary().await
    }

    /// Submits the payment form. Input errors and a missing intent are rejected before
    /// any network call; every failure after that leaves the session retryable.
    pub async fn submit(&self, form: PaymentForm) -> Result<SubmissionOutcome, CheckoutError> {
        let now = Utc::now();
        let ticket = {
            let mut session = self.lock().await?;
            session.check_can_submit(now)?;
            if let Err(field) = validate_form(&form, now.date_naive()) {
                debug!("Session {}: form rejected: {}", self.id, field);
                session.field_error(&field);
                return Err(CheckoutError::Field(field));
            }
            session.begin_submission(form.family(), now)?
        };

        info!("Session {}: submitting {:?} payment", self.id, ticket.family);

        match form {
            PaymentForm::Card { cardholder_name, card } => self.submit_card(ticket, &cardholder_name, card).await,
            PaymentForm::DelegatedWallet { account_email } => {
                let message = t!(
                    "checkout.instructions.wallet",
                    amount = format_money(ticket.amount, &self.config.currency),
                    account = account_email.as_str()
                )
                .to_string();
                let instructions = PaymentInstructions::DelegatedWallet {
                    account_email,
                    reference: payment_reference(&ticket.client_secret),
                    message,
                };
                self.await_external(instructions).await
            }
            PaymentForm::MobileRedirect { phone_number } => {
                let reference = payment_reference(&ticket.client_secret);
                let message = t!(
                    "checkout.instructions.mobile",
                    amount = format_money(ticket.amount, &self.config.currency),
                    phone = phone_number.as_str(),
                    reference = reference.as_str()
                )
                .to_string();
                let instructions = PaymentInstructions::MobileRedirect {
                    phone_number,
                    reference,
                    message,
                };
                self.await_external(instructions).await
            }
        }
    }

    async fn submit_card(
        &self,
        ticket: SubmissionTicket,
        cardholder_name: &str,
        card: CardDetails,
    ) -> Result<SubmissionOutcome, CheckoutError> {
        debug!("Session {}: tokenizing card {:?}", self.id, card);

        let cancel = self.teardown.child_token();
        let tokenized = run_cancellable_result(
            &cancel,
            self.gateway.create_payment_method(card, cardholder_name.trim(), &cancel),
        )
        .await;

        let handle = match tokenized {
            Ok(handle) => handle,
            Err(GatewayError::Cancelled) => return Err(CheckoutError::Closed),
            Err(e) => {
                let failure = describe_gateway_error(&e, self.config.test_mode);
                let status = self.lock().await?.submission_failed(
                    &failure,
                    FailureSource::Gateway,
                    self.config.max_gateway_failures,
                );
                warn!("Session {}: card tokenization failed ({}), now {}", self.id, e, status);
                return Err(CheckoutError::Payment(failure));
            }
        };

        let request = SubscriptionRequest {
            plan_id: ticket.plan_id.clone(),
            customer_id: ticket.customer_id.clone(),
            idempotency_key: idempotency_key(self.id, &ticket.client_secret, &handle),
            payment_method: handle,
            promo_code: ticket.promo_code.clone(),
        };
        let created = run_cancellable_result(&cancel, self.backend.create_subscription(&request, &cancel)).await;

        let mut session = self.lock().await?;
        match created {
            Ok(response) => {
                session.submission_succeeded(response.subscription_id.clone());
                info!(
                    "Session {}: subscription {} created for {}",
                    self.id, response.subscription_id, ticket.plan_id
                );
                Ok(SubmissionOutcome::Succeeded {
                    subscription_id: response.subscription_id,
                })
            }
            Err(BackendError::Cancelled) => Err(CheckoutError::Closed),
            Err(e) => {
                let failure = describe_backend_error(&e);
                session.submission_failed(&failure, FailureSource::Backend, self.config.max_gateway_failures);
                drop(session);
                error!("Session {}: subscription creation failed: {}", self.id, e);

                if let Err(e) = self.acquire_intent().await {
                    warn!("Session {}: no fresh payment intent after failure: {}", self.id, e);
                }
                Err(CheckoutError::Payment(failure))
            }
        }
    }

    async fn await_external(&self, instructions: PaymentInstructions) -> Result<SubmissionOutcome, CheckoutError> {
        let mut session = self.lock().await?;
        session.await_external(instructions.clone());
        info!(
            "Session {}: awaiting out-of-band payment {}",
            self.id,
            instructions.reference()
        );
        Ok(SubmissionOutcome::AwaitingConfirmation(instructions))
    }

    /// Applies the out-of-band result of a wallet or mobile payment.
    pub async fn confirm_external(&self, outcome: ExternalOutcome) -> Result<CheckoutStatus, CheckoutError> {
        let mut session = self.lock().await?;
        match outcome {
            ExternalOutcome::Confirmed { subscription_id } => {
                session.external_confirmed(subscription_id.as_str())?;
                info!("Session {}: external payment confirmed ({})", self.id, subscription_id);
            }
            ExternalOutcome::Rejected { reason } => {
                session.external_rejected(&describe_external_rejection(&reason))?;
                warn!("Session {}: external payment rejected: {}", self.id, reason);
            }
        }
        Ok(session.status())
    }

    /// Leaves the out-of-band wait and goes back to collecting with a fresh intent.
    pub async fn change_payment_method(&self) -> Result<(), CheckoutError> {
        self.lock().await?.abandon_external()?;
        info!("Session {}: payment method change requested", self.id);
        self.acquire_intent().await
    }

    /// `failed` back to `collecting`, reusing the intent while it is still valid.
    pub async fn retry(&self) -> Result<OrderSummary, CheckoutError> {
        let reusable = self.lock().await?.retry(Utc::now())?;
        info!("Session {}: retrying (intent reused: {})", self.id, reusable);

        if !reusable {
            self.acquire_intent().await?;
        }
        self.summary().await
    }

    pub async fn contact_support(&self) -> SupportReference {
        let session = self.session.lock().await;
        let reference = support_reference(self.id);
        SupportReference {
            message: t!("checkout.support.reference", reference = reference.as_str()).to_string(),
            reference,
            status: session.status(),
            last_error: session.last_error().map(str::to_string),
        }
    }
}

impl Drop for CheckoutController {
    fn drop(&mut self) {
        self.teardown.cancel();
    }
}
