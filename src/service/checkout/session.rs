use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::{
    CheckoutError, CheckoutStatus, FailureSource, FieldError, IntentState, IntentTicket, Operation, OrderSummary,
    PaymentFailure, PaymentInstructions, PaymentIntent, PaymentMethodFamily, SubmissionTicket,
};
use crate::service::{
    backend::PaymentIntentResponse,
    catalog::Order,
    pricing::{self, PriceBreakdown},
    promo::AppliedPromo,
};

/// State of one purchase attempt.
///
/// Every method is a synchronous transition. Methods that apply the result of a
/// collaborator call return `false` when the result no longer matches the session
/// and was discarded.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    id: Uuid,
    customer_id: String,
    order: Order,
    promo: Option<AppliedPromo>,
    status: CheckoutStatus,
    intent: IntentState,
    /// Bumped on every pricing change. Intents issued for an older version are stale.
    pricing_version: u64,
    promo_in_flight: bool,
    gateway_failures: u32,
    instructions: Option<PaymentInstructions>,
    subscription_id: Option<String>,
    last_error: Option<String>,
    notice: Option<String>,
    created_at: DateTime<Utc>,
}

impl CheckoutSession {
    pub fn new(id: Uuid, customer_id: impl Into<String>, order: Order, now: DateTime<Utc>) -> Self {
        Self {
            id,
            customer_id: customer_id.into(),
            order,
            promo: None,
            status: CheckoutStatus::Collecting,
            intent: IntentState::Missing,
            pricing_version: 0,
            promo_in_flight: false,
            gateway_failures: 0,
            instructions: None,
            subscription_id: None,
            last_error: None,
            notice: None,
            created_at: now,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn order(&self) -> &Order {
        &self.order
    }

    pub fn promo(&self) -> Option<&AppliedPromo> {
        self.promo.as_ref()
    }

    pub fn status(&self) -> CheckoutStatus {
        self.status
    }

    pub fn intent(&self) -> &IntentState {
        &self.intent
    }

    pub fn pricing_version(&self) -> u64 {
        self.pricing_version
    }

    pub fn promo_in_flight(&self) -> bool {
        self.promo_in_flight
    }

    pub fn gateway_failures(&self) -> u32 {
        self.gateway_failures
    }

    pub fn instructions(&self) -> Option<&PaymentInstructions> {
        self.instructions.as_ref()
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription_id.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn pricing(&self, tax_rate: Decimal) -> PriceBreakdown {
        pricing::compute(
            self.order.unit_price,
            self.promo.as_ref().map(|p| &p.discount),
            tax_rate,
        )
    }

    /// The intent a submission may use right now, if any.
    pub fn usable_intent(&self, now: DateTime<Utc>) -> Option<&PaymentIntent> {
        self.intent
            .intent()
            .filter(|intent| intent.pricing_version == self.pricing_version && intent.is_usable(now))
    }

    pub fn can_submit(&self, now: DateTime<Utc>) -> bool {
        self.check_can_submit(now).is_ok()
    }

    pub fn summary(&self, tax_rate: Decimal, currency: &str, now: DateTime<Utc>) -> OrderSummary {
        OrderSummary {
            session_id: self.id,
            plan_name: self.order.name.clone(),
            description: self.order.description.clone(),
            billing_period: self.order.billing_period,
            currency: currency.to_string(),
            promo_code: self.promo.as_ref().map(|p| p.code.to_string()),
            pricing: self.pricing(tax_rate).rounded(),
            status: self.status,
            can_submit: self.can_submit(now),
        }
    }

    /// Starts an intent request for the current pricing. `None` when one is already
    /// in flight for this pricing version.
    pub fn begin_intent_request(
        &mut self,
        tax_rate: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<IntentTicket>, CheckoutError> {
        if self.status != CheckoutStatus::Collecting {
            return Err(CheckoutError::InvalidState {
                action: "request a payment intent",
                status: self.status,
            });
        }

        if self.intent == (IntentState::Requesting { pricing_version: self.pricing_version })
            || self.usable_intent(now).is_some()
        {
            return Ok(None);
        }

        self.intent = IntentState::Requesting {
            pricing_version: self.pricing_version,
        };

        Ok(Some(IntentTicket {
            pricing_version: self.pricing_version,
            plan_id: self.order.plan_id.clone(),
            customer_id: self.customer_id.clone(),
            promo_code: self.promo.as_ref().map(|p| p.code.clone()),
            amount: self.pricing(tax_rate).total,
        }))
    }

    fn is_current_request(&self, ticket: &IntentTicket) -> bool {
        self.status == CheckoutStatus::Collecting
            && ticket.pricing_version == self.pricing_version
            && self.intent
                == (IntentState::Requesting {
                    pricing_version: ticket.pricing_version,
                })
    }

    pub fn intent_acquired(
        &mut self,
        ticket: &IntentTicket,
        response: PaymentIntentResponse,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> bool {
        if !self.is_current_request(ticket) {
            return false;
        }

        self.intent = IntentState::Ready(PaymentIntent {
            client_secret: response.client_secret,
            resolved_plan_id: response.resolved_plan_id,
            amount: ticket.amount,
            pricing_version: ticket.pricing_version,
            issued_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        });
        true
    }

    pub fn intent_failed(&mut self, ticket: &IntentTicket, message: impl Into<String>) -> bool {
        if !self.is_current_request(ticket) {
            return false;
        }

        self.intent = IntentState::Unavailable {
            message: message.into(),
        };
        true
    }

    pub fn begin_promo(&mut self) -> Result<(), CheckoutError> {
        if self.status != CheckoutStatus::Collecting {
            return Err(CheckoutError::InvalidState {
                action: "apply a promo code",
                status: self.status,
            });
        }
        if self.promo_in_flight {
            return Err(CheckoutError::InFlight(Operation::PromoValidation));
        }

        self.promo_in_flight = true;
        self.notice = None;
        Ok(())
    }

    /// Attaches a validated promo, replacing any previous one. The payable amount
    /// changed, so the current intent is dropped.
    pub fn promo_applied(&mut self, promo: AppliedPromo, notice: impl Into<String>) -> bool {
        if !self.promo_in_flight || self.status != CheckoutStatus::Collecting {
            return false;
        }

        self.promo = Some(promo);
        self.promo_in_flight = false;
        self.pricing_version += 1;
        self.intent = IntentState::Missing;
        self.last_error = None;
        self.notice = Some(notice.into());
        true
    }

    /// Leaves pricing untouched.
    pub fn promo_rejected(&mut self, message: impl Into<String>) -> bool {
        if !self.promo_in_flight {
            return false;
        }

        self.promo_in_flight = false;
        self.last_error = Some(message.into());
        true
    }

    pub fn check_can_submit(&self, now: DateTime<Utc>) -> Result<(), CheckoutError> {
        match self.status {
            CheckoutStatus::Collecting => {}
            CheckoutStatus::Submitting => return Err(CheckoutError::InFlight(Operation::Submission)),
            status => {
                return Err(CheckoutError::InvalidState {
                    action: "submit payment",
                    status,
                })
            }
        }

        if self.promo_in_flight {
            return Err(CheckoutError::InFlight(Operation::PromoValidation));
        }

        if self.usable_intent(now).is_none() {
            return Err(CheckoutError::IntentNotReady);
        }

        Ok(())
    }

    pub fn begin_submission(
        &mut self,
        family: PaymentMethodFamily,
        now: DateTime<Utc>,
    ) -> Result<SubmissionTicket, CheckoutError> {
        self.check_can_submit(now)?;

        let intent = self.usable_intent(now).ok_or(CheckoutError::IntentNotReady)?;
        let ticket = SubmissionTicket {
            family,
            client_secret: intent.client_secret.clone(),
            plan_id: intent.resolved_plan_id.clone(),
            customer_id: self.customer_id.clone(),
            promo_code: self.promo.as_ref().map(|p| p.code.clone()),
            amount: intent.amount,
        };

        self.status = CheckoutStatus::Submitting;
        self.last_error = None;
        self.notice = None;
        Ok(ticket)
    }

    pub fn field_error(&mut self, error: &FieldError) {
        self.last_error = Some(error.message.clone());
    }

    pub fn await_external(&mut self, instructions: PaymentInstructions) -> bool {
        if self.status != CheckoutStatus::Submitting {
            return false;
        }

        self.status = CheckoutStatus::AwaitingPaymentIntent;
        self.instructions = Some(instructions);
        true
    }

    pub fn submission_succeeded(&mut self, subscription_id: impl Into<String>) -> bool {
        if self.status != CheckoutStatus::Submitting {
            return false;
        }

        self.status = CheckoutStatus::Succeeded;
        self.subscription_id = Some(subscription_id.into());
        self.gateway_failures = 0;
        self.last_error = None;
        true
    }

    /// Records a failed submission and returns the status the session lands in.
    ///
    /// Gateway failures keep the intent, since nothing was charged. A backend failure
    /// drops it so the next attempt runs against a fresh one.
    pub fn submission_failed(
        &mut self,
        failure: &PaymentFailure,
        source: FailureSource,
        max_gateway_failures: u32,
    ) -> CheckoutStatus {
        if self.status != CheckoutStatus::Submitting {
            return self.status;
        }

        self.last_error = Some(failure.to_string());

        match source {
            FailureSource::Gateway => {
                self.gateway_failures += 1;
                if max_gateway_failures > 0 && self.gateway_failures >= max_gateway_failures {
                    self.status = CheckoutStatus::Failed;
                } else {
                    self.status = CheckoutStatus::Collecting;
                }
            }
            FailureSource::Backend => {
                self.gateway_failures = 0;
                self.intent = IntentState::Missing;
                self.status = CheckoutStatus::Collecting;
            }
            FailureSource::External => {
                self.status = CheckoutStatus::Failed;
            }
        }

        self.status
    }

    fn ensure_awaiting(&self, action: &'static str) -> Result<(), CheckoutError> {
        if self.status != CheckoutStatus::AwaitingPaymentIntent {
            return Err(CheckoutError::InvalidState {
                action,
                status: self.status,
            });
        }
        Ok(())
    }

    pub fn external_confirmed(&mut self, subscription_id: impl Into<String>) -> Result<(), CheckoutError> {
        self.ensure_awaiting("confirm an external payment")?;

        self.status = CheckoutStatus::Succeeded;
        self.subscription_id = Some(subscription_id.into());
        self.last_error = None;
        Ok(())
    }

    pub fn external_rejected(&mut self, failure: &PaymentFailure) -> Result<(), CheckoutError> {
        self.ensure_awaiting("reject an external payment")?;

        self.status = CheckoutStatus::Failed;
        self.instructions = None;
        self.last_error = Some(failure.to_string());
        Ok(())
    }

    /// Leaves the out-of-band wait to pick another payment method. The intent the
    /// instructions referenced is dropped, so a late confirmation cannot apply.
    pub fn abandon_external(&mut self) -> Result<(), CheckoutError> {
        self.ensure_awaiting("change the payment method")?;

        self.status = CheckoutStatus::Collecting;
        self.instructions = None;
        self.intent = IntentState::Missing;
        Ok(())
    }

    /// `failed` back to `collecting`. Returns whether the existing intent can be reused.
    pub fn retry(&mut self, now: DateTime<Utc>) -> Result<bool, CheckoutError> {
        if self.status != CheckoutStatus::Failed {
            return Err(CheckoutError::InvalidState {
                action: "retry",
                status: self.status,
            });
        }

        self.status = CheckoutStatus::Collecting;
        self.gateway_failures = 0;
        self.instructions = None;
        self.notice = None;

        let reusable = self.usable_intent(now).is_some();
        if !reusable {
            self.intent = IntentState::Missing;
        }
        Ok(reusable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{
        catalog::{BillingPeriod, PlanCatalog},
        checkout::FailureKind,
        promo::{Discount, PromoCode},
    };
    use rust_decimal_macros::dec;

    const TAX: Decimal = dec!(0.08);

    fn session() -> CheckoutSession {
        let order = PlanCatalog::standard().order("pro", BillingPeriod::Yearly).unwrap();
        CheckoutSession::new(Uuid::new_v4(), "user_1", order, Utc::now())
    }

    fn response(secret: &str) -> PaymentIntentResponse {
        PaymentIntentResponse {
            client_secret: secret.to_string(),
            resolved_plan_id: "pro_yearly".to_string(),
        }
    }

    fn ready_session() -> CheckoutSession {
        let mut session = session();
        let ticket = session.begin_intent_request(TAX, Utc::now()).unwrap().unwrap();
        assert!(session.intent_acquired(&ticket, response("pi_1_secret"), Utc::now(), Duration::minutes(30)));
        session
    }

    fn welcome20() -> AppliedPromo {
        AppliedPromo {
            code: PromoCode::parse("welcome20").unwrap(),
            discount: Discount::Percent(dec!(20)),
        }
    }

    fn declined() -> PaymentFailure {
        PaymentFailure {
            kind: FailureKind::CardDeclined,
            message: "declined".to_string(),
            hint: None,
        }
    }

    #[test]
    fn test_new_session_is_collecting_without_intent() {
        let session = session();
        assert_eq!(session.status(), CheckoutStatus::Collecting);
        assert_eq!(session.intent(), &IntentState::Missing);
        assert!(!session.can_submit(Utc::now()));
        assert!(matches!(
            session.check_can_submit(Utc::now()),
            Err(CheckoutError::IntentNotReady)
        ));
    }

    #[test]
    fn test_intent_ticket_carries_current_pricing() {
        let mut session = session();
        let ticket = session.begin_intent_request(TAX, Utc::now()).unwrap().unwrap();

        assert_eq!(ticket.plan_id, "pro_yearly");
        assert_eq!(ticket.customer_id, "user_1");
        assert_eq!(ticket.amount, dec!(313.20));
        assert!(session.begin_intent_request(TAX, Utc::now()).unwrap().is_none());
    }

    #[test]
    fn test_ready_intent_is_not_requested_again() {
        let mut session = ready_session();

        assert!(session.begin_intent_request(TAX, Utc::now()).unwrap().is_none());
        assert_eq!(session.intent().intent().unwrap().client_secret, "pi_1_secret");
        assert!(session.can_submit(Utc::now()));

        let later = Utc::now() + Duration::hours(1);
        assert!(session.begin_intent_request(TAX, later).unwrap().is_some());
    }

    #[test]
    fn test_promo_result_out_of_turn_is_ignored() {
        let mut session = ready_session();
        let before = session.pricing(TAX);

        assert!(!session.promo_applied(welcome20(), "applied"));

        assert_eq!(session.pricing(TAX), before);
        assert!(session.promo().is_none());
        assert!(session.can_submit(Utc::now()));
    }

    #[test]
    fn test_huge_ttl_saturates_expiry() {
        let mut session = session();
        let ticket = session.begin_intent_request(TAX, Utc::now()).unwrap().unwrap();

        assert!(session.intent_acquired(&ticket, response("pi_1"), Utc::now(), Duration::seconds(i64::MAX / 1_000)));
        assert_eq!(session.intent().intent().unwrap().expires_at, DateTime::<Utc>::MAX_UTC);
        assert!(session.can_submit(Utc::now()));
    }

    #[test]
    fn test_ready_intent_allows_submission() {
        let session = ready_session();
        assert!(session.can_submit(Utc::now()));
        assert_eq!(session.summary(TAX, "USD", Utc::now()).pricing.total, dec!(313.20));
    }

    #[test]
    fn test_promo_change_invalidates_intent() {
        let mut session = ready_session();
        session.begin_promo().unwrap();
        assert!(matches!(
            session.check_can_submit(Utc::now()),
            Err(CheckoutError::InFlight(Operation::PromoValidation))
        ));

        assert!(session.promo_applied(welcome20(), "applied"));
        assert_eq!(session.pricing_version(), 1);
        assert_eq!(session.intent(), &IntentState::Missing);
        assert_eq!(session.pricing(TAX).total, dec!(250.56));
        assert!(!session.can_submit(Utc::now()));
    }

    #[test]
    fn test_stale_intent_is_discarded() {
        let mut session = session();
        let stale = session.begin_intent_request(TAX, Utc::now()).unwrap().unwrap();

        session.begin_promo().unwrap();
        session.promo_applied(welcome20(), "applied");
        let fresh = session.begin_intent_request(TAX, Utc::now()).unwrap().unwrap();

        assert!(!session.intent_acquired(&stale, response("pi_old"), Utc::now(), Duration::minutes(30)));
        assert!(session.intent_acquired(&fresh, response("pi_new"), Utc::now(), Duration::minutes(30)));
        let intent = session.intent().intent().unwrap();
        assert_eq!(intent.client_secret, "pi_new");
        assert_eq!(intent.amount, dec!(250.56));
    }

    #[test]
    fn test_promo_rejection_keeps_pricing() {
        let mut session = ready_session();
        let before = session.pricing(TAX);

        session.begin_promo().unwrap();
        assert!(matches!(
            session.begin_promo(),
            Err(CheckoutError::InFlight(Operation::PromoValidation))
        ));
        assert!(session.promo_rejected("invalid"));

        assert_eq!(session.pricing(TAX), before);
        assert_eq!(session.status(), CheckoutStatus::Collecting);
        assert_eq!(session.last_error(), Some("invalid"));
        assert!(session.can_submit(Utc::now()));
    }

    #[test]
    fn test_expired_intent_blocks_submission() {
        let mut session = session();
        let ticket = session.begin_intent_request(TAX, Utc::now()).unwrap().unwrap();
        let issued = Utc::now() - Duration::hours(1);
        session.intent_acquired(&ticket, response("pi_1"), issued, Duration::minutes(30));

        assert!(matches!(
            session.begin_submission(PaymentMethodFamily::Card, Utc::now()),
            Err(CheckoutError::IntentNotReady)
        ));
        assert_eq!(session.status(), CheckoutStatus::Collecting);
    }

    #[test]
    fn test_submission_uses_resolved_plan() {
        let mut session = ready_session();
        let ticket = session.begin_submission(PaymentMethodFamily::Card, Utc::now()).unwrap();

        assert_eq!(ticket.plan_id, "pro_yearly");
        assert_eq!(ticket.client_secret, "pi_1_secret");
        assert_eq!(session.status(), CheckoutStatus::Submitting);
        assert!(matches!(
            session.begin_submission(PaymentMethodFamily::Card, Utc::now()),
            Err(CheckoutError::InFlight(Operation::Submission))
        ));
    }

    #[test]
    fn test_gateway_failures_escalate_to_failed() {
        let mut session = ready_session();

        for _ in 0..2 {
            session.begin_submission(PaymentMethodFamily::Card, Utc::now()).unwrap();
            assert_eq!(
                session.submission_failed(&declined(), FailureSource::Gateway, 3),
                CheckoutStatus::Collecting
            );
        }
        session.begin_submission(PaymentMethodFamily::Card, Utc::now()).unwrap();
        assert_eq!(
            session.submission_failed(&declined(), FailureSource::Gateway, 3),
            CheckoutStatus::Failed
        );
        assert_eq!(session.gateway_failures(), 3);

        assert!(session.retry(Utc::now()).unwrap());
        assert_eq!(session.status(), CheckoutStatus::Collecting);
        assert_eq!(session.gateway_failures(), 0);
        assert!(session.can_submit(Utc::now()));
    }

    #[test]
    fn test_zero_limit_never_fails() {
        let mut session = ready_session();
        for _ in 0..10 {
            session.begin_submission(PaymentMethodFamily::Card, Utc::now()).unwrap();
            session.submission_failed(&declined(), FailureSource::Gateway, 0);
        }
        assert_eq!(session.status(), CheckoutStatus::Collecting);
    }

    #[test]
    fn test_backend_failure_drops_intent() {
        let mut session = ready_session();
        session.begin_submission(PaymentMethodFamily::Card, Utc::now()).unwrap();

        let status = session.submission_failed(&declined(), FailureSource::Backend, 3);

        assert_eq!(status, CheckoutStatus::Collecting);
        assert_eq!(session.intent(), &IntentState::Missing);
        assert_eq!(session.last_error(), Some("declined"));
    }

    #[test]
    fn test_success_is_terminal() {
        let mut session = ready_session();
        session.begin_submission(PaymentMethodFamily::Card, Utc::now()).unwrap();

        assert!(session.submission_succeeded("sub_1"));
        assert!(!session.submission_succeeded("sub_2"));
        assert_eq!(session.subscription_id(), Some("sub_1"));
        assert!(matches!(
            session.begin_submission(PaymentMethodFamily::Card, Utc::now()),
            Err(CheckoutError::InvalidState { .. })
        ));
        assert!(session.begin_promo().is_err());
        assert!(session.retry(Utc::now()).is_err());
    }

    #[test]
    fn test_external_flow() {
        let instructions = PaymentInstructions::MobileRedirect {
            phone_number: "+254712345678".to_string(),
            reference: "VX-AAAA-BBBBBB".to_string(),
            message: "pay".to_string(),
        };

        let mut session = ready_session();
        session.begin_submission(PaymentMethodFamily::MobileRedirect, Utc::now()).unwrap();
        assert!(session.await_external(instructions.clone()));
        assert_eq!(session.status(), CheckoutStatus::AwaitingPaymentIntent);
        assert!(matches!(
            session.check_can_submit(Utc::now()),
            Err(CheckoutError::InvalidState { .. })
        ));

        session.external_confirmed("sub_9").unwrap();
        assert_eq!(session.status(), CheckoutStatus::Succeeded);
        assert!(session.external_confirmed("sub_10").is_err());

        let mut session = ready_session();
        session.begin_submission(PaymentMethodFamily::MobileRedirect, Utc::now()).unwrap();
        session.await_external(instructions);
        session.external_rejected(&declined()).unwrap();
        assert_eq!(session.status(), CheckoutStatus::Failed);
        assert!(session.instructions().is_none());
        assert!(session.retry(Utc::now()).unwrap());
    }

    #[test]
    fn test_abandon_external_requires_fresh_intent() {
        let mut session = ready_session();
        session.begin_submission(PaymentMethodFamily::DelegatedWallet, Utc::now()).unwrap();
        session.await_external(PaymentInstructions::DelegatedWallet {
            account_email: "ada@voxshift.io".to_string(),
            reference: "VX-AAAA-BBBBBB".to_string(),
            message: "approve".to_string(),
        });

        session.abandon_external().unwrap();
        assert_eq!(session.status(), CheckoutStatus::Collecting);
        assert_eq!(session.intent(), &IntentState::Missing);
        assert!(session.abandon_external().is_err());
    }

    #[test]
    fn test_retry_with_expired_intent() {
        let mut session = ready_session();
        session.begin_submission(PaymentMethodFamily::Card, Utc::now()).unwrap();
        session.submission_failed(&declined(), FailureSource::Gateway, 1);
        assert_eq!(session.status(), CheckoutStatus::Failed);

        let later = Utc::now() + Duration::hours(2);
        assert!(!session.retry(later).unwrap());
        assert_eq!(session.intent(), &IntentState::Missing);
    }
}
