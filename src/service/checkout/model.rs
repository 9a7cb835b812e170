use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::service::{
    catalog::BillingPeriod,
    gateway::CardDetails,
    pricing::PriceBreakdown,
    promo::PromoCode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutStatus {
    Collecting,
    /// A non-card payment is waiting for out-of-band settlement of the payment intent.
    AwaitingPaymentIntent,
    Submitting,
    Succeeded,
    Failed,
}

impl fmt::Display for CheckoutStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutStatus::Collecting => "collecting",
            CheckoutStatus::AwaitingPaymentIntent => "awaitingPaymentIntent",
            CheckoutStatus::Submitting => "submitting",
            CheckoutStatus::Succeeded => "succeeded",
            CheckoutStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub resolved_plan_id: String,
    /// Payable total the intent was issued for.
    pub amount: Decimal,
    pub pricing_version: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentState {
    Missing,
    Requesting { pricing_version: u64 },
    Ready(PaymentIntent),
    Unavailable { message: String },
}

impl IntentState {
    pub fn intent(&self) -> Option<&PaymentIntent> {
        match self {
            IntentState::Ready(intent) => Some(intent),
            _ => None,
        }
    }
}

/// What the controller needs to request an intent, captured under the session lock.
#[derive(Debug, Clone, PartialEq)]
pub struct IntentTicket {
    pub pricing_version: u64,
    pub plan_id: String,
    pub customer_id: String,
    pub promo_code: Option<PromoCode>,
    pub amount: Decimal,
}

/// What the controller needs to finish a submission, captured under the session lock.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionTicket {
    pub family: PaymentMethodFamily,
    pub client_secret: String,
    pub plan_id: String,
    pub customer_id: String,
    pub promo_code: Option<PromoCode>,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodFamily {
    Card,
    DelegatedWallet,
    MobileRedirect,
}

#[derive(Debug, Clone)]
pub enum PaymentForm {
    Card {
        cardholder_name: String,
        card: CardDetails,
    },
    DelegatedWallet {
        account_email: String,
    },
    MobileRedirect {
        phone_number: String,
    },
}

impl PaymentForm {
    pub fn card(cardholder_name: impl Into<String>, card: CardDetails) -> Self {
        PaymentForm::Card {
            cardholder_name: cardholder_name.into(),
            card,
        }
    }

    pub fn family(&self) -> PaymentMethodFamily {
        match self {
            PaymentForm::Card { .. } => PaymentMethodFamily::Card,
            PaymentForm::DelegatedWallet { .. } => PaymentMethodFamily::DelegatedWallet,
            PaymentForm::MobileRedirect { .. } => PaymentMethodFamily::MobileRedirect,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    CardholderName,
    CardNumber,
    CardExpiry,
    CardCvc,
    WalletEmail,
    PhoneNumber,
    PromoCode,
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FormField::CardholderName => "cardholder name",
            FormField::CardNumber => "card number",
            FormField::CardExpiry => "card expiry",
            FormField::CardCvc => "card security code",
            FormField::WalletEmail => "wallet email",
            FormField::PhoneNumber => "phone number",
            FormField::PromoCode => "promo code",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: FormField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum PaymentInstructions {
    DelegatedWallet {
        account_email: String,
        reference: String,
        message: String,
    },
    MobileRedirect {
        phone_number: String,
        reference: String,
        message: String,
    },
}

impl PaymentInstructions {
    pub fn reference(&self) -> &str {
        match self {
            PaymentInstructions::DelegatedWallet { reference, .. } => reference,
            PaymentInstructions::MobileRedirect { reference, .. } => reference,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            PaymentInstructions::DelegatedWallet { message, .. } => message,
            PaymentInstructions::MobileRedirect { message, .. } => message,
        }
    }
}

/// Out-of-band result for a non-card payment (webhook or polling).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalOutcome {
    Confirmed { subscription_id: String },
    Rejected { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureSource {
    Gateway,
    Backend,
    External,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    CardDeclined,
    AuthenticationRequired,
    InvalidCard,
    BackendDeclined,
    Constraint,
    Misconfiguration,
    Network,
    ExternalRejected,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentFailure {
    pub kind: FailureKind,
    pub message: String,
    pub hint: Option<String>,
}

impl fmt::Display for PaymentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.hint {
            Some(hint) => write!(f, "{} {}", self.message, hint),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Succeeded { subscription_id: String },
    AwaitingConfirmation(PaymentInstructions),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    PromoValidation,
    Submission,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::PromoValidation => f.write_str("promo validation"),
            Operation::Submission => f.write_str("payment submission"),
        }
    }
}

/// Presentation view of a session: amounts rounded to two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub session_id: Uuid,
    pub plan_name: String,
    pub description: String,
    pub billing_period: BillingPeriod,
    pub currency: String,
    pub promo_code: Option<String>,
    pub pricing: PriceBreakdown,
    pub status: CheckoutStatus,
    pub can_submit: bool,
}

impl fmt::Display for OrderSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({})", self.plan_name, self.description)?;
        if let Some(code) = &self.promo_code {
            writeln!(f, "Promo:    {}", code)?;
        }
        write!(f, "{}", self.pricing.display(&self.currency))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportReference {
    pub reference: String,
    pub status: CheckoutStatus,
    pub last_error: Option<String>,
    pub message: String,
}
