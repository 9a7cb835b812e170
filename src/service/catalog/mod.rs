mod model;

pub use model::*;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CatalogError {
    #[error("Unknown plan: {0}")]
    UnknownPlan(String),
    #[error("Plan {0} is free and cannot be purchased")]
    NotPurchasable(String),
    #[error("Price must not be negative: {0}")]
    NegativePrice(Decimal),
}

impl Order {
    pub fn new(
        plan_id: impl Into<String>,
        name: impl Into<String>,
        unit_price: Decimal,
        billing_period: BillingPeriod,
    ) -> Result<Self, CatalogError> {
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(CatalogError::NegativePrice(unit_price));
        }

        Ok(Self {
            plan_id: plan_id.into(),
            name: name.into(),
            description: billing_period.descriptor().to_string(),
            unit_price,
            billing_period,
        })
    }

    pub fn from_plan(plan: &Plan, period: BillingPeriod) -> Result<Self, CatalogError> {
        if plan.is_free() {
            return Err(CatalogError::NotPurchasable(plan.id.clone()));
        }

        Self::new(
            format!("{}_{}", plan.id, period),
            format!("{} Plan", plan.name),
            plan.price(period),
            period,
        )
    }
}

/// Plans offered on the pricing page.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Plan {
                id: "free".to_string(),
                name: "Free".to_string(),
                tagline: "Try real-time voice transformation".to_string(),
                monthly_price: Decimal::ZERO,
                yearly_price: Decimal::ZERO,
                features: vec![
                    "5 voice presets".to_string(),
                    "30 minutes of processing per month".to_string(),
                    "Community support".to_string(),
                ],
            },
            Plan {
                id: "pro".to_string(),
                name: "Pro".to_string(),
                tagline: "For streamers and creators".to_string(),
                monthly_price: dec!(29),
                yearly_price: dec!(290),
                features: vec![
                    "All voice presets".to_string(),
                    "Unlimited real-time processing".to_string(),
                    "Custom voice cloning".to_string(),
                    "Priority email support".to_string(),
                ],
            },
            Plan {
                id: "studio".to_string(),
                name: "Studio".to_string(),
                tagline: "For teams and production studios".to_string(),
                monthly_price: dec!(79),
                yearly_price: dec!(790),
                features: vec![
                    "Everything in Pro".to_string(),
                    "5 team seats".to_string(),
                    "Commercial usage license".to_string(),
                    "Dedicated account manager".to_string(),
                ],
            },
        ])
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn plan(&self, plan_id: &str) -> Result<&Plan, CatalogError> {
        let plan_id = plan_id.trim();
        self.plans
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(plan_id))
            .ok_or_else(|| CatalogError::UnknownPlan(plan_id.to_string()))
    }

    pub fn order(&self, plan_id: &str, period: BillingPeriod) -> Result<Order, CatalogError> {
        Order::from_plan(self.plan(plan_id)?, period)
    }

    /// Percentage saved by paying yearly instead of twelve monthly payments, if any.
    pub fn yearly_savings_percent(plan: &Plan) -> Option<Decimal> {
        let twelve_months = plan.monthly_price * dec!(12);
        if twelve_months.is_zero() || plan.yearly_price >= twelve_months {
            return None;
        }
        Some((twelve_months - plan.yearly_price) / twelve_months * dec!(100))
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
