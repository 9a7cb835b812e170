use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingPeriod {
    Monthly,
    Yearly,
}

impl BillingPeriod {
    pub fn descriptor(&self) -> &'static str {
        match self {
            BillingPeriod::Monthly => "Monthly subscription",
            BillingPeriod::Yearly => "Annual subscription",
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingPeriod::Monthly => write!(f, "monthly"),
            BillingPeriod::Yearly => write!(f, "yearly"),
        }
    }
}

impl std::str::FromStr for BillingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => Ok(BillingPeriod::Monthly),
            "yearly" | "year" | "annual" => Ok(BillingPeriod::Yearly),
            other => Err(format!("unknown billing period: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub tagline: String,
    pub monthly_price: Decimal,
    pub yearly_price: Decimal,
    pub features: Vec<String>,
}

impl Plan {
    pub fn price(&self, period: BillingPeriod) -> Decimal {
        match period {
            BillingPeriod::Monthly => self.monthly_price,
            BillingPeriod::Yearly => self.yearly_price,
        }
    }

    pub fn is_free(&self) -> bool {
        self.monthly_price.is_zero() && self.yearly_price.is_zero()
    }
}

/// The item being purchased. Immutable for the lifetime of a checkout session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub plan_id: String,
    pub name: String,
    pub description: String,
    pub unit_price: Decimal,
    pub billing_period: BillingPeriod,
}
