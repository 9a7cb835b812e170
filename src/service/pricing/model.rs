use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::utils::{format_money, round_money};

/// Full-precision price components. Round only through [`PriceBreakdown::rounded`] or `Display`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl PriceBreakdown {
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_money(self.subtotal),
            discount: round_money(self.discount),
            tax: round_money(self.tax),
            total: round_money(self.total),
        }
    }

    pub fn display(&self, currency: &str) -> PriceDisplay<'_> {
        PriceDisplay {
            breakdown: self,
            currency: currency.to_string(),
        }
    }
}

pub struct PriceDisplay<'a> {
    breakdown: &'a PriceBreakdown,
    currency: String,
}

impl fmt::Display for PriceDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.breakdown;
        writeln!(f, "Subtotal: {}", format_money(b.subtotal, &self.currency))?;
        if !b.discount.is_zero() {
            writeln!(f, "Discount: -{}", format_money(b.discount, &self.currency))?;
        }
        writeln!(f, "Tax:      {}", format_money(b.tax, &self.currency))?;
        write!(f, "Total:    {}", format_money(b.total, &self.currency))
    }
}
