use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A normalised (trimmed, upper-cased) promo code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PromoCode(pub(super) String);

impl PromoCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromoCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    Percent(Decimal),
    Amount(Decimal),
}

/// Backend answer to a promo-code check. An invalid code is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromoValidation {
    Valid(Discount),
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedPromo {
    pub code: PromoCode,
    pub discount: Discount,
}
