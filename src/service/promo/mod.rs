mod model;

pub use model::*;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PromoError {
    #[error("Promo code is empty")]
    Empty,
    #[error("Discount percent out of range: {0}")]
    PercentOutOfRange(Decimal),
    #[error("Discount amount must not be negative: {0}")]
    NegativeAmount(Decimal),
    #[error("Discount must be either a percentage or an amount")]
    AmbiguousDiscount,
}

impl PromoCode {
    /// Trims and upper-cases `raw`. Whether the code exists is up to the backend.
    pub fn parse(raw: &str) -> Result<Self, PromoError> {
        let code = raw.trim().to_uppercase();
        if code.is_empty() {
            return Err(PromoError::Empty);
        }
        Ok(Self(code))
    }
}

impl std::str::FromStr for PromoCode {
    type Err = PromoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Discount {
    pub fn percent(percent: Decimal) -> Result<Self, PromoError> {
        if percent < Decimal::ZERO || percent > dec!(100) {
            return Err(PromoError::PercentOutOfRange(percent));
        }
        Ok(Discount::Percent(percent))
    }

    pub fn amount(amount: Decimal) -> Result<Self, PromoError> {
        if amount < Decimal::ZERO {
            return Err(PromoError::NegativeAmount(amount));
        }
        Ok(Discount::Amount(amount))
    }

    /// Builds a discount from the two mutually exclusive fields a backend reports.
    pub fn from_parts(percent: Option<Decimal>, amount: Option<Decimal>) -> Result<Self, PromoError> {
        match (percent, amount) {
            (Some(p), None) => Self::percent(p),
            (None, Some(a)) => Self::amount(a),
            _ => Err(PromoError::AmbiguousDiscount),
        }
    }
}
