mod model;

pub use model::*;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::promo::Discount;

pub const DEFAULT_TAX_RATE: Decimal = dec!(0.08);

/// Discount taken off `unit_price`. Flat discounts are capped at the unit price.
pub fn discount_amount(unit_price: Decimal, discount: Option<&Discount>) -> Decimal {
    match discount {
        Some(Discount::Percent(percent)) => unit_price * *percent / dec!(100),
        Some(Discount::Amount(amount)) => (*amount).min(unit_price),
        None => Decimal::ZERO,
    }
}

/// Prices an order. Pure and deterministic: the same inputs always give the same breakdown.
pub fn compute(unit_price: Decimal, discount: Option<&Discount>, tax_rate: Decimal) -> PriceBreakdown {
    let discount = discount_amount(unit_price, discount);
    let taxable = unit_price - discount;
    let tax = taxable * tax_rate;

    PriceBreakdown {
        subtotal: unit_price,
        discount,
        tax,
        total: taxable + tax,
    }
}
