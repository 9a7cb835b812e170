pub mod http;
pub mod logging;

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

static CARD_NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{12,19}$").unwrap());

static CARD_EXPIRY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])\s*/\s*([0-9]{2}|[0-9]{4})$").unwrap());

static CARD_CVC_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{3,4}$").unwrap());

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+[1-9][0-9]{7,14}$").unwrap());

static CURRENCY_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{3}$").unwrap());

/// Strips the separators people type into card numbers and phone numbers.
pub fn strip_separators(input: &str) -> String {
    input.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.')).collect()
}

pub fn validate_card_number(number: &str) -> bool {
    let digits = strip_separators(number);
    CARD_NUMBER_REGEX.is_match(&digits) && luhn_valid(&digits)
}

/// Luhn checksum over an ASCII digit string.
pub fn luhn_valid(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    !digits.is_empty() && sum % 10 == 0
}

/// Parses `MM/YY` or `MM/YYYY` into (month, four digit year).
pub fn parse_card_expiry(expiry: &str) -> Option<(u32, i32)> {
    let caps = CARD_EXPIRY_REGEX.captures(expiry.trim())?;
    let month = caps.get(1)?.as_str().parse::<u32>().ok()?;
    let year_str = caps.get(2)?.as_str();
    let mut year = year_str.parse::<i32>().ok()?;
    if year_str.len() == 2 {
        year += 2000;
    }
    Some((month, year))
}

/// A card is usable through the last day of its expiry month.
pub fn card_expired(month: u32, year: i32, today: NaiveDate) -> bool {
    (year, month) < (today.year(), today.month())
}

pub fn validate_card_cvc(cvc: &str) -> bool {
    CARD_CVC_REGEX.is_match(cvc.trim())
}

pub fn validate_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email.trim())
}

pub fn validate_phone_number(phone: &str) -> bool {
    PHONE_REGEX.is_match(&strip_separators(phone))
}

pub fn validate_currency(code: &str) -> bool {
    CURRENCY_REGEX.is_match(code)
}

/// Rounds a monetary amount for display. Internal arithmetic keeps full precision.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn format_money(amount: Decimal, currency: &str) -> String {
    let rounded = round_money(amount);
    match currency {
        "USD" => format!("${:.2}", rounded),
        "EUR" => format!("€{:.2}", rounded),
        "GBP" => format!("£{:.2}", rounded),
        _ => format!("{:.2} {}", rounded, currency),
    }
}
