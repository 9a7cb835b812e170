use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::strip_separators;

/// Opaque token for tokenized payment details. Safe to hand to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentMethodHandle(String);

impl PaymentMethodHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentMethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Raw card fields as typed by the user. Only the gateway reads them; `Debug` shows the last four digits.
#[derive(Clone)]
pub struct CardDetails {
    number: String,
    expiry: String,
    cvc: String,
}

impl CardDetails {
    pub fn new(number: impl Into<String>, expiry: impl Into<String>, cvc: impl Into<String>) -> Self {
        Self {
            number: strip_separators(&number.into()),
            expiry: expiry.into().trim().to_string(),
            cvc: cvc.into().trim().to_string(),
        }
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn expiry(&self) -> &str {
        &self.expiry
    }

    pub fn cvc(&self) -> &str {
        &self.cvc
    }

    pub fn last4(&self) -> &str {
        let len = self.number.len();
        if len >= 4 && self.number.is_ascii() {
            &self.number[len - 4..]
        } else {
            ""
        }
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("**** {}", self.last4()))
            .field("expiry", &"**/**")
            .field("cvc", &"***")
            .finish()
    }
}
