use chrono::NaiveDate;

use super::{FieldError, FormField, PaymentForm};
use crate::{
    service::promo::PromoError,
    utils::{card_expired, parse_card_expiry, validate_card_cvc, validate_card_number, validate_email, validate_phone_number},
};

/// Checks the submission form locally. Nothing here touches the network.
pub fn validate_form(form: &PaymentForm, today: NaiveDate) -> Result<(), FieldError> {
    match form {
        PaymentForm::Card { cardholder_name, card } => {
            if cardholder_name.trim().is_empty() {
                return Err(FieldError::new(
                    FormField::CardholderName,
                    t!("checkout.fields.cardholder_name_required"),
                ));
            }
            if !validate_card_number(card.number()) {
                return Err(FieldError::new(
                    FormField::CardNumber,
                    t!("checkout.fields.card_number_invalid"),
                ));
            }
            let Some((month, year)) = parse_card_expiry(card.expiry()) else {
                return Err(FieldError::new(
                    FormField::CardExpiry,
                    t!("checkout.fields.card_expiry_invalid"),
                ));
            };
            if card_expired(month, year, today) {
                return Err(FieldError::new(FormField::CardExpiry, t!("checkout.fields.card_expired")));
            }
            if !validate_card_cvc(card.cvc()) {
                return Err(FieldError::new(FormField::CardCvc, t!("checkout.fields.card_cvc_invalid")));
            }
            Ok(())
        }
        PaymentForm::DelegatedWallet { account_email } => {
            if validate_email(account_email) {
                Ok(())
            } else {
                Err(FieldError::new(
                    FormField::WalletEmail,
                    t!("checkout.fields.wallet_email_invalid"),
                ))
            }
        }
        PaymentForm::MobileRedirect { phone_number } => {
            if validate_phone_number(phone_number) {
                Ok(())
            } else {
                Err(FieldError::new(
                    FormField::PhoneNumber,
                    t!("checkout.fields.phone_number_invalid"),
                ))
            }
        }
    }
}

pub fn promo_field_error(error: &PromoError) -> FieldError {
    let message = match error {
        PromoError::Empty => t!("checkout.fields.promo_code_required"),
        _ => t!("checkout.fields.promo_code_invalid"),
    };
    FieldError::new(FormField::PromoCode, message)
}
