use crate::runtime::RuntimeError;

/// Card problems reported by the gateway. None of them results in a charge.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CardError {
    #[error("invalid card number")]
    InvalidNumber,
    #[error("card expired")]
    Expired,
    #[error("card details incomplete")]
    Incomplete,
    #[error("invalid security code")]
    InvalidCvc,
    #[error("card declined{}", .decline_code.as_ref().map(|c| format!(" ({})", c)).unwrap_or_default())]
    Declined { decline_code: Option<String> },
    #[error("card requires authentication")]
    AuthenticationRequired,
    #[error("card could not be processed: {0}")]
    Processing(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("Card error: {0}")]
    Card(#[from] CardError),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Gateway error: {0}")]
    Other(String),
    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for GatewayError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            GatewayError::Other(format!("unexpected response body: {}", error))
        } else {
            GatewayError::Network(error.to_string())
        }
    }
}

impl From<RuntimeError> for GatewayError {
    fn from(_: RuntimeError) -> Self {
        GatewayError::Cancelled
    }
}
