use crate::runtime::RuntimeError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid plan: {0}")]
    InvalidPlan(String),
    #[error("Card declined: {0}")]
    CardDeclined(String),
    #[error("Constraint violation: {0}")]
    Constraint(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Request cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            BackendError::Server(format!("unexpected response body: {}", error))
        } else {
            BackendError::Network(error.to_string())
        }
    }
}

impl From<RuntimeError> for BackendError {
    fn from(_: RuntimeError) -> Self {
        BackendError::Cancelled
    }
}
