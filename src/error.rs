use crate::{
    config::ConfigError,
    service::{catalog::CatalogError, checkout::CheckoutError, ServiceError},
    utils::http::HttpClientError,
};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] HttpClientError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Other(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        AppError::Other(error)
    }
}

impl From<CheckoutError> for AppError {
    fn from(error: CheckoutError) -> Self {
        AppError::Service(ServiceError::Checkout(error))
    }
}

impl From<CatalogError> for AppError {
    fn from(error: CatalogError) -> Self {
        AppError::Service(ServiceError::Catalog(error))
    }
}

pub type AppResult<T> = Result<T, AppError>;
