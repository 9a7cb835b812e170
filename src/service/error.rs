use super::{
    backend::BackendError, catalog::CatalogError, checkout::CheckoutError, gateway::GatewayError, promo::PromoError,
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("Promo error: {0}")]
    Promo(#[from] PromoError),
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}
