use std::sync::Arc;

use checkout::{CheckoutDeps, CheckoutService};

use crate::{config::AppConfig, context::AuthContext, utils::http::HttpClientError};

pub mod backend;
pub mod catalog;
pub mod checkout;
mod error;
pub mod gateway;
pub mod pricing;
pub mod promo;

pub use error::ServiceError;

use backend::{HttpSubscriptionBackend, SubscriptionBackend};
use catalog::PlanCatalog;
use gateway::{HttpPaymentGateway, PaymentGateway};

#[derive(Clone)]
pub struct ServiceRegistry {
    pub catalog: Arc<PlanCatalog>,
    pub checkout: CheckoutService,
}

impl ServiceRegistry {
    /// Wires the HTTP collaborators described by `config`.
    pub fn new(config: &AppConfig, auth: Arc<dyn AuthContext>) -> Result<Self, HttpClientError> {
        info!("Initializing service registry");

        let backend: Arc<dyn SubscriptionBackend> = Arc::new(HttpSubscriptionBackend::new(&config.backend)?);
        let gateway: Arc<dyn PaymentGateway> = Arc::new(HttpPaymentGateway::new(&config.gateway)?);

        let registry = Self::with_deps(CheckoutDeps { backend, gateway, auth }, config);

        info!("Service registry initialized");

        Ok(registry)
    }

    pub fn with_deps(deps: CheckoutDeps, config: &AppConfig) -> Self {
        let catalog = Arc::new(PlanCatalog::standard());
        let checkout = CheckoutService::new(deps, Arc::clone(&catalog), config.checkout.clone());

        Self { catalog, checkout }
    }
}
