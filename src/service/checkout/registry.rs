use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use super::{CheckoutController, CheckoutDeps, CheckoutError};
use crate::{
    config::CheckoutConfig,
    service::catalog::{BillingPeriod, Order, PlanCatalog},
};

/// Opens checkout sessions and keeps the live ones addressable by id.
#[derive(Clone)]
pub struct CheckoutService {
    deps: CheckoutDeps,
    catalog: Arc<PlanCatalog>,
    config: CheckoutConfig,
    sessions: Arc<DashMap<Uuid, Arc<CheckoutController>>>,
}

impl CheckoutService {
    pub fn new(deps: CheckoutDeps, catalog: Arc<PlanCatalog>, config: CheckoutConfig) -> Self {
        info!("Initializing checkout service");

        Self {
            deps,
            catalog,
            config,
            sessions: Arc::new(DashMap::new()),
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &CheckoutConfig {
        &self.config
    }

    pub async fn open_session(
        &self,
        plan_id: &str,
        period: BillingPeriod,
    ) -> Result<Arc<CheckoutController>, CheckoutError> {
        let order = self.catalog.order(plan_id, period)?;
        self.open_order(order).await
    }

    pub async fn open_order(&self, order: Order) -> Result<Arc<CheckoutController>, CheckoutError> {
        let controller = CheckoutController::open(order, &self.deps, self.config.clone()).await?;
        self.sessions.insert(controller.id(), Arc::clone(&controller));
        debug!("{} checkout sessions active", self.sessions.len());
        Ok(controller)
    }

    pub fn session(&self, id: Uuid) -> Option<Arc<CheckoutController>> {
        self.sessions.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    /// Removes and tears down a session. Returns false for an unknown id.
    pub fn close_session(&self, id: Uuid) -> bool {
        match self.sessions.remove(&id) {
            Some((_, controller)) => {
                controller.close();
                true
            }
            None => false,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn close_all(&self) {
        let ids: Vec<Uuid> = self.sessions.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            self.close_session(id);
        }
        info!("All checkout sessions closed");
    }
}
