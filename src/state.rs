use std::sync::Arc;

use crate::{config::AppConfig, context::AuthContext, error::AppResult, service::ServiceRegistry};

/// Everything a running process needs, built once from explicit configuration.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: ServiceRegistry,
}

impl AppState {
    pub fn new(config: AppConfig, auth: Arc<dyn AuthContext>) -> AppResult<Self> {
        info!("Initializing AppState...");

        let services = ServiceRegistry::new(&config, auth)?;

        info!("AppState initialized");

        Ok(Self {
            config: Arc::new(config),
            services,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{build_config, MapSecrets},
        context::{AuthenticatedUser, StaticAuthContext},
    };

    #[tokio::test]
    async fn test_state_wires_checkout() {
        let secrets = MapSecrets::new()
            .with("VOXSHIFT_BACKEND_URL", "http://127.0.0.1:9/api")
            .with("VOXSHIFT_BACKEND_API_KEY", "backend-key")
            .with("VOXSHIFT_GATEWAY_URL", "http://127.0.0.1:9/gateway")
            .with("VOXSHIFT_GATEWAY_PUBLISHABLE_KEY", "pk_test_123");
        let config = build_config(&secrets).unwrap();
        let auth = Arc::new(StaticAuthContext::signed_in(AuthenticatedUser::new("user_1", "ada@voxshift.io")));

        let state = AppState::new(config, auth).unwrap();

        assert_eq!(state.services.catalog.plans().len(), 3);
        assert_eq!(state.services.checkout.active_sessions(), 0);
        assert!(state.services.checkout.config().test_mode);
    }
}
