use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::config::SecretSource;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub display_name: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            display_name: None,
        }
    }
}

/// Supplies the signed-in user. Checkout refuses to start without one.
#[async_trait]
pub trait AuthContext: Send + Sync {
    async fn current_user(&self) -> Option<AuthenticatedUser>;
}

/// An auth context holding a single user slot, set on sign-in and cleared on sign-out.
#[derive(Debug, Default)]
pub struct StaticAuthContext {
    user: RwLock<Option<AuthenticatedUser>>,
}

impl StaticAuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: AuthenticatedUser) -> Self {
        Self {
            user: RwLock::new(Some(user)),
        }
    }

    /// Builds the context from `VOXSHIFT_USER_ID` / `VOXSHIFT_USER_EMAIL`; anonymous when either is absent.
    pub fn from_secrets(source: &impl SecretSource) -> Self {
        match (source.get("VOXSHIFT_USER_ID"), source.get("VOXSHIFT_USER_EMAIL")) {
            (Some(id), Some(email)) => Self::signed_in(AuthenticatedUser::new(id, email)),
            _ => Self::anonymous(),
        }
    }

    pub async fn sign_in(&self, user: AuthenticatedUser) {
        *self.user.write().await = Some(user);
    }

    pub async fn sign_out(&self) {
        *self.user.write().await = None;
    }
}

#[async_trait]
impl AuthContext for StaticAuthContext {
    async fn current_user(&self) -> Option<AuthenticatedUser> {
        self.user.read().await.clone()
    }
}
