//! Shared application state

use std::sync::Arc;

use authgate_shared::{OAuthStateStore, UserStore};

use crate::{
    auth::{AuthFlows, JwtManager, OAuthClient, OAuthError},
    config::Config,
};

/// Immutable state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub users: Arc<dyn UserStore>,
    pub flows: Arc<AuthFlows>,
}

impl AppState {
    /// Wire the auth components from configuration and the injected stores
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        oauth_states: Arc<dyn OAuthStateStore>,
    ) -> Result<Self, OAuthError> {
        let jwt = JwtManager::new(&config.jwt_secret, config.jwt_expiry_hours);
        let oauth = OAuthClient::new(config.oauth.clone())?;
        let flows = AuthFlows::new(users.clone(), oauth_states, jwt, oauth);

        Ok(Self {
            config: Arc::new(config),
            users,
            flows: Arc::new(flows),
        })
    }
}
