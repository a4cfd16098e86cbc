use std::sync::Arc;

use riskreg_core::LoginService;

use crate::auth::session::RevokedSessions;
use crate::config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub login: Arc<LoginService>,
    /// Session tokens ended by logout. Tokens in this map are rejected by the auth extractor.
    pub revoked_sessions: Arc<RevokedSessions>,
}

impl AppState {
    pub fn new(config: ServerConfig, login: LoginService) -> Self {
        Self {
            config: Arc::new(config),
            login: Arc::new(login),
            revoked_sessions: Arc::new(RevokedSessions::new()),
        }
    }
}
