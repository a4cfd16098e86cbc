use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Session tokens revoked by logout, remembered until they would have expired anyway.
#[derive(Debug, Default)]
pub struct RevokedSessions {
    revoked: DashMap<String, u64>,
}

impl RevokedSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Revokes the token with id `jti`, valid until `expires_at` (unix seconds).
    pub fn revoke(&self, jti: String, expires_at: u64) {
        tracing::debug!("Session revoked: jti={jti}");
        self.revoked.insert(jti, expires_at);
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }

    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    /// Forgets revocations whose token has expired on its own.
    pub fn cleanup_expired(&self) {
        let now = unix_now();
        self.revoked.retain(|_, expires_at| *expires_at > now);
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
