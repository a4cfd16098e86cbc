//! Directory backed by Argon2 hashes from the configuration file.
//!
//! Used for offline and development deployments where the EGAT web service
//! is not reachable.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;

use super::{CredentialVerifier, VerifierError};
use crate::config::UserEntry;

#[derive(Debug, Clone)]
pub struct StaticDirectory {
    hashes: Arc<HashMap<String, String>>,
}

impl StaticDirectory {
    /// Builds the directory, rejecting entries whose hash does not parse.
    pub fn new(users: &[UserEntry]) -> Result<Self, VerifierError> {
        let mut hashes = HashMap::with_capacity(users.len());
        for user in users {
            PasswordHash::new(&user.password_hash).map_err(|e| {
                VerifierError::Config(format!("invalid password hash for {}: {e}", user.identity))
            })?;
            hashes.insert(user.identity.clone(), user.password_hash.clone());
        }
        Ok(Self {
            hashes: Arc::new(hashes),
        })
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for StaticDirectory {
    async fn verify(&self, identity: &str, secret: &str) -> Result<bool, VerifierError> {
        let Some(hash) = self.hashes.get(identity).cloned() else {
            return Ok(false);
        };
        let secret = secret.to_string();

        // Argon2 verification is CPU-bound.
        tokio::task::spawn_blocking(move || verify_password(&hash, &secret))
            .await
            .map_err(|e| VerifierError::Transport(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

pub fn verify_password(hash: &str, password: &str) -> Result<bool, VerifierError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| VerifierError::Config(format!("invalid password hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn hash_password(password: &str) -> Result<String, VerifierError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| VerifierError::Config(format!("failed to hash password: {e}")))?;

    Ok(hash.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(identity: &str, password: &str) -> UserEntry {
        UserEntry {
            identity: identity.to_string(),
            password_hash: hash_password(password).unwrap(),
        }
    }

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("secret1").unwrap();
        assert!(verify_password(&hash, "secret1").unwrap());
        assert!(!verify_password(&hash, "secret2").unwrap());
    }

    #[test]
    fn invalid_hash_is_rejected_up_front() {
        let users = vec![UserEntry {
            identity: "123456".into(),
            password_hash: "not-a-hash".into(),
        }];
        let err = StaticDirectory::new(&users).unwrap_err();
        assert!(matches!(err, VerifierError::Config(_)));
    }

    #[tokio::test]
    async fn verifies_configured_users() {
        let dir = StaticDirectory::new(&[entry("123456", "secret1"), entry("654321", "secret2")])
            .unwrap();
        assert_eq!(dir.len(), 2);
        assert!(dir.verify("123456", "secret1").await.unwrap());
        assert!(!dir.verify("123456", "secret2").await.unwrap());
        assert!(!dir.verify("111111", "secret1").await.unwrap());
    }
}
