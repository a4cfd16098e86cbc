//! In-memory credential directory.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{constant_time_eq, CredentialVerifier, VerifierError};

/// A directory held in a concurrent map, editable while shared.
///
/// Stands in for the remote service in tests so scenarios can be built
/// deterministically: add users, remove some, clear everything.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: DashMap<String, String>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a directory from `(identity, secret)` pairs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let dir = Self::new();
        for (identity, secret) in entries {
            dir.add(identity, secret);
        }
        dir
    }

    /// Adds or replaces the secret for `identity`.
    pub fn add(&self, identity: impl Into<String>, secret: impl Into<String>) {
        self.entries.insert(identity.into(), secret.into());
    }

    /// Removes `identity`. Returns `true` if it was present.
    pub fn remove(&self, identity: &str) -> bool {
        self.entries.remove(identity).is_some()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CredentialVerifier for InMemoryDirectory {
    async fn verify(&self, identity: &str, secret: &str) -> Result<bool, VerifierError> {
        Ok(self
            .entries
            .get(identity)
            .is_some_and(|expected| constant_time_eq(expected.as_bytes(), secret.as_bytes())))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
