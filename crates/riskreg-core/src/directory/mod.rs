//! Credential directories: the systems of record that decide whether an
//! identity/secret pair is valid.
//!
//! The login flow only ever talks to a directory through
//! [`CredentialVerifier`]. Three implementations ship with the crate:
//!
//! - [`soap::SoapVerifier`] — the live EGAT authentication web service.
//! - [`memory::InMemoryDirectory`] — a mutable in-memory map for tests and demos.
//! - [`static_dir::StaticDirectory`] — Argon2 hashes listed in the config file.

pub mod memory;
pub mod soap;
pub mod static_dir;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{DirectoryConfig, DirectoryKind};

pub use memory::InMemoryDirectory;
pub use soap::SoapVerifier;
pub use static_dir::StaticDirectory;

/// Faults on the directory side. None of these mean "wrong password".
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("directory request timed out after {0}s")]
    Timeout(u64),

    #[error("directory unreachable: {0}")]
    Transport(String),

    #[error("directory returned HTTP {0}")]
    Status(u16),

    #[error("directory fault: {0}")]
    Fault(String),

    #[error("malformed directory response: {0}")]
    Malformed(String),

    #[error("directory misconfigured: {0}")]
    Config(String),
}

/// Capability to check an identity/secret pair against a credential directory.
///
/// Implementations do their own retrying, if any. `Ok(false)` means the
/// directory answered and said no; every other failure is an `Err`.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, identity: &str, secret: &str) -> Result<bool, VerifierError>;

    /// Short label for logs.
    fn name(&self) -> &'static str;
}

/// Builds the directory selected by `config`.
pub fn build_verifier(config: &DirectoryConfig) -> Result<Arc<dyn CredentialVerifier>, VerifierError> {
    let verifier: Arc<dyn CredentialVerifier> = match config.kind {
        DirectoryKind::Soap => {
            tracing::info!("Using SOAP directory at {}", config.soap.endpoint);
            Arc::new(SoapVerifier::new(&config.soap)?)
        }
        DirectoryKind::Static => {
            if config.users.is_empty() {
                return Err(VerifierError::Config(
                    "static directory selected but no users configured".to_string(),
                ));
            }
            tracing::info!("Using static directory with {} users", config.users.len());
            Arc::new(StaticDirectory::new(&config.users)?)
        }
    };
    Ok(verifier)
}

/// Constant-time byte comparison so secret checks leak no prefix length.
pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
