//! Error types for `riskreg-core`.
//!
//! Every stage of a login attempt that can short-circuit returns an
//! [`AuthError`]; [`AuthResult<T>`] is the matching result alias.

use crate::auth::validation::FieldErrors;

/// Unified error type for the authentication core.
///
/// The variants map one-to-one onto the ways a login request can be
/// rejected, plus the configuration and I/O failures of the library itself.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The submitted identity or secret is malformed.
    #[error("invalid login fields: {0}")]
    FieldValidation(FieldErrors),

    /// The throttle key is locked out. Both values derive from one seconds count.
    #[error("too many login attempts, retry in {seconds} seconds")]
    Throttled { seconds: u64, minutes: u64 },

    /// The credential directory rejected the identity/secret pair.
    #[error("credentials rejected")]
    CredentialRejected,

    /// The credential directory could not be reached or answered garbage.
    #[error("external service error: {0}")]
    ExternalService(String),

    /// Failed to read or parse a configuration file.
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<crate::directory::VerifierError> for AuthError {
    fn from(e: crate::directory::VerifierError) -> Self {
        AuthError::ExternalService(e.to_string())
    }
}

/// Convenience alias used throughout `riskreg-core`.
pub type AuthResult<T> = Result<T, AuthError>;
