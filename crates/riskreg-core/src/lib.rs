//! RiskReg authentication core.
//!
//! `riskreg-core` holds everything needed to decide a login for the risk
//! register: it is independent of the HTTP layer so the web server and any
//! future admin tooling share one implementation.
//!
//! # Modules
//!
//! - [`auth`] — Login pipeline: field validation, throttling, the [`LoginService`] flow.
//! - [`directory`] — Credential directories behind the [`CredentialVerifier`] capability.
//! - [`config`] — TOML-based settings ([`AuthSettings`]).
//! - [`event`] — [`AuthEvent`] broadcast for audit subscribers.
//! - [`error`] — Unified error type ([`AuthError`]) and result alias ([`AuthResult`]).

pub mod auth;
pub mod config;
pub mod directory;
pub mod error;
pub mod event;

pub use auth::{
    throttle_key, Authenticated, Credentials, Field, FieldErrors, Locale, LoginForm, LoginService,
    LoginStage, RateLimiter,
};
pub use config::AuthSettings;
pub use directory::{
    build_verifier, CredentialVerifier, InMemoryDirectory, SoapVerifier, StaticDirectory,
    VerifierError,
};
pub use error::{AuthError, AuthResult};
pub use event::{AuthEvent, EventBus};
