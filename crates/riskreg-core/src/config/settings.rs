//! Login settings loaded from a TOML file.
//!
//! Every field has a default so the core runs against the EGAT directory
//! with the standard throttle when no file is given.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::auth::messages::Locale;
use crate::error::{AuthError, AuthResult};

/// Top-level authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default)]
    pub locale: Locale,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

impl AuthSettings {
    /// Loads settings from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Config`] if the file is missing or the TOML is malformed.
    /// - [`AuthError::Io`] for any other read failure.
    pub fn load(path: &Path) -> AuthResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AuthError::Config(format!("config file not found: {}", path.display()))
            }
            _ => AuthError::Io(e),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AuthResult<Self> {
        toml::from_str(content).map_err(|e| AuthError::Config(e.to_string()))
    }
}

/// Lockout policy for the login throttle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_decay_seconds")]
    pub decay_seconds: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            decay_seconds: default_decay_seconds(),
        }
    }
}

/// Which credential directory answers login requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectoryKind {
    #[default]
    Soap,
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub kind: DirectoryKind,
    /// Upper bound on one verification, whatever the directory.
    #[serde(default = "default_verify_timeout_secs")]
    pub verify_timeout_secs: u64,
    #[serde(default)]
    pub soap: SoapConfig,
    #[serde(default)]
    pub users: Vec<UserEntry>,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            kind: DirectoryKind::default(),
            verify_timeout_secs: default_verify_timeout_secs(),
            soap: SoapConfig::default(),
            users: Vec::new(),
        }
    }
}

/// Endpoint of the EGAT authentication web service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoapConfig {
    #[serde(default = "default_soap_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_soap_namespace")]
    pub namespace: String,
    #[serde(default = "default_soap_operation")]
    pub operation: String,
    #[serde(default = "default_soap_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SoapConfig {
    fn default() -> Self {
        Self {
            endpoint: default_soap_endpoint(),
            namespace: default_soap_namespace(),
            operation: default_soap_operation(),
            timeout_secs: default_soap_timeout_secs(),
        }
    }
}

/// One account of the static directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEntry {
    pub identity: String,
    pub password_hash: String,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_decay_seconds() -> u64 {
    60
}

fn default_verify_timeout_secs() -> u64 {
    15
}

fn default_soap_endpoint() -> String {
    "http://webservices.egat.co.th/authentication/au_provi.php".to_string()
}

fn default_soap_namespace() -> String {
    "urn:au_provi".to_string()
}

fn default_soap_operation() -> String {
    "validate_user".to_string()
}

fn default_soap_timeout_secs() -> u64 {
    10
}
