use std::net::SocketAddr;
use std::path::PathBuf;

use riskreg_core::config::{AuthSettings, DirectoryKind};
use riskreg_core::Locale;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: SocketAddr,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub login: AuthSettings,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub tls: TlsConfig,
    /// Take the client address from `X-Forwarded-For` (only behind a trusted proxy).
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: u64,
}

/// Coarse per-IP request limit on the auth routes, in front of the login throttle.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_login_rpm")]
    pub login_requests_per_minute: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_ttl_hours: default_jwt_ttl_hours(),
        }
    }
}

fn default_jwt_ttl_hours() -> u64 { 8 }
fn default_login_rpm() -> u32 { 30 }

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { login_requests_per_minute: default_login_rpm() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TlsConfig {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8080))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            session: SessionConfig::default(),
            login: AuthSettings::default(),
            rate_limit: RateLimitConfig::default(),
            tls: TlsConfig::default(),
            trust_forwarded_for: false,
        }
    }
}

const WEAK_SECRETS: &[&str] = &[
    "change-me-to-a-random-secret",
    "secret",
    "password",
    "jwt-secret",
];

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = std::env::var("RISKREG_CONFIG").map(PathBuf::from).ok();

        let mut config = match config_path {
            Some(path) => {
                let contents = std::fs::read_to_string(&path)?;
                Self::from_toml(&contents)?
            }
            None => ServerConfig::default(),
        };

        config.apply_env();
        config.finalize()?;
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env(&mut self) {
        if let Ok(secret) = std::env::var("RISKREG_JWT_SECRET") {
            self.session.jwt_secret = secret;
        }
        if let Ok(addr) = std::env::var("RISKREG_BIND_ADDR") {
            match addr.parse() {
                Ok(addr) => self.bind_addr = addr,
                Err(e) => tracing::warn!("Ignoring RISKREG_BIND_ADDR={addr}: {e}"),
            }
        }
        if let Ok(endpoint) = std::env::var("RISKREG_SOAP_ENDPOINT") {
            self.login.directory.soap.endpoint = endpoint;
            self.login.directory.kind = DirectoryKind::Soap;
        }
        if let Ok(val) = std::env::var("RISKREG_SOAP_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse::<u64>() {
                self.login.directory.soap.timeout_secs = secs;
            }
        }
        if let Ok(tag) = std::env::var("RISKREG_LOCALE") {
            self.login.locale = Locale::from_tag(&tag);
        }
        if let Ok(cert) = std::env::var("RISKREG_TLS_CERT") {
            self.tls.cert_path = Some(cert);
        }
        if let Ok(key) = std::env::var("RISKREG_TLS_KEY") {
            self.tls.key_path = Some(key);
        }
    }

    /// Fills in a session secret if none was given and rejects placeholder secrets.
    pub fn finalize(&mut self) -> anyhow::Result<()> {
        if self.session.jwt_secret.is_empty() {
            self.session.jwt_secret = uuid::Uuid::new_v4().to_string();
            tracing::warn!(
                "No JWT secret configured. Generated random secret (sessions end on restart)."
            );
        }

        if WEAK_SECRETS.iter().any(|&w| self.session.jwt_secret == w) {
            anyhow::bail!(
                "JWT secret matches a known weak/placeholder value. \
                 Set a strong random secret via RISKREG_JWT_SECRET environment variable."
            );
        }
        if self.session.jwt_secret.len() < 32 {
            tracing::warn!(
                "JWT secret is shorter than 32 characters. \
                 Consider using a stronger secret via RISKREG_JWT_SECRET."
            );
        }

        if self.login.directory.soap.timeout_secs >= self.login.directory.verify_timeout_secs {
            tracing::warn!(
                "SOAP timeout ({}s) is not below the verification timeout ({}s)",
                self.login.directory.soap.timeout_secs,
                self.login.directory.verify_timeout_secs
            );
        }

        Ok(())
    }

    pub fn tls_enabled(&self) -> bool {
        self.tls.cert_path.is_some() && self.tls.key_path.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.session.jwt_ttl_hours, 8);
        assert_eq!(config.rate_limit.login_requests_per_minute, 30);
        assert_eq!(config.login.throttle.max_attempts, 5);
        assert!(!config.tls_enabled());
        assert!(!config.trust_forwarded_for);
    }

    #[test]
    fn parses_nested_login_settings() {
        let config = ServerConfig::from_toml(
            r#"
bind_addr = "127.0.0.1:9000"
trust_forwarded_for = true

[session]
jwt_secret = "0123456789abcdef0123456789abcdef"

[login]
locale = "th"

[login.throttle]
max_attempts = 3

[login.directory.soap]
endpoint = "https://directory.example/auth"
"#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert!(config.trust_forwarded_for);
        assert_eq!(config.login.locale, Locale::Th);
        assert_eq!(config.login.throttle.max_attempts, 3);
        assert_eq!(config.login.throttle.decay_seconds, 60);
        assert_eq!(
            config.login.directory.soap.endpoint,
            "https://directory.example/auth"
        );
    }

    #[test]
    fn empty_secret_is_generated() {
        let mut config = ServerConfig::default();
        config.finalize().unwrap();
        assert!(!config.session.jwt_secret.is_empty());
    }

    #[test]
    fn weak_secret_is_rejected() {
        let mut config = ServerConfig::default();
        config.session.jwt_secret = "secret".to_string();
        assert!(config.finalize().is_err());
    }

    #[test]
    fn parses_config_file_contents() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("riskreg.toml");
        std::fs::write(&path, "[login.throttle]\ndecay_seconds = 90\n").unwrap();

        let config = ServerConfig::from_toml(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(config.login.throttle.decay_seconds, 90);
    }
}
