//! The login flow: field checks, throttling and directory verification.
//!
//! A request moves through
//! `Received → FieldValidated → RateChecked → CredentialVerified → Authenticated`
//! and may drop to `Rejected` at any stage. Field and throttle rejections
//! are decided locally; the directory is only contacted once both pass.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::messages::Locale;
use super::throttle::{minutes_for_display, throttle_key, RateLimiter};
use super::validation::LoginForm;
use crate::config::AuthSettings;
use crate::directory::{CredentialVerifier, VerifierError};
use crate::error::{AuthError, AuthResult};
use crate::event::{AuthEvent, EventBus};

/// Where a login request currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStage {
    Received,
    FieldValidated,
    RateChecked,
    CredentialVerified,
    Authenticated,
    Rejected,
}

impl fmt::Display for LoginStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoginStage::Received => "received",
            LoginStage::FieldValidated => "field_validated",
            LoginStage::RateChecked => "rate_checked",
            LoginStage::CredentialVerified => "credential_verified",
            LoginStage::Authenticated => "authenticated",
            LoginStage::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Outcome of a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated {
    pub identity: String,
}

/// Drives login attempts against one credential directory and one throttle store.
pub struct LoginService {
    verifier: Arc<dyn CredentialVerifier>,
    limiter: Arc<RateLimiter>,
    events: EventBus,
    max_attempts: u32,
    verify_timeout: Duration,
}

impl LoginService {
    pub fn new(verifier: Arc<dyn CredentialVerifier>, settings: &AuthSettings) -> Self {
        let limiter = Arc::new(RateLimiter::new(Duration::from_secs(
            settings.throttle.decay_seconds,
        )));
        Self {
            verifier,
            limiter,
            events: EventBus::default(),
            max_attempts: settings.throttle.max_attempts.max(1),
            verify_timeout: Duration::from_secs(settings.directory.verify_timeout_secs.max(1)),
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    /// Fails with [`AuthError::Throttled`] if `key` is locked out. Never increments.
    pub fn ensure_not_rate_limited(&self, key: &str) -> AuthResult<()> {
        if !self.limiter.too_many_attempts(key, self.max_attempts) {
            return Ok(());
        }

        Err(self.locked_out(key, self.limiter.available_in(key)))
    }

    fn locked_out(&self, key: &str, seconds: u64) -> AuthError {
        tracing::warn!("Login locked out for {key} ({seconds}s remaining)");
        self.events.publish(AuthEvent::Lockout {
            key: key.to_string(),
            retry_after_secs: seconds,
        });
        AuthError::Throttled {
            seconds,
            minutes: minutes_for_display(seconds),
        }
    }

    pub fn record_failed_attempt(&self, key: &str) {
        self.limiter.hit(key);
    }

    pub fn clear_rate_limit(&self, key: &str) {
        self.limiter.clear(key);
    }

    /// Runs one login attempt from `client_addr`.
    ///
    /// The attempt is counted before the directory is asked, so concurrent
    /// requests for one key never get more than `max_attempts` verifications
    /// per window. Success clears the counter; a directory fault hands the
    /// attempt back.
    pub async fn attempt(
        &self,
        form: &LoginForm,
        client_addr: &str,
        locale: Locale,
    ) -> AuthResult<Authenticated> {
        let mut stage = LoginStage::Received;

        let creds = form.validate(locale).map_err(|errors| {
            tracing::debug!("Login {stage} -> {}: {errors}", LoginStage::Rejected);
            AuthError::FieldValidation(errors)
        })?;
        stage = advance(stage, LoginStage::FieldValidated);

        let key = throttle_key(&creds.identity, client_addr);
        let attempts = self
            .limiter
            .try_acquire(&key, self.max_attempts)
            .map_err(|seconds| self.locked_out(&key, seconds))?;
        stage = advance(stage, LoginStage::RateChecked);

        let verdict = match tokio::time::timeout(
            self.verify_timeout,
            self.verifier.verify(&creds.identity, &creds.secret),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(VerifierError::Timeout(self.verify_timeout.as_secs())),
        };

        let valid = verdict.map_err(|e| {
            self.limiter.release(&key);
            tracing::error!(
                "Directory '{}' failed for {}: {e}",
                self.verifier.name(),
                creds.identity
            );
            AuthError::from(e)
        })?;
        stage = advance(stage, LoginStage::CredentialVerified);

        if !valid {
            tracing::warn!(
                "Failed login attempt for {} from {client_addr} ({attempts}/{})",
                creds.identity,
                self.max_attempts
            );
            self.events.publish(AuthEvent::Failed {
                identity: creds.identity,
                client_addr: client_addr.to_string(),
                attempts,
            });
            advance(stage, LoginStage::Rejected);
            return Err(AuthError::CredentialRejected);
        }

        self.clear_rate_limit(&key);
        advance(stage, LoginStage::Authenticated);
        tracing::info!("Login succeeded for {} from {client_addr}", creds.identity);
        self.events.publish(AuthEvent::Authenticated {
            identity: creds.identity.clone(),
            client_addr: client_addr.to_string(),
        });

        Ok(Authenticated {
            identity: creds.identity,
        })
    }
}

fn advance(from: LoginStage, to: LoginStage) -> LoginStage {
    tracing::debug!("Login {from} -> {to}");
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::directory::InMemoryDirectory;

    const IP: &str = "192.168.1.10";

    /// Wraps a directory and counts how often it is asked.
    struct Counting {
        inner: InMemoryDirectory,
        calls: AtomicUsize,
    }

    impl Counting {
        fn new(entries: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryDirectory::with_entries(entries.iter().copied()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CredentialVerifier for Counting {
        async fn verify(&self, identity: &str, secret: &str) -> Result<bool, VerifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.verify(identity, secret).await
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct Unreachable;

    #[async_trait]
    impl CredentialVerifier for Unreachable {
        async fn verify(&self, _: &str, _: &str) -> Result<bool, VerifierError> {
            Err(VerifierError::Transport("connection refused".into()))
        }

        fn name(&self) -> &'static str {
            "unreachable"
        }
    }

    struct Hanging;

    #[async_trait]
    impl CredentialVerifier for Hanging {
        async fn verify(&self, _: &str, _: &str) -> Result<bool, VerifierError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        }

        fn name(&self) -> &'static str {
            "hanging"
        }
    }

    /// Rejects everything after a delay, counting calls.
    struct SlowReject {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CredentialVerifier for SlowReject {
        async fn verify(&self, _: &str, _: &str) -> Result<bool, VerifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(false)
        }

        fn name(&self) -> &'static str {
            "slow-reject"
        }
    }

    fn service(verifier: Arc<dyn CredentialVerifier>) -> LoginService {
        LoginService::new(verifier, &AuthSettings::default())
    }

    async fn login(svc: &LoginService, identity: &str, secret: &str) -> AuthResult<Authenticated> {
        svc.attempt(&LoginForm::new(identity, secret), IP, Locale::En)
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn matching_pair_authenticates_and_clears_counter() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());
        let key = throttle_key("123456", IP);

        svc.record_failed_attempt(&key);
        let result = login(&svc, "123456", "secret1").await.unwrap();

        assert_eq!(result.identity, "123456");
        assert_eq!(svc.limiter().attempts(&key), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wrong_secret_is_rejected_and_counted() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());

        let err = login(&svc, "123456", "wrong-secret").await.unwrap_err();

        assert!(matches!(err, AuthError::CredentialRejected));
        assert_eq!(svc.limiter().attempts(&throttle_key("123456", IP)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_identity_never_reaches_directory() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());

        let err = login(&svc, "12345", "secret1").await.unwrap_err();

        match err {
            AuthError::FieldValidation(errors) => {
                assert!(errors.get(crate::auth::validation::Field::Identity).is_some());
            }
            other => panic!("expected field validation, got {other:?}"),
        }
        assert_eq!(dir.calls(), 0);
        assert!(svc.limiter().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_attempt_is_throttled_without_directory_call() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());

        for _ in 0..5 {
            let err = login(&svc, "123456", "wrong-secret").await.unwrap_err();
            assert!(matches!(err, AuthError::CredentialRejected));
        }
        assert_eq!(dir.calls(), 5);

        // Correct credentials do not bypass a lockout.
        let err = login(&svc, "123456", "secret1").await.unwrap_err();
        match err {
            AuthError::Throttled { seconds, minutes } => {
                assert_eq!(seconds, 60);
                assert_eq!(minutes, 1);
            }
            other => panic!("expected throttle, got {other:?}"),
        }
        assert_eq!(dir.calls(), 5);
        assert_eq!(svc.limiter().attempts(&throttle_key("123456", IP)), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn lockout_lifts_after_decay_window() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());

        for _ in 0..5 {
            let _ = login(&svc, "123456", "wrong-secret").await;
        }
        assert!(matches!(
            login(&svc, "123456", "secret1").await,
            Err(AuthError::Throttled { .. })
        ));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(login(&svc, "123456", "secret1").await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn success_resets_budget() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());

        for _ in 0..4 {
            let _ = login(&svc, "123456", "wrong-secret").await;
        }
        login(&svc, "123456", "secret1").await.unwrap();

        for _ in 0..5 {
            let err = login(&svc, "123456", "wrong-secret").await.unwrap_err();
            assert!(matches!(err, AuthError::CredentialRejected));
        }
        assert!(matches!(
            login(&svc, "123456", "wrong-secret").await,
            Err(AuthError::Throttled { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn other_addresses_are_unaffected_by_lockout() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());

        for _ in 0..5 {
            let _ = login(&svc, "123456", "wrong-secret").await;
        }
        let ok = svc
            .attempt(&LoginForm::new("123456", "secret1"), "10.9.9.9", Locale::En)
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn directory_fault_is_external_and_not_counted() {
        let svc = service(Arc::new(Unreachable));

        let err = login(&svc, "123456", "secret1").await.unwrap_err();

        assert!(matches!(err, AuthError::ExternalService(_)));
        assert_eq!(svc.limiter().attempts(&throttle_key("123456", IP)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn directory_fault_does_not_consume_earlier_attempts() {
        let svc = service(Arc::new(Unreachable));
        let key = throttle_key("123456", IP);
        svc.record_failed_attempt(&key);
        svc.record_failed_attempt(&key);

        let _ = login(&svc, "123456", "secret1").await;
        assert_eq!(svc.limiter().attempts(&key), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_attempts_cannot_exceed_lockout_threshold() {
        let verifier = Arc::new(SlowReject {
            calls: AtomicUsize::new(0),
        });
        let svc = Arc::new(service(verifier.clone()));

        let mut handles = Vec::new();
        for _ in 0..20 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.attempt(&LoginForm::new("123456", "wrong-secret"), "1.2.3.4", Locale::En)
                    .await
            }));
        }

        let (mut rejected, mut throttled) = (0, 0);
        for h in handles {
            match h.await.unwrap() {
                Err(AuthError::CredentialRejected) => rejected += 1,
                Err(AuthError::Throttled { .. }) => throttled += 1,
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(rejected, 5);
        assert_eq!(throttled, 15);
        assert_eq!(verifier.calls.load(Ordering::SeqCst), 5);
        assert_eq!(svc.limiter().attempts(&throttle_key("123456", "1.2.3.4")), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_directory_times_out_as_external_error() {
        let svc = service(Arc::new(Hanging));

        let err = login(&svc, "123456", "secret1").await.unwrap_err();

        match err {
            AuthError::ExternalService(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected external service error, got {other:?}"),
        }
        assert_eq!(svc.limiter().attempts(&throttle_key("123456", IP)), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn clear_twice_leaves_zero() {
        let svc = service(Counting::new(&[]));
        let key = throttle_key("123456", IP);

        svc.record_failed_attempt(&key);
        svc.clear_rate_limit(&key);
        assert_eq!(svc.limiter().attempts(&key), 0);
        svc.clear_rate_limit(&key);
        assert_eq!(svc.limiter().attempts(&key), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn check_alone_does_not_increment() {
        let svc = service(Counting::new(&[]));
        let key = throttle_key("123456", IP);

        for _ in 0..10 {
            svc.ensure_not_rate_limited(&key).unwrap();
        }
        assert_eq!(svc.limiter().attempts(&key), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn events_are_published() {
        let dir = Counting::new(&[("123456", "secret1")]);
        let svc = service(dir.clone());
        let mut rx = svc.subscribe();

        let _ = login(&svc, "123456", "wrong-secret").await;
        login(&svc, "123456", "secret1").await.unwrap();
        for _ in 0..5 {
            let _ = login(&svc, "123456", "wrong-secret").await;
        }
        let _ = login(&svc, "123456", "wrong-secret").await;

        assert!(matches!(rx.recv().await.unwrap(), AuthEvent::Failed { attempts: 1, .. }));
        assert!(matches!(rx.recv().await.unwrap(), AuthEvent::Authenticated { .. }));
        for n in 1..=5 {
            match rx.recv().await.unwrap() {
                AuthEvent::Failed { attempts, .. } => assert_eq!(attempts, n),
                other => panic!("unexpected event {other:?}"),
            }
        }
        match rx.recv().await.unwrap() {
            AuthEvent::Lockout { key, retry_after_secs } => {
                assert_eq!(key, throttle_key("123456", IP));
                assert_eq!(retry_after_secs, 60);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn custom_policy_is_honoured() {
        let mut settings = AuthSettings::default();
        settings.throttle.max_attempts = 2;
        settings.throttle.decay_seconds = 300;
        let svc = LoginService::new(Counting::new(&[("123456", "secret1")]), &settings);

        let _ = login(&svc, "123456", "wrong-secret").await;
        let _ = login(&svc, "123456", "wrong-secret").await;
        match login(&svc, "123456", "secret1").await {
            Err(AuthError::Throttled { seconds, minutes }) => {
                assert_eq!(seconds, 300);
                assert_eq!(minutes, 5);
            }
            other => panic!("expected throttle, got {other:?}"),
        }
    }

    #[test]
    fn stage_display() {
        assert_eq!(LoginStage::RateChecked.to_string(), "rate_checked");
        assert_eq!(LoginStage::Rejected.to_string(), "rejected");
    }
}
