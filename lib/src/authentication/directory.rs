use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use async_trait::async_trait;
use serde::Deserialize;
use crate::authentication::{self, Authenticator, Credentials, Verdict};
use crate::{log_id, log_utils, metrics};


/// RAII handle around one in-flight directory validation.
///
/// Released on every exit path of the validation call, including timeout and
/// panic unwinding, so a stuck directory cannot leak sessions.
struct ValidationSession {
    started: Instant,
    log_id: log_utils::IdChain<u64>,
}

impl ValidationSession {
    fn begin(log_id: &log_utils::IdChain<u64>) -> Self {
        metrics::ACTIVE_VALIDATION_SESSIONS.inc();
        Self {
            started: Instant::now(),
            log_id: log_id.clone(),
        }
    }
}

impl Drop for ValidationSession {
    fn drop(&mut self) {
        metrics::ACTIVE_VALIDATION_SESSIONS.dec();
        log_id!(
            trace,
            self.log_id,
            "Validation session released after {:?}",
            self.started.elapsed()
        );
    }
}

/// Wraps a directory [`Authenticator`] with a hard per-call lifetime.
///
/// Exceeding the lifetime yields [`Verdict::Indeterminate`], never an
/// unbounded wait and never an implicit allow.
pub struct BoundedDirectory {
    inner: Arc<dyn Authenticator>,
    lifetime: Duration,
}

impl BoundedDirectory {
    pub fn new(inner: Arc<dyn Authenticator>, lifetime: Duration) -> Self {
        Self { inner, lifetime }
    }
}

#[async_trait]
impl Authenticator for BoundedDirectory {
    async fn authenticate(
        &self,
        profile: &str,
        credentials: &Credentials,
        log_id: &log_utils::IdChain<u64>,
    ) -> Verdict {
        let _session = ValidationSession::begin(log_id);
        match tokio::time::timeout(
            self.lifetime,
            self.inner.authenticate(profile, credentials, log_id),
        )
        .await
        {
            Ok(verdict) => verdict,
            Err(_) => {
                log_id!(
                    debug,
                    log_id,
                    "Directory validation exceeded its {:?} lifetime",
                    self.lifetime
                );
                Verdict::Indeterminate(format!(
                    "validation did not complete within {:?}",
                    self.lifetime
                ))
            }
        }
    }
}

/// A client descriptor from the endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Client {
    /// The client username
    pub username: String,
    /// The client password
    pub password: String,
}

/// An [`Authenticator`] backed by a configured client list.
///
/// Stores credential fingerprints only; raw passwords are dropped after
/// construction.
pub struct RegistryDirectory {
    fingerprints: HashSet<String>,
}

impl RegistryDirectory {
    pub fn new(clients: &[Client]) -> Self {
        Self {
            fingerprints: clients
                .iter()
                .map(|x| {
                    let credentials = Credentials {
                        username: x.username.clone(),
                        password: x.password.clone(),
                    };
                    authentication::credential_fingerprint(&credentials.basic_token())
                })
                .collect(),
        }
    }
}

#[async_trait]
impl Authenticator for RegistryDirectory {
    async fn authenticate(
        &self,
        _profile: &str,
        credentials: &Credentials,
        _log_id: &log_utils::IdChain<u64>,
    ) -> Verdict {
        let fingerprint = authentication::credential_fingerprint(&credentials.basic_token());
        if self.fingerprints.contains(&fingerprint) {
            Verdict::Allow
        } else {
            Verdict::Deny
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serializes the tests that open validation sessions, so gauge readings
    // are not disturbed by a concurrently running test.
    static SESSIONS: Mutex<()> = Mutex::new(());

    fn log_id() -> log_utils::IdChain<u64> {
        log_utils::IdChain::new(0)
    }

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    struct HangingDirectory;

    #[async_trait]
    impl Authenticator for HangingDirectory {
        async fn authenticate(
            &self,
            _profile: &str,
            _credentials: &Credentials,
            _log_id: &log_utils::IdChain<u64>,
        ) -> Verdict {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Verdict::Allow
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_directory_resolves_to_indeterminate() {
        let _serial = SESSIONS.lock().unwrap();
        let bounded = BoundedDirectory::new(Arc::new(HangingDirectory), Duration::from_secs(1));
        let verdict = bounded
            .authenticate("corp", &credentials("alice", "secret"), &log_id())
            .await;
        assert!(matches!(verdict, Verdict::Indeterminate(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn session_gauge_returns_to_prior_value() {
        let _serial = SESSIONS.lock().unwrap();
        let before = metrics::ACTIVE_VALIDATION_SESSIONS.get();
        let bounded = BoundedDirectory::new(Arc::new(HangingDirectory), Duration::from_millis(10));
        bounded
            .authenticate("corp", &credentials("alice", "secret"), &log_id())
            .await;
        assert_eq!(metrics::ACTIVE_VALIDATION_SESSIONS.get(), before);
    }

    #[tokio::test]
    async fn registry_allows_known_and_denies_unknown_clients() {
        let directory = RegistryDirectory::new(&[Client {
            username: "alice".to_string(),
            password: "secret".to_string(),
        }]);
        assert_eq!(
            directory
                .authenticate("corp", &credentials("alice", "secret"), &log_id())
                .await,
            Verdict::Allow
        );
        assert_eq!(
            directory
                .authenticate("corp", &credentials("alice", "wrong"), &log_id())
                .await,
            Verdict::Deny
        );
        assert_eq!(
            directory
                .authenticate("corp", &credentials("mallory", "secret"), &log_id())
                .await,
            Verdict::Deny
        );
    }

    #[tokio::test]
    async fn bounded_passes_through_prompt_verdicts() {
        let _serial = SESSIONS.lock().unwrap();
        let directory: Arc<dyn Authenticator> = Arc::new(RegistryDirectory::new(&[Client {
            username: "alice".to_string(),
            password: "secret".to_string(),
        }]));
        let bounded = BoundedDirectory::new(directory, Duration::from_secs(1));
        assert_eq!(
            bounded
                .authenticate("corp", &credentials("alice", "secret"), &log_id())
                .await,
            Verdict::Allow
        );
    }
}
