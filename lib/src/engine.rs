use std::net::SocketAddr;
use std::sync::Arc;
use http::header::PROXY_AUTHORIZATION;
use http::{HeaderMap, Response};
use crate::authentication::directory::BoundedDirectory;
use crate::authentication::{self, Authenticator, Verdict};
use crate::connection_registry::ConnectionRegistry;
use crate::settings::Settings;
use crate::validation_cache::{CacheKey, Lookup, ValidationCache};
use crate::{challenge, log_id, log_utils, metrics};


/// Outcome of the authentication gate for one request.
#[derive(Debug)]
pub enum Decision {
    /// Do not intervene further; the data plane resumes normal forwarding.
    Proceed,
    /// Send this 407 verbatim and stop processing the request.
    Challenge(Response<()>),
}

/// The per-request authentication decision engine.
///
/// Either completes in O(1) from the validation cache, or performs one
/// directory round-trip with a hard lifetime bound before deciding. Every
/// failure mode (missing header, malformed token, directory denial or
/// ambiguity) collapses into the single externally visible 407 outcome;
/// ambiguity never grants access.
pub struct AuthEngine {
    settings: Settings,
    cache: ValidationCache,
    registry: ConnectionRegistry,
    directory: BoundedDirectory,
}

impl AuthEngine {
    pub fn new(settings: Settings, directory: Arc<dyn Authenticator>) -> Self {
        let cache = ValidationCache::new(settings.cache_ttl());
        let directory = BoundedDirectory::new(directory, settings.validation_timeout());
        Self {
            settings,
            cache,
            registry: ConnectionRegistry::new(),
            directory,
        }
    }

    /// Decide whether the request from `peer` may pass.
    pub async fn authorize(
        &self,
        peer: SocketAddr,
        headers: &HeaderMap,
        log_id: &log_utils::IdChain<u64>,
    ) -> Decision {
        let token = match headers
            .get(PROXY_AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(authentication::basic_token)
        {
            Some(token) => token,
            None => {
                log_id!(debug, log_id, "No usable Proxy-Authorization header");
                return self.challenge(peer, "missing or non-Basic credentials", log_id);
            }
        };

        let key = CacheKey::new(peer.ip(), token);
        if self.cache.lookup(&key) == Lookup::Hit {
            metrics::AUTH_CACHE_HITS.inc();
            log_id!(trace, log_id, "Validation cache hit for {}", peer.ip());
            return Decision::Proceed;
        }
        metrics::AUTH_CACHE_MISSES.inc();

        let credentials = match authentication::decode_basic_token(token) {
            Ok(credentials) => credentials,
            Err(e) => {
                log_id!(debug, log_id, "Credential decoding failed: {}", e);
                return self.challenge(peer, "malformed credentials", log_id);
            }
        };

        let verdict = self
            .directory
            .authenticate(&self.settings.profile, &credentials, log_id)
            .await;
        metrics::DIRECTORY_VERDICTS
            .with_label_values(&[verdict.label()])
            .inc();

        match verdict {
            Verdict::Allow => {
                self.cache.put(key);
                self.registry.record(peer, &credentials.username);
                if self.settings.log_auth_events {
                    log_id!(
                        info,
                        log_id,
                        "Authenticated '{}' from {}",
                        credentials.username,
                        peer
                    );
                }
                Decision::Proceed
            }
            // Negative results are never cached: every subsequent request
            // re-attempts validation.
            Verdict::Deny => {
                if self.settings.log_auth_events {
                    log_id!(
                        info,
                        log_id,
                        "Directory rejected '{}' from {}",
                        credentials.username,
                        peer
                    );
                }
                self.challenge(peer, "directory rejected credentials", log_id)
            }
            Verdict::Indeterminate(reason) => {
                if self.settings.log_auth_events {
                    log_id!(
                        info,
                        log_id,
                        "Could not validate '{}' from {}: {}",
                        credentials.username,
                        peer,
                        reason
                    );
                }
                self.challenge(peer, &reason, log_id)
            }
        }
    }

    /// The last authenticated username for a connection, if any.
    /// Observational only; never part of the authorization decision.
    pub fn authenticated_username(&self, peer: &SocketAddr) -> Option<String> {
        self.registry.username_for(peer)
    }

    pub fn realm(&self) -> &str {
        &self.settings.realm
    }

    fn challenge(
        &self,
        peer: SocketAddr,
        reason: &str,
        log_id: &log_utils::IdChain<u64>,
    ) -> Decision {
        metrics::AUTH_CHALLENGES.inc();
        log_id!(debug, log_id, "Challenging {}: {}", peer, reason);
        Decision::Challenge(challenge::challenge(&self.settings.realm))
    }
}
