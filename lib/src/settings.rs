use std::time::Duration;
use serde::Deserialize;


/// Authentication gate settings.
///
/// Constructed once at startup and passed into
/// [`AuthEngine::new`](crate::engine::AuthEngine::new); immutable afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Identifier of the directory policy/agent the validator should use.
    pub profile: String,
    /// Realm echoed in the `Proxy-Authenticate` challenge header.
    pub realm: String,
    /// Lifetime of a positive cache entry before re-validation is forced.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Hard bound on a single directory validation call.
    #[serde(default = "default_validation_timeout_ms")]
    pub validation_timeout_ms: u64,
    /// Toggles emission of success/failure audit log lines.
    /// Has no effect on the decision logic.
    #[serde(default)]
    pub log_auth_events: bool,
}

fn default_cache_ttl_secs() -> u64 {
    180
}

fn default_validation_timeout_ms() -> u64 {
    1000
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn validation_timeout(&self) -> Duration {
        Duration::from_millis(self.validation_timeout_ms)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let settings: Settings = toml::from_str(
            r#"
            profile = "corp"
            realm = "Test"
            "#,
        )
        .unwrap();
        assert_eq!(settings.cache_ttl(), Duration::from_secs(180));
        assert_eq!(settings.validation_timeout(), Duration::from_millis(1000));
        assert!(!settings.log_auth_events);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            profile = "corp"
            realm = "Test"
            cache_ttl_secs = 30
            validation_timeout_ms = 250
            log_auth_events = true
            "#,
        )
        .unwrap();
        assert_eq!(settings.cache_ttl_secs, 30);
        assert_eq!(settings.validation_timeout_ms, 250);
        assert!(settings.log_auth_events);
    }
}
