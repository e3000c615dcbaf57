pub mod directory;


use std::fmt;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine;
use crate::log_utils;


/// Scheme prefix of a Proxy Basic authorization header,
/// [RFC 7617](https://datatracker.ietf.org/doc/html/rfc7617).
pub const BASIC_SCHEME_PREFIX: &str = "Basic ";

/// A decoded username/password pair.
///
/// Lives only for the duration of a single validation call; never persisted
/// in cleartext.
#[derive(Clone, PartialEq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// The base64 token form carried on the wire, `base64(username ":" password)`.
    pub fn basic_token(&self) -> String {
        BASE64_ENGINE.encode(format!("{}:{}", self.username, self.password))
    }
}

// The password must not leak through Debug formatting into logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Failure to decode a Basic credential token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    InvalidBase64,
    InvalidUtf8,
    MissingSeparator,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidBase64 => write!(f, "credential token is not valid base64"),
            Self::InvalidUtf8 => write!(f, "decoded credential payload is not valid UTF-8"),
            Self::MissingSeparator => write!(f, "decoded credential payload has no ':' separator"),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Strip the `"Basic "` scheme prefix from an authorization header value.
/// Returns `None` for any other scheme.
pub fn basic_token(header: &str) -> Option<&str> {
    header.strip_prefix(BASIC_SCHEME_PREFIX)
}

/// Decode a Basic credential token into a username/password pair.
///
/// The decoded payload is split on the first colon only: a password may
/// legitimately contain colons, a username may not.
pub fn decode_basic_token(token: &str) -> Result<Credentials, DecodeError> {
    let raw = BASE64_ENGINE
        .decode(token.trim())
        .map_err(|_| DecodeError::InvalidBase64)?;
    let payload = String::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;
    let (username, password) = payload
        .split_once(':')
        .ok_or(DecodeError::MissingSeparator)?;
    Ok(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Hex-encoded SHA-256 digest of a raw credential token.
///
/// Cache keys and directory registries store this fingerprint so that raw
/// credential material never outlives a validation call.
pub fn credential_fingerprint(token: &str) -> String {
    let digest = ring::digest::digest(&ring::digest::SHA256, token.as_bytes());
    hex::encode(digest.as_ref())
}

/// Directory validation outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The directory accepted the credentials.
    Allow,
    /// The directory explicitly rejected the credentials.
    Deny,
    /// The validation did not complete (timeout, transport failure, or an
    /// unexpected directory response). Always treated as a denial.
    Indeterminate(String),
}

impl Verdict {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Allow => "allow",
            Self::Deny => "deny",
            Self::Indeterminate(_) => "indeterminate",
        }
    }
}

/// The directory validator abstract interface.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Validate the credentials against the directory policy selected by
    /// `profile`.
    async fn authenticate(
        &self,
        profile: &str,
        credentials: &Credentials,
        log_id: &log_utils::IdChain<u64>,
    ) -> Verdict;
}
