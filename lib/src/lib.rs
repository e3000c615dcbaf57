//! Forward-proxy authentication gate.
//!
//! Sits in the data path of an explicit (CONNECT-style) forward proxy and
//! enforces HTTP Basic credential authentication before allowing a client's
//! traffic through. Positive validation results are cached per
//! (client address, credential token) pair for a short TTL, so the external
//! directory is consulted once per TTL window rather than once per request.
//!
//! The entry point is [`engine::AuthEngine`]: feed it a peer address and the
//! request headers, receive either [`engine::Decision::Proceed`] or a fully
//! formed 407 challenge to send verbatim.

pub mod authentication;
pub mod challenge;
pub mod connection_registry;
pub mod engine;
pub mod log_utils;
pub mod metrics;
pub mod settings;
pub mod validation_cache;
