use lazy_static::lazy_static;
use prometheus::{
    register_int_counter, register_int_counter_vec, register_int_gauge,
    IntCounter, IntCounterVec, IntGauge,
};


lazy_static! {
    pub static ref AUTH_CACHE_HITS: IntCounter = register_int_counter!(
        "proxygate_auth_cache_hits_total",
        "Requests authorized from the validation cache without a directory call"
    )
    .unwrap();

    pub static ref AUTH_CACHE_MISSES: IntCounter = register_int_counter!(
        "proxygate_auth_cache_misses_total",
        "Requests that did not find an unexpired validation cache entry"
    )
    .unwrap();

    pub static ref AUTH_CHALLENGES: IntCounter = register_int_counter!(
        "proxygate_auth_challenges_total",
        "407 challenge responses emitted"
    )
    .unwrap();

    pub static ref DIRECTORY_VERDICTS: IntCounterVec = register_int_counter_vec!(
        "proxygate_directory_verdicts_total",
        "Directory validation outcomes by verdict",
        &["verdict"]
    )
    .unwrap();

    pub static ref ACTIVE_VALIDATION_SESSIONS: IntGauge = register_int_gauge!(
        "proxygate_active_validation_sessions",
        "Directory validation sessions currently in flight"
    )
    .unwrap();
}
