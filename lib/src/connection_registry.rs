use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};


const MAX_ENTRIES: usize = 4096;
const STALE_AFTER: Duration = Duration::from_secs(3600);

struct Record {
    username: String,
    recorded_at: Instant,
}

/// Best-effort map of transport connections to the last authenticated
/// username, for log/session correlation only.
///
/// Never consulted for authorization decisions. Entries are overwritten per
/// connection; the map is bounded by a capacity cap plus stale pruning so
/// many short-lived connections cannot grow it without bound.
pub struct ConnectionRegistry {
    entries: Mutex<HashMap<SocketAddr, Record>>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn record(&self, peer: SocketAddr, username: &str) {
        self.record_at(peer, username, Instant::now());
    }

    pub fn username_for(&self, peer: &SocketAddr) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .get(peer)
            .map(|record| record.username.clone())
    }

    fn record_at(&self, peer: SocketAddr, username: &str, now: Instant) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() >= MAX_ENTRIES && !entries.contains_key(&peer) {
            entries.retain(|_, record| now.duration_since(record.recorded_at) < STALE_AFTER);
            if entries.len() >= MAX_ENTRIES {
                // Still full of fresh entries; drop the oldest one.
                if let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, record)| record.recorded_at)
                    .map(|(peer, _)| *peer)
                {
                    entries.remove(&oldest);
                }
            }
        }
        entries.insert(
            peer,
            Record {
                username: username.to_string(),
                recorded_at: now,
            },
        );
    }
}
