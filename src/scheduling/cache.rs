//! Read-through cache for the available-days view
//!
//! Computing a month of availability means one slot computation per
//! calendar day, each of which may hit the external calendar. The
//! result is staleness-tolerant, so it is cached per
//! `(event_type_id, month)` with a short TTL. Expiry is judged against
//! a caller-supplied clock so tests stay deterministic.
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

struct CacheEntry {
    expires_at: DateTime<Utc>,
    days: Vec<String>,
}

pub struct AvailableDaysCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl AvailableDaysCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The freshness/performance tradeoff picked for month views.
    pub fn with_default_ttl() -> Self {
        Self::new(Duration::minutes(5))
    }

    pub fn key(event_type_id: &str, month: &str) -> String {
        format!("{}:{}", event_type_id, month)
    }

    /// Returns the cached days if present and unexpired. Expired
    /// entries are evicted on the way out.
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<Vec<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.days.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: String, days: Vec<String>, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            CacheEntry {
                expires_at: now + self.ttl,
                days,
            },
        );
    }

    /// Drop every cached month for an event type. Called after writes
    /// that change availability (new booking, reschedule, cancel).
    pub fn invalidate_event_type(&self, event_type_id: &str) {
        let prefix = format!("{}:", event_type_id);
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|key, _| !key.starts_with(&prefix));
    }
}
