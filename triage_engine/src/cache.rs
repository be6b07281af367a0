//! TTL-bounded in-memory session cache.
//!
//! Cache-aside layer keyed by session id. Each entry carries its own
//! exclusive lock so one turn's read-modify-write cycle serializes against
//! concurrent turns on the same session while unrelated sessions proceed in
//! parallel. Eviction is lazy: entries older than the TTL (measured from
//! creation, not last access) are only dropped when `evict_expired` is
//! invoked by a read-heavy caller.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use triage_core::SessionRecord;

/// Shared handle to a cached session record.
pub type SessionHandle = Arc<Mutex<SessionRecord>>;

struct CacheEntry {
    // Snapshot of the record's creation time so eviction never has to take
    // the per-session lock.
    created_at: DateTime<Utc>,
    record: SessionHandle,
}

pub struct SessionCache {
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl SessionCache {
    #[must_use]
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a cached session without touching the durable store.
    pub async fn lookup(&self, id: Uuid) -> Option<SessionHandle> {
        self.entries
            .read()
            .await
            .get(&id)
            .map(|entry| Arc::clone(&entry.record))
    }

    /// Insert a record, replacing any previous entry for its id.
    pub async fn insert(&self, record: SessionRecord) -> SessionHandle {
        let id = record.id;
        let created_at = record.created_at;
        let handle = Arc::new(Mutex::new(record));
        self.entries.write().await.insert(
            id,
            CacheEntry {
                created_at,
                record: Arc::clone(&handle),
            },
        );
        handle
    }

    /// Remove and return the entry for `id`, if cached.
    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.entries
            .write()
            .await
            .remove(&id)
            .map(|entry| entry.record)
    }

    /// Drop every entry whose age since creation exceeds the TTL.
    ///
    /// Activity does not extend a session's lifetime; the durable copy is
    /// unaffected. Returns the number of evicted entries.
    pub async fn evict_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.signed_duration_since(entry.created_at) <= self.ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!("Evicted {evicted} expired session(s) from cache");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Ids of all currently cached sessions.
    pub async fn ids(&self) -> Vec<Uuid> {
        self.entries.read().await.keys().copied().collect()
    }
}
