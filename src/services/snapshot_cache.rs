use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockWriteGuard};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use lru::LruCache;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::models::performance::TeamPerformanceSummary;
use crate::models::period::Period;
use crate::models::snapshot::{NormalizedSnapshot, RawTable};

/// Stable identity of raw content (base64url encoded SHA-256).
pub fn fingerprint_tables(tables: &[&RawTable]) -> String {
    let mut hasher = Sha256::new();
    for table in tables {
        for row in table.iter() {
            for cell in row {
                hasher.update(cell.to_string().as_bytes());
                hasher.update([0x1f_u8]);
            }
            hasher.update([0x1e_u8]);
        }
        hasher.update([0x1d_u8]);
    }
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

#[derive(Debug, Clone)]
pub struct CachedSnapshot {
    pub fingerprint: String,
    pub snapshot: Arc<NormalizedSnapshot>,
    pub cached_at: DateTime<Utc>,
}

/// Holds the latest normalized snapshot for at most `ttl`.
#[derive(Debug)]
pub struct SnapshotCache {
    entry: RwLock<Option<CachedSnapshot>>,
    ttl: Duration,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
        }
    }

    pub fn get(&self) -> Option<CachedSnapshot> {
        self.get_at(Utc::now())
    }

    pub fn get_at(&self, now: DateTime<Utc>) -> Option<CachedSnapshot> {
        let entry = self
            .entry
            .read()
            .unwrap_or_else(|poisoned| {
                warn!(target: "app::reporting", "snapshot cache lock poisoned; recovering");
                poisoned.into_inner()
            })
            .clone();
        entry.and_then(|entry| {
            if now - entry.cached_at <= self.ttl {
                Some(entry)
            } else {
                debug!(target: "app::reporting", "snapshot cache entry expired");
                None
            }
        })
    }

    pub fn insert(&self, fingerprint: String, snapshot: NormalizedSnapshot) -> CachedSnapshot {
        self.insert_at(fingerprint, snapshot, Utc::now())
    }

    pub fn insert_at(
        &self,
        fingerprint: String,
        snapshot: NormalizedSnapshot,
        cached_at: DateTime<Utc>,
    ) -> CachedSnapshot {
        let entry = CachedSnapshot {
            fingerprint,
            snapshot: Arc::new(snapshot),
            cached_at,
        };
        *self.write_entry() = Some(entry.clone());
        entry
    }

    pub fn clear(&self) {
        *self.write_entry() = None;
    }

    fn write_entry(&self) -> RwLockWriteGuard<'_, Option<CachedSnapshot>> {
        self.entry.write().unwrap_or_else(|poisoned| {
            warn!(target: "app::reporting", "snapshot cache lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ResultKey {
    fingerprint: String,
    period: Period,
}

/// Per-period performance tables for recently seen snapshots.
#[derive(Debug)]
pub struct ResultCache {
    entries: Mutex<LruCache<ResultKey, Vec<TeamPerformanceSummary>>>,
}

impl ResultCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn get(&self, fingerprint: &str, period: Period) -> Option<Vec<TeamPerformanceSummary>> {
        let key = ResultKey {
            fingerprint: fingerprint.to_string(),
            period,
        };
        self.lock().get(&key).cloned()
    }

    pub fn insert(&self, fingerprint: &str, period: Period, summaries: Vec<TeamPerformanceSummary>) {
        let key = ResultKey {
            fingerprint: fingerprint.to_string(),
            period,
        };
        self.lock().put(key, summaries);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<ResultKey, Vec<TeamPerformanceSummary>>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!(target: "app::reporting", "result cache lock poisoned; recovering");
            poisoned.into_inner()
        })
    }
}
