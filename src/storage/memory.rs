// src/storage/memory.rs
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use crate::models::server::{ServerList, Source};

struct CacheEntry {
    list: Arc<ServerList>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.fetched_at) < ttl
    }
}

/// Single-slot cache for the most recent server list.
///
/// The lock is held for the whole check-fetch-store sequence, so concurrent
/// misses share one upstream call.
pub struct ServerListCache {
    slot: Mutex<Option<CacheEntry>>,
    ttl: Duration,
}

impl ServerListCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Returns the cached list while it is fresh, otherwise runs `fetch` and
    /// replaces the slot with its result. A failed fetch leaves the slot as
    /// it was.
    pub async fn get_or_fetch<F, Fut, E>(&self, fetch: F) -> Result<(Arc<ServerList>, Source), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ServerList, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(entry) = slot.as_ref() {
            if entry.is_fresh(Instant::now(), self.ttl) {
                return Ok((Arc::clone(&entry.list), Source::Cache));
            }
        }

        let list = Arc::new(fetch().await?);
        *slot = Some(CacheEntry {
            list: Arc::clone(&list),
            fetched_at: Instant::now(),
        });

        Ok((list, Source::OpenCloud))
    }
}
