use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

pub const CACHE_TTL_MINUTES: i64 = 30;

#[async_trait::async_trait]
pub trait ResultCache: Send + Sync {
    async fn lookup(&self, ticker: &str) -> Option<String>;

    async fn store(&self, ticker: &str, payload: String);
}

#[derive(Debug, Clone)]
struct CacheEntry {
    created_at: DateTime<Utc>,
    payload: String,
}

// Keyed by upper-case ticker. Stale entries are ignored, never purged.
pub struct TtlCache {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: tokio::sync::RwLock<HashMap<String, CacheEntry>>,
}

impl TtlCache {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            ttl: Duration::minutes(CACHE_TTL_MINUTES),
            entries: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn cache_key(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

#[async_trait::async_trait]
impl ResultCache for TtlCache {
    async fn lookup(&self, ticker: &str) -> Option<String> {
        let key = cache_key(ticker);
        let now = self.clock.now();
        let entries = self.entries.read().await;
        let entry = entries.get(&key)?;

        if now - entry.created_at < self.ttl {
            Some(entry.payload.clone())
        } else {
            tracing::debug!(ticker = %key, created_at = %entry.created_at, "cache entry expired");
            None
        }
    }

    async fn store(&self, ticker: &str, payload: String) {
        let entry = CacheEntry {
            created_at: self.clock.now(),
            payload,
        };
        self.entries.write().await.insert(cache_key(ticker), entry);
    }
}
