use viewgate_core::stmt::Row;

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Read-through cache consulted by the orchestrator for views that
/// declare a [`CacheConfig`](viewgate_core::schema::CacheConfig).
///
/// Keys are the page-independent routing keys produced by the builder's
/// cache-key shape.
#[async_trait::async_trait]
pub trait ReadCache: Debug + Send + Sync + 'static {
    async fn get(&self, key: &str) -> Option<Vec<Row>>;
    async fn put(&self, key: &str, rows: Vec<Row>, ttl: Duration);
}

/// In-process cache with per-entry expiry. Suitable for tests and
/// single-node deployments.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (Instant, Vec<Row>)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ReadCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<Row>> {
        let mut entries = self.entries.lock().expect("cache poisoned");
        match entries.get(key) {
            Some((expires, rows)) if *expires > Instant::now() => Some(rows.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: &str, rows: Vec<Row>, ttl: Duration) {
        self.entries
            .lock()
            .expect("cache poisoned")
            .insert(key.to_string(), (Instant::now() + ttl, rows));
    }
}
