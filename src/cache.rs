//! In-memory response cache keyed by request URL.

use std::fmt;
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use parking_lot::RwLock;

use crate::models::GeoResult;

static SHARED: OnceLock<ResponseCache> = OnceLock::new();

/// Cache of normalized results, keyed by the lower-cased request URL.
///
/// Cloning yields another handle to the same map. Entries live until
/// [`ResponseCache::clear`]; there is no eviction or size bound. A repeated
/// `put` for a key replaces the entry (last write wins).
#[derive(Clone, Default)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, Arc<GeoResult>>>>,
}

impl ResponseCache {
    /// A new, empty cache private to whoever holds it
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by clients that are not given one
    pub fn shared() -> Self {
        SHARED.get_or_init(ResponseCache::new).clone()
    }

    pub fn get(&self, url: &str) -> Option<Arc<GeoResult>> {
        self.entries.read().get(&cache_key(url)).cloned()
    }

    pub fn put(&self, url: &str, result: Arc<GeoResult>) {
        self.entries.write().insert(cache_key(url), result);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Whether both handles point at the same map
    pub fn same_as(&self, other: &ResponseCache) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }
}

// Keys embed the API key, so only the size is shown.
impl fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCache")
            .field("entries", &self.len())
            .finish()
    }
}

fn cache_key(url: &str) -> String {
    url.to_lowercase()
}
