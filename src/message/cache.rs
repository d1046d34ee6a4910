use std::num::NonZeroUsize;

use lru::LruCache;

use super::events::ContainerMeta;

pub const DEFAULT_CACHE_CAPACITY: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Metadata cache capacity must be greater than zero")]
    ZeroCapacity,
}

/// Bounded least-recently-used map from container id to its last known
/// name and image.
///
/// There is no interior locking. The cache belongs to the formatter and is
/// only ever touched from the aggregator's flush.
pub struct MetadataCache {
    inner: LruCache<String, ContainerMeta>,
}

impl MetadataCache {
    pub fn new(capacity: usize) -> Result<Self, CacheError> {
        let capacity = NonZeroUsize::new(capacity).ok_or(CacheError::ZeroCapacity)?;
        Ok(Self {
            inner: LruCache::new(capacity),
        })
    }

    /// Stores the metadata, evicting the least recently used entry when full.
    pub fn put(&mut self, id: impl Into<String>, meta: ContainerMeta) {
        self.inner.put(id.into(), meta);
    }

    /// Looks up an entry and marks it as recently used.
    pub fn get(&mut self, id: &str) -> Option<ContainerMeta> {
        self.inner.get(id).cloned()
    }
}
