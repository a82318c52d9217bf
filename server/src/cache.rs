//! In-process cache of rendered tag listings.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListingKey {
    PublicTags,
    AdminTags,
}

/// Serialized listing bodies. Any tag write drops every entry, since usage
/// counts and names show up in both listings.
///
/// Entries are stamped with the generation current when the reader started
/// loading. Invalidation bumps the generation, so a body loaded before a
/// concurrent write is never served after it.
#[derive(Debug, Default)]
pub struct ListingCache {
    generation: AtomicU64,
    entries: DashMap<ListingKey, (u64, Value)>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture before loading a listing; pass the result to [`Self::put`].
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get(&self, key: ListingKey) -> Option<Value> {
        let current = self.generation();
        self.entries
            .get(&key)
            .filter(|entry| entry.value().0 == current)
            .map(|entry| entry.value().1.clone())
    }

    /// Store `body` unless a write happened since `generation` was read.
    pub fn put(&self, key: ListingKey, generation: u64, body: Value) {
        if generation != self.generation() {
            tracing::debug!(?key, "discarding listing loaded before a tag write");
            return;
        }
        self.entries.insert(key, (generation, body));
    }

    pub fn invalidate_tags(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.entries.remove(&ListingKey::PublicTags);
        self.entries.remove(&ListingKey::AdminTags);
        tracing::debug!("tag listings invalidated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_invalidate_drops_both_listings() {
        let cache = ListingCache::new();
        let generation = cache.generation();
        cache.put(ListingKey::PublicTags, generation, json!({"tags": []}));
        cache.put(ListingKey::AdminTags, generation, json!({"tags": []}));
        assert!(cache.get(ListingKey::PublicTags).is_some());

        cache.invalidate_tags();
        assert!(cache.get(ListingKey::PublicTags).is_none());
        assert!(cache.get(ListingKey::AdminTags).is_none());
    }

    #[test]
    fn test_listing_loaded_before_a_write_is_not_cached() {
        let cache = ListingCache::new();
        let generation = cache.generation();

        // A write lands while the reader is still loading
        cache.invalidate_tags();
        cache.put(ListingKey::PublicTags, generation, json!({"tags": ["stale"]}));
        assert!(cache.get(ListingKey::PublicTags).is_none());

        let fresh = cache.generation();
        cache.put(ListingKey::PublicTags, fresh, json!({"tags": ["fresh"]}));
        assert_eq!(
            cache.get(ListingKey::PublicTags),
            Some(json!({"tags": ["fresh"]}))
        );
    }
}
