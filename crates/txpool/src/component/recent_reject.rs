//! Bounded LRU of recently rejected transaction hashes, consulted before
//! validation so that a peer re-gossiping a hash the pool just rejected
//! does not pay the full validation cost again. Scaled down from the
//! teacher's sharded on-disk `RecentReject` (which exists to survive
//! restarts) to an in-memory cache, since persistent durability across
//! restarts is an explicit non-goal.

use std::num::NonZeroUsize;

use lru::LruCache;
use parking_lot::Mutex;
use txpool_types::TxHash;

const DEFAULT_CAPACITY: usize = 10_000;

pub struct RecentReject {
    inner: Mutex<LruCache<TxHash, String>>,
}

impl Default for RecentReject {
    fn default() -> Self {
        RecentReject {
            inner: Mutex::new(LruCache::new(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap())),
        }
    }
}

impl RecentReject {
    pub fn new(capacity: usize) -> Self {
        RecentReject {
            inner: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).unwrap(),
            )),
        }
    }

    pub fn put(&self, hash: TxHash, reason: String) {
        self.inner.lock().put(hash, reason);
    }

    pub fn get(&self, hash: &TxHash) -> Option<String> {
        self.inner.lock().get(hash).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_and_evicts_oldest_past_capacity() {
        let cache = RecentReject::new(2);
        let h1 = TxHash::from_slice(&[1u8; 32]);
        let h2 = TxHash::from_slice(&[2u8; 32]);
        let h3 = TxHash::from_slice(&[3u8; 32]);
        cache.put(h1, "size too large".to_string());
        cache.put(h2, "chain tag mismatch".to_string());
        cache.put(h3, "expired".to_string());
        assert!(cache.get(&h1).is_none());
        assert_eq!(cache.get(&h2).unwrap(), "chain tag mismatch");
        assert_eq!(cache.get(&h3).unwrap(), "expired");
    }
}
