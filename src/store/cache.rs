//! Bounded cache of clean chunk headers
//!
//! Entries always equal what the source holds: the store writes a header
//! through before caching it, and rollback drops the whole cache.

use std::collections::{HashMap, VecDeque};

use crate::chunk::{Chunk, ChunkPointer};

/// Header cache with oldest-first eviction.
#[derive(Debug)]
pub struct ChunkCache {
    capacity: usize,
    entries: HashMap<ChunkPointer, Chunk>,
    order: VecDeque<ChunkPointer>,
}

impl ChunkCache {
    /// A cache holding at most `capacity` headers. Zero disables caching.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
        }
    }

    pub fn get(&self, ptr: ChunkPointer) -> Option<&Chunk> {
        self.entries.get(&ptr)
    }

    /// Caches a clean copy of `chunk`, evicting the oldest entry when full.
    pub fn put(&mut self, chunk: &Chunk) {
        debug_assert!(!chunk.is_dirty(), "only clean headers are cached");
        if self.capacity == 0 {
            return;
        }
        let ptr = chunk.ptr();
        if self.entries.insert(ptr, chunk.clone()).is_none() {
            self.order.push_back(ptr);
        }
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    pub fn remove(&mut self, ptr: ChunkPointer) {
        if self.entries.remove(&ptr).is_some() {
            self.order.retain(|&p| p != ptr);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Cached pointers, oldest first.
    pub fn pointers(&self) -> Vec<ChunkPointer> {
        self.order.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::word::WordWidth;

    fn clean(ptr: u64, capacity: u64) -> Chunk {
        let mut source = MemorySource::from_bytes(vec![0u8; 512]);
        let mut chunk =
            Chunk::new(ChunkPointer::new(ptr), WordWidth::Short, WordWidth::Short, capacity).unwrap();
        chunk.sync(&mut source).unwrap();
        chunk
    }

    #[test]
    fn test_put_and_get() {
        let mut cache = ChunkCache::new(4);
        cache.put(&clean(10, 3));
        assert_eq!(cache.get(ChunkPointer::new(10)).unwrap().capacity(), 3);
        assert!(cache.get(ChunkPointer::new(11)).is_none());
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = ChunkCache::new(2);
        cache.put(&clean(10, 1));
        cache.put(&clean(20, 1));
        cache.put(&clean(30, 1));
        assert_eq!(cache.len(), 2);
        assert!(cache.get(ChunkPointer::new(10)).is_none());
        assert_eq!(cache.pointers(), vec![ChunkPointer::new(20), ChunkPointer::new(30)]);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut cache = ChunkCache::new(2);
        cache.put(&clean(10, 1));
        cache.put(&clean(20, 1));
        cache.put(&clean(10, 7));
        assert_eq!(cache.get(ChunkPointer::new(10)).unwrap().capacity(), 7);
        assert_eq!(cache.pointers().len(), 2);
    }

    #[test]
    fn test_zero_capacity_disables() {
        let mut cache = ChunkCache::new(0);
        cache.put(&clean(10, 1));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut cache = ChunkCache::new(4);
        cache.put(&clean(10, 1));
        cache.put(&clean(20, 1));
        cache.remove(ChunkPointer::new(10));
        assert_eq!(cache.pointers(), vec![ChunkPointer::new(20)]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
