//! Address-ordered index of unused chunks

use std::collections::BTreeMap;

use crate::chunk::ChunkPointer;

/// Unused chunks keyed by address, valued by capacity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreeList {
    entries: BTreeMap<ChunkPointer, u64>,
}

impl FreeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ptr: ChunkPointer, capacity: u64) {
        self.entries.insert(ptr, capacity);
    }

    pub fn remove(&mut self, ptr: ChunkPointer) -> Option<u64> {
        self.entries.remove(&ptr)
    }

    pub fn contains(&self, ptr: ChunkPointer) -> bool {
        self.entries.contains_key(&ptr)
    }

    /// Lowest-addressed chunk with at least `capacity` bytes.
    pub fn first_fit(&self, capacity: u64) -> Option<ChunkPointer> {
        self.entries
            .iter()
            .find(|&(_, &cap)| cap >= capacity)
            .map(|(&ptr, _)| ptr)
    }

    /// Highest-addressed free chunk, the only one that can end the source.
    pub fn last(&self) -> Option<ChunkPointer> {
        self.entries.keys().next_back().copied()
    }

    /// Highest-addressed free chunk below `ptr`.
    pub fn before(&self, ptr: ChunkPointer) -> Option<ChunkPointer> {
        self.entries.range(..ptr).next_back().map(|(&p, _)| p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn free_bytes(&self) -> u64 {
        self.entries.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkPointer, u64)> + '_ {
        self.entries.iter().map(|(&ptr, &cap)| (ptr, cap))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
