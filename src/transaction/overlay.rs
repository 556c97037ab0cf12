//! Pending-write index for an open transaction
//!
//! Pending writes are kept as non-overlapping, coalesced byte ranges keyed by
//! offset. A newer write always replaces the bytes of older writes it covers.

use std::collections::BTreeMap;

/// Buffered writes plus the capacity override of one open transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingWrites {
    ranges: BTreeMap<u64, Vec<u8>>,
    capacity_override: Option<u64>,
    /// Lowest length the source was shrunk to; bytes from here up are not
    /// read from the underlying source any more.
    truncate_floor: Option<u64>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when nothing would change on commit.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty() && self.capacity_override.is_none()
    }

    pub fn capacity_override(&self) -> Option<u64> {
        self.capacity_override
    }

    pub fn truncate_floor(&self) -> Option<u64> {
        self.truncate_floor
    }

    /// Number of distinct pending ranges.
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// Total buffered bytes.
    pub fn pending_bytes(&self) -> u64 {
        self.ranges.values().map(|v| v.len() as u64).sum()
    }

    /// Pending ranges in offset order.
    pub fn ranges(&self) -> impl Iterator<Item = (u64, &[u8])> {
        self.ranges.iter().map(|(&k, v)| (k, v.as_slice()))
    }

    /// Registers a write; the newest write wins for every byte it covers.
    pub fn insert(&mut self, offset: u64, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        let end = offset + data.len() as u64;
        self.remove_range(offset, end);

        let mut start = offset;
        let mut bytes = data.to_vec();

        let adjacent_prev = self
            .ranges
            .range(..offset)
            .next_back()
            .filter(|&(&k, v)| k + v.len() as u64 == offset)
            .map(|(&k, _)| k);
        if let Some(k) = adjacent_prev {
            if let Some(mut prev) = self.ranges.remove(&k) {
                prev.extend_from_slice(&bytes);
                bytes = prev;
                start = k;
            }
        }
        if let Some(next) = self.ranges.remove(&end) {
            bytes.extend_from_slice(&next);
        }

        self.ranges.insert(start, bytes);
    }

    /// Copies every pending byte that falls inside `[offset, offset + buf.len())`
    /// over the matching position in `buf`.
    pub fn overlay_onto(&self, offset: u64, buf: &mut [u8]) {
        let end = offset + buf.len() as u64;
        for (start, bytes) in self.overlapping(offset, end) {
            let from = start.max(offset);
            let to = (start + bytes.len() as u64).min(end);
            let src = &bytes[(from - start) as usize..(to - start) as usize];
            buf[(from - offset) as usize..(to - offset) as usize].copy_from_slice(src);
        }
    }

    /// Records a new apparent capacity. Pending bytes beyond it are dropped.
    pub fn set_capacity(&mut self, capacity: u64) {
        self.remove_range(capacity, u64::MAX);
        self.capacity_override = Some(capacity);
        self.truncate_floor = Some(match self.truncate_floor {
            Some(floor) => floor.min(capacity),
            None => capacity,
        });
    }

    /// Drops all pending state.
    pub fn clear(&mut self) {
        self.ranges.clear();
        self.capacity_override = None;
        self.truncate_floor = None;
    }

    fn overlapping(&self, start: u64, end: u64) -> Vec<(u64, &Vec<u8>)> {
        let mut found = Vec::new();
        if let Some((&k, v)) = self.ranges.range(..start).next_back() {
            if k + v.len() as u64 > start {
                found.push((k, v));
            }
        }
        found.extend(self.ranges.range(start..end).map(|(&k, v)| (k, v)));
        found
    }

    /// Cuts `[start, end)` out of every pending range, keeping the parts outside it.
    fn remove_range(&mut self, start: u64, end: u64) {
        let keys: Vec<u64> = self
            .overlapping(start, end)
            .into_iter()
            .map(|(k, _)| k)
            .collect();

        for k in keys {
            let Some(bytes) = self.ranges.remove(&k) else {
                continue;
            };
            let range_end = k + bytes.len() as u64;
            if k < start {
                self.ranges.insert(k, bytes[..(start - k) as usize].to_vec());
            }
            if range_end > end {
                self.ranges.insert(end, bytes[(end - k) as usize..].to_vec());
            }
        }
    }
}
