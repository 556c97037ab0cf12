//! Chunk store
//!
//! A store lays chunks out over a byte source:
//!
//! ```text
//! +-------+---------+------------+-------+-------+-----
//! | magic | version | root chunk | chunk | chunk | ...
//! | CHNK  | 1 B     | (offset 5) |       |       |
//! +-------+---------+------------+-------+-------+-----
//! ```
//!
//! Chunks tile the source: every header starts where the previous payload
//! ends, so the whole store can be walked from the root. Chains are formed
//! by next pointers and may jump anywhere.
//!
//! # Invariants
//!
//! - Every cached header equals the header bytes in the source
//! - No two free chunks are adjacent
//! - The last chunk of the source is never free
//! - The root chunk is never freed
//!
//! All mutations write through to the source immediately; durability is
//! up to [`Store::flush`].

mod cache;
mod free_list;
mod transaction;

pub use cache::ChunkCache;
pub use free_list::FreeList;
pub use transaction::Transaction;

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::chunk::{Chunk, ChunkError, ChunkErrorCode, ChunkIo, ChunkPointer, ChunkResult};
use crate::config::StoreConfig;
use crate::observability::{
    event_enabled, log_event_with_fields, Event, MetricsRegistry, ObservationScope,
};
use crate::source::{ByteSource, FileSource, MemorySource};
use crate::transaction::{CommitSummary, TransactionToken, TxSource};
use crate::word::WordWidth;

/// Leading bytes of every store.
pub const STORE_MAGIC: [u8; 4] = *b"CHNK";
pub const FORMAT_VERSION: u8 = 1;
pub const PREAMBLE_LEN: u64 = 5;

/// The root chunk always sits right behind the preamble.
pub const ROOT_PTR: ChunkPointer = ChunkPointer::new(PREAMBLE_LEN);

/// Extra capacity a reused chunk must have so its next field can be widened.
const LINK_HEADROOM: u64 = 8;

/// How a chain grows when its tail cannot absorb the new bytes in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    /// The chain gains exactly the requested capacity.
    Exact,
    /// New chunks get at least `min_chunk_capacity`, to amortize later appends.
    Amortized,
}

/// Totals from a full scan of the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub length: u64,
    pub chunks: usize,
    pub used_chunks: usize,
    pub free_chunks: usize,
    pub free_bytes: u64,
    pub cached_headers: usize,
}

/// Chunk allocator and header cache over a transactional byte source.
#[derive(Debug)]
pub struct Store<S: ByteSource> {
    source: TxSource<S>,
    cache: ChunkCache,
    config: StoreConfig,
    free: FreeList,
    /// Free list as it was when the open transaction began.
    saved_free: Option<FreeList>,
    metrics: MetricsRegistry,
}

impl<S: ByteSource> Store<S> {
    fn with_source(source: S, config: StoreConfig) -> Self {
        Self {
            source: TxSource::new(source),
            cache: ChunkCache::new(config.cache_capacity),
            config,
            free: FreeList::new(),
            saved_free: None,
            metrics: MetricsRegistry::new(),
        }
    }

    /// Initializes a new store on `source`, discarding whatever it held.
    pub fn create(source: S, config: StoreConfig) -> ChunkResult<Self> {
        let mut store = Self::with_source(source, config);
        store.source.resize(0)?;
        store.source.resize(PREAMBLE_LEN)?;
        store.source.write_range(0, &preamble())?;

        let root = store.append_chunk(store.config.root_capacity)?;
        debug_assert_eq!(root.ptr(), ROOT_PTR);
        store.source.flush()?;

        log_event_with_fields(
            Event::StoreCreated,
            &[("root_capacity", root.capacity().to_string().as_str())],
        );
        Ok(store)
    }

    /// Opens an existing store, rebuilding the free list from a full scan.
    pub fn open(source: S, config: StoreConfig) -> ChunkResult<Self> {
        let scope = ObservationScope::new("STORE_OPEN");
        let mut store = Self::with_source(source, config);
        match store.load() {
            Ok(chunks) => {
                scope.complete_with_fields(&[
                    ("chunks", chunks.to_string().as_str()),
                    ("free_chunks", store.free.len().to_string().as_str()),
                ]);
                log_event_with_fields(
                    Event::StoreOpened,
                    &[("length", store.source.length()?.to_string().as_str())],
                );
                Ok(store)
            }
            Err(err) => {
                scope.fail_fatal(&err.to_string());
                Err(err)
            }
        }
    }

    fn load(&mut self) -> ChunkResult<usize> {
        let length = self.source.length()?;
        if length < PREAMBLE_LEN {
            return Err(ChunkError::invalid_store(format!(
                "source holds {} bytes, the preamble alone needs {}",
                length, PREAMBLE_LEN
            )));
        }
        let mut head = [0u8; PREAMBLE_LEN as usize];
        self.source.read_range(0, &mut head)?;
        if head[..4] != STORE_MAGIC {
            return Err(ChunkError::invalid_store("missing store magic"));
        }
        if head[4] != FORMAT_VERSION {
            return Err(ChunkError::invalid_store(format!(
                "unsupported format version {}",
                head[4]
            )));
        }

        let chunks = self.chunks()?;
        match chunks.first() {
            None => return Err(ChunkError::invalid_store("store has no root chunk")),
            Some(root) if !root.is_used() => {
                return Err(ChunkError::invalid_store("root chunk is marked free"))
            }
            Some(_) => {}
        }

        self.free.clear();
        for chunk in chunks.iter().filter(|c| !c.is_used()) {
            self.free.insert(chunk.ptr(), chunk.capacity());
        }
        Ok(chunks.len())
    }

    pub fn root(&self) -> ChunkPointer {
        ROOT_PTR
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    pub fn free_list(&self) -> &FreeList {
        &self.free
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// The backing source as last committed; pending writes are not visible.
    pub fn source(&self) -> &S {
        self.source.raw()
    }

    /// Unwraps the backing source. Pending writes of an open transaction are lost.
    pub fn into_source(self) -> S {
        self.source.into_inner()
    }

    /// Apparent length of the store, pending writes included.
    pub fn length(&self) -> ChunkResult<u64> {
        Ok(self.source.length()?)
    }

    pub fn flush(&mut self) -> ChunkResult<()> {
        self.source.flush()?;
        Ok(())
    }

    pub(crate) fn read_payload(&mut self, offset: u64, buf: &mut [u8]) -> ChunkResult<()> {
        self.source.read_range(offset, buf)?;
        self.metrics.add_bytes_read(buf.len() as u64);
        Ok(())
    }

    pub(crate) fn write_payload(&mut self, offset: u64, data: &[u8]) -> ChunkResult<()> {
        self.source.write_range(offset, data)?;
        self.metrics.add_bytes_written(data.len() as u64);
        Ok(())
    }

    // ==================
    // Headers
    // ==================

    /// Loads the header at `ptr`, from the cache when possible.
    pub fn chunk(&mut self, ptr: ChunkPointer) -> ChunkResult<Chunk> {
        let ptr = ptr.require_non_null()?;
        if let Some(cached) = self.cache.get(ptr) {
            let cached = cached.clone();
            self.metrics.increment_cache_hits();
            if self.config.validate_cache_hits {
                self.check_cached(&cached)?;
            }
            return Ok(cached);
        }

        self.metrics.increment_cache_misses();
        let length = self.source.length()?;
        if ptr < ROOT_PTR || ptr.value() >= length {
            return Err(ChunkError::not_a_chunk(
                ptr,
                format!("outside the chunk area [{}, {})", ROOT_PTR, length),
            ));
        }
        let chunk = Chunk::read(&mut self.source, ptr).map_err(|err| {
            if err.code() == ChunkErrorCode::EndOfStream {
                ChunkError::not_a_chunk(ptr, "header runs past the end of the store")
            } else {
                err
            }
        })?;
        self.cache.put(&chunk);
        Ok(chunk)
    }

    /// Writes a modified header through to the source and refreshes the cache.
    ///
    /// Capacity changes must go through the store or [`ChunkIo`]; writing a
    /// header with a different `data_end` breaks the tiling.
    pub fn write_chunk(&mut self, chunk: &mut Chunk) -> ChunkResult<()> {
        if chunk.sync(&mut self.source)? {
            self.metrics.increment_headers_synced();
        }
        self.cache.put(chunk);
        Ok(())
    }

    fn check_cached(&mut self, cached: &Chunk) -> ChunkResult<()> {
        let ptr = cached.ptr();
        match Chunk::read(&mut self.source, ptr) {
            Ok(stored) if stored.same_header(cached) => Ok(()),
            _ => {
                self.cache.remove(ptr);
                log_event_with_fields(Event::CacheMismatch, &[("chunk_ptr", ptr.to_string().as_str())]);
                Err(ChunkError::cache_mismatch(ptr))
            }
        }
    }

    /// Re-reads every cached header and fails on the first one that differs
    /// from the source. Returns the number of headers checked.
    pub fn validate_cache(&mut self) -> ChunkResult<usize> {
        let ptrs = self.cache.pointers();
        for &ptr in &ptrs {
            if let Some(cached) = self.cache.get(ptr).cloned() {
                self.check_cached(&cached)?;
            }
        }
        Ok(ptrs.len())
    }

    /// Every chunk of the store in address order, read straight from the source.
    pub fn chunks(&mut self) -> ChunkResult<Vec<Chunk>> {
        let length = self.source.length()?;
        let mut found = Vec::new();
        let mut ptr = ROOT_PTR;
        while ptr.value() < length {
            let chunk = match Chunk::read(&mut self.source, ptr) {
                Ok(chunk) if chunk.data_end() <= length => chunk,
                Ok(_) => {
                    return Err(self.corruption(ptr, "payload runs past the end of the store"))
                }
                Err(err) if err.code() == ChunkErrorCode::EndOfStream => {
                    return Err(self.corruption(ptr, "header runs past the end of the store"))
                }
                Err(err) => {
                    log_event_with_fields(
                        Event::HeaderCorruption,
                        &[("chunk_ptr", ptr.to_string().as_str()), ("reason", err.message())],
                    );
                    return Err(err);
                }
            };
            ptr = ChunkPointer::new(chunk.data_end());
            found.push(chunk);
        }
        Ok(found)
    }

    fn corruption(&self, ptr: ChunkPointer, reason: &str) -> ChunkError {
        log_event_with_fields(
            Event::HeaderCorruption,
            &[("chunk_ptr", ptr.to_string().as_str()), ("reason", reason)],
        );
        ChunkError::malformed_header(ptr, reason)
    }

    pub fn stats(&mut self) -> ChunkResult<StoreStats> {
        let chunks = self.chunks()?;
        let used_chunks = chunks.iter().filter(|c| c.is_used()).count();
        Ok(StoreStats {
            length: self.source.length()?,
            chunks: chunks.len(),
            used_chunks,
            free_chunks: chunks.len() - used_chunks,
            free_bytes: self.free.free_bytes(),
            cached_headers: self.cache.len(),
        })
    }

    // ==================
    // Chains
    // ==================

    /// All chunks of the chain starting at `head`, in chain order.
    pub fn chain(&mut self, head: ChunkPointer) -> ChunkResult<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(head);
        while let Some(ptr) = next {
            if !seen.insert(ptr) {
                return Err(ChunkError::malformed_header(ptr, "chain loops back on itself"));
            }
            let chunk = self.chunk(ptr)?;
            if !chunk.is_used() {
                return Err(ChunkError::malformed_header(ptr, "chain runs into a free chunk"));
            }
            next = chunk.next();
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    /// Allocates the head of a new chain.
    pub fn new_chain(&mut self, capacity: u64) -> ChunkResult<ChunkPointer> {
        Ok(self.allocate(capacity)?.ptr())
    }

    /// Stream view over the chain starting at `head`.
    pub fn io(&mut self, head: ChunkPointer) -> ChunkResult<ChunkIo<'_, S>> {
        ChunkIo::new(self, head)
    }

    /// CRC32 of the logical contents of a chain.
    pub fn chain_checksum(&mut self, head: ChunkPointer) -> ChunkResult<u32> {
        let mut hasher = crc32fast::Hasher::new();
        let mut io = self.io(head)?;
        let mut buf = [0u8; 4096];
        loop {
            let n = io.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(hasher.finalize())
    }

    /// Points `from` at `to`, or makes it a tail with `None`.
    ///
    /// Chunks that were behind `from` are not freed. When the next field has
    /// to widen, the payload moves back to make room and must still fit.
    /// A linked chunk is read in full, so its unwritten room is zeroed and
    /// counted in its size.
    pub fn link(&mut self, from: ChunkPointer, to: Option<ChunkPointer>) -> ChunkResult<()> {
        let mut chunk = self.chunk(from)?;
        if let Some(to) = to {
            if !self.chunk(to)?.is_used() {
                return Err(ChunkError::not_a_chunk(to, "link target is a free chunk"));
            }
            let width = WordWidth::for_unsigned(to.value());
            let delta = chunk.next_width_delta(width);
            if delta > 0 {
                if chunk.size() + delta as u64 > chunk.capacity() {
                    return Err(ChunkError::header_overflow(
                        from,
                        delta,
                        chunk.capacity() - chunk.size(),
                    ));
                }
                self.widen_next_field(&mut chunk, width)?;
            }
            self.zero_range(chunk.data_start() + chunk.size(), chunk.remaining())?;
            chunk.set_size(chunk.capacity());
        }
        chunk.set_next(to)?;
        self.write_chunk(&mut chunk)
    }

    fn zero_range(&mut self, mut offset: u64, len: u64) -> ChunkResult<()> {
        const ZEROS: [u8; 4096] = [0u8; 4096];
        let end = offset + len;
        while offset < end {
            let n = (end - offset).min(ZEROS.len() as u64) as usize;
            self.source.write_range(offset, &ZEROS[..n])?;
            offset += n as u64;
        }
        Ok(())
    }

    /// Adds `extra` bytes of capacity behind the tail chunk `tail_ptr`.
    ///
    /// A tail that ends the source grows in place; otherwise a successor is
    /// allocated and linked. The old tail gives its unwritten room to the
    /// successor, so the logical size of the chain does not change. Returns
    /// the chain's tail afterwards.
    ///
    /// # Panics
    ///
    /// If `tail_ptr` is not the tail of its chain.
    pub fn grow_chain(
        &mut self,
        tail_ptr: ChunkPointer,
        extra: u64,
        growth: Growth,
    ) -> ChunkResult<ChunkPointer> {
        let mut tail = self.chunk(tail_ptr)?;
        assert!(tail.is_tail(), "chunk {} is not the tail of its chain", tail_ptr);
        if extra == 0 {
            return Ok(tail_ptr);
        }

        let length = self.source.length()?;
        let grown = tail.capacity().checked_add(extra).ok_or_else(|| {
            ChunkError::new(ChunkErrorCode::OutOfBitDepth, "chain capacity overflows u64")
        })?;

        if tail.data_end() == length && tail.body_width().can_fit(grown) {
            self.source.resize(length + extra)?;
            tail.set_capacity(grown)?;
            self.write_chunk(&mut tail)?;
            self.metrics.increment_chains_grown_in_place();
            trace_chunk(Event::ChainGrownInPlace, &tail);
            return Ok(tail_ptr);
        }

        // the successor lands at or below the current end
        let link_width = WordWidth::for_unsigned(length);
        let delta = tail.next_width_delta(link_width);
        if delta as u64 > tail.capacity() {
            return Err(ChunkError::header_overflow(tail_ptr, delta, tail.capacity()));
        }

        // a chained chunk is read in full: keep only the written bytes plus
        // room for the wider next field
        let keep = tail.capacity().min(tail.size() + delta as u64);
        let slack = tail.capacity() - keep;
        if slack > 0 {
            self.shrink_chunk(&mut tail, keep)?;
        }

        let wanted = extra + slack + delta as u64;
        let mut successor = match growth {
            Growth::Exact => self.allocate_exact(wanted)?,
            Growth::Amortized => self.allocate(wanted)?,
        };
        if delta > 0 {
            let spill = self.widen_next_field(&mut tail, link_width)?;
            if !spill.is_empty() {
                self.source.write_range(successor.data_start(), &spill)?;
                successor.set_size(spill.len() as u64);
            }
        }
        debug_assert_eq!(tail.size(), tail.capacity());
        tail.set_next(Some(successor.ptr()))?;
        self.write_chunk(&mut tail)?;
        self.write_chunk(&mut successor)?;

        self.metrics.increment_chains_linked();
        trace_chunk(Event::ChainLinked, &successor);
        Ok(successor.ptr())
    }

    /// Cuts the chain at `ptr` down to `capacity` bytes in that chunk.
    ///
    /// Everything behind `ptr` is freed and the unused part of its payload
    /// becomes a free chunk.
    ///
    /// # Panics
    ///
    /// If `capacity` exceeds the chunk's current capacity.
    pub fn truncate_at(&mut self, ptr: ChunkPointer, capacity: u64) -> ChunkResult<()> {
        let mut chunk = self.chunk(ptr)?;
        assert!(
            capacity <= chunk.capacity(),
            "cannot truncate chunk {} of capacity {} to {}",
            ptr,
            chunk.capacity(),
            capacity
        );
        let behind: Vec<ChunkPointer> = match chunk.next() {
            Some(next) => self.chain(next)?.iter().map(Chunk::ptr).collect(),
            None => Vec::new(),
        };

        chunk.set_next(None)?;
        if capacity < chunk.capacity() {
            self.shrink_chunk(&mut chunk, capacity)?;
        } else {
            self.write_chunk(&mut chunk)?;
        }
        if !behind.is_empty() {
            self.free(&behind)?;
        }
        trace_chunk(Event::ChainTruncated, &chunk);
        Ok(())
    }

    /// Moves the payload of `chunk` back so its next field can widen to
    /// `width`. Returns the bytes that no longer fit.
    ///
    /// The header itself is left for the caller to write.
    fn widen_next_field(&mut self, chunk: &mut Chunk, width: WordWidth) -> ChunkResult<Vec<u8>> {
        let mut payload = vec![0u8; chunk.size() as usize];
        self.source.read_range(chunk.data_start(), &mut payload)?;
        let delta = chunk.widen_next(width)?;
        let keep = chunk.size() as usize;
        self.source.write_range(chunk.data_start(), &payload[..keep])?;

        self.metrics.increment_headers_widened();
        if event_enabled(Event::HeaderWidened) {
            log_event_with_fields(
                Event::HeaderWidened,
                &[
                    ("chunk_ptr", chunk.ptr().to_string().as_str()),
                    ("delta", delta.to_string().as_str()),
                    ("width", width.name()),
                ],
            );
        }
        Ok(payload.split_off(keep))
    }

    // ==================
    // Allocation
    // ==================

    /// A used, empty chunk with at least `min_capacity` bytes.
    ///
    /// Never smaller than `min_chunk_capacity`.
    pub fn allocate(&mut self, min_capacity: u64) -> ChunkResult<Chunk> {
        let capacity = min_capacity.max(self.config.min_chunk_capacity);
        match self.reuse_free(capacity, false)? {
            Some(chunk) => Ok(chunk),
            None => self.append_chunk(capacity),
        }
    }

    /// A used, empty chunk of exactly `capacity` bytes.
    pub fn allocate_exact(&mut self, capacity: u64) -> ChunkResult<Chunk> {
        match self.reuse_free(capacity, true)? {
            Some(chunk) => Ok(chunk),
            None => self.append_chunk(capacity),
        }
    }

    fn reuse_free(&mut self, capacity: u64, exact: bool) -> ChunkResult<Option<Chunk>> {
        if !self.config.reuse_free_chunks {
            return Ok(None);
        }
        let Some(ptr) = self.free.first_fit(capacity.saturating_add(LINK_HEADROOM)) else {
            return Ok(None);
        };
        let length = self.source.length()?;
        self.free.remove(ptr);

        let mut chunk = self.chunk(ptr)?;
        chunk.set_used(true);
        chunk.set_size(0);
        chunk.set_next(None)?;
        chunk.widen_next(headroom_width(length))?;

        let spare = chunk.capacity() - capacity;
        if spare > 0 && (exact || spare >= self.config.split_threshold) {
            self.shrink_chunk(&mut chunk, capacity)?;
        } else {
            self.write_chunk(&mut chunk)?;
        }

        self.metrics.increment_chunks_reused();
        trace_chunk(Event::ChunkReused, &chunk);
        Ok(Some(chunk))
    }

    fn append_chunk(&mut self, capacity: u64) -> ChunkResult<Chunk> {
        let ptr = ChunkPointer::new(self.source.length()?);
        let body_width = WordWidth::for_unsigned(capacity);

        // wide enough for the end of the store once this chunk exists
        let mut next_width = WordWidth::Void;
        loop {
            let end = ptr.value() + Chunk::header_len_for(body_width, next_width) as u64 + capacity;
            let wanted = headroom_width(end);
            if wanted <= next_width {
                break;
            }
            next_width = wanted;
        }

        let mut chunk = Chunk::new(ptr, body_width, next_width, capacity)?;
        self.source.resize(chunk.data_end())?;
        self.write_chunk(&mut chunk)?;

        self.metrics.increment_chunks_allocated();
        trace_chunk(Event::ChunkAllocated, &chunk);
        Ok(chunk)
    }

    /// Gives the payload bytes past `capacity` back as a free chunk.
    fn shrink_chunk(&mut self, chunk: &mut Chunk, capacity: u64) -> ChunkResult<()> {
        let spare = chunk.capacity() - capacity;
        let at = ChunkPointer::new(chunk.data_start() + capacity);
        chunk.set_capacity(capacity)?;
        self.write_chunk(chunk)?;

        let released = self.release(at, spare)?;
        self.metrics.increment_chunks_split();
        if event_enabled(Event::ChunkSplit) {
            log_event_with_fields(
                Event::ChunkSplit,
                &[
                    ("chunk_ptr", chunk.ptr().to_string().as_str()),
                    ("free_ptr", released.to_string().as_str()),
                ],
            );
        }
        self.trim_tail()
    }

    /// Marks every chunk in `ptrs` unused and merges it with free neighbors.
    ///
    /// Already free chunks are skipped. Free chunks ending the store are cut
    /// off the source.
    ///
    /// # Panics
    ///
    /// If `ptrs` contains the root chunk.
    pub fn free(&mut self, ptrs: &[ChunkPointer]) -> ChunkResult<()> {
        let mut ptrs = ptrs.to_vec();
        ptrs.sort_unstable();
        ptrs.dedup();

        for ptr in ptrs {
            assert_ne!(ptr, ROOT_PTR, "the root chunk cannot be freed");
            let chunk = self.chunk(ptr)?;
            if !chunk.is_used() {
                continue;
            }
            self.release(ptr, chunk.data_end() - ptr.value())?;
            self.metrics.add_chunks_freed(1);
            trace_chunk(Event::ChunkFreed, &chunk);
        }
        self.trim_tail()
    }

    /// Turns `[start, start + span)` into a single free chunk, absorbing free
    /// neighbors on both sides. Returns where the free chunk starts.
    fn release(&mut self, start: ChunkPointer, span: u64) -> ChunkResult<ChunkPointer> {
        let mut first = start;
        let mut end = start.value() + span;

        if let Some(prev) = self.free.before(start) {
            if self.chunk(prev)?.data_end() == start.value() {
                self.free.remove(prev);
                self.cache.remove(start);
                first = prev;
            }
        }
        loop {
            let next = ChunkPointer::new(end);
            if !self.free.contains(next) {
                break;
            }
            let neighbor = self.chunk(next)?;
            self.free.remove(next);
            self.cache.remove(next);
            end = neighbor.data_end();
        }

        let mut free = Chunk::spanning(first, end - first.value())?;
        self.write_chunk(&mut free)?;
        self.free.insert(first, free.capacity());
        Ok(first)
    }

    /// Cuts a free chunk that ends the store off the source.
    fn trim_tail(&mut self) -> ChunkResult<()> {
        let Some(last) = self.free.last() else {
            return Ok(());
        };
        let chunk = self.chunk(last)?;
        let length = self.source.length()?;
        if chunk.data_end() != length {
            return Ok(());
        }

        self.free.remove(last);
        self.cache.remove(last);
        self.source.resize(last.value())?;
        self.metrics.increment_chunks_trimmed();
        log_event_with_fields(
            Event::StoreTrimmed,
            &[
                ("from", length.to_string().as_str()),
                ("to", last.value().to_string().as_str()),
            ],
        );
        Ok(())
    }

    // ==================
    // Transactions
    // ==================

    pub fn is_in_transaction(&self) -> bool {
        self.source.is_in_transaction()
    }

    /// Opens a transaction; fails if one is already open.
    pub fn begin_transaction(&mut self) -> ChunkResult<TransactionToken> {
        let token = self.source.begin()?;
        self.saved_free = Some(self.free.clone());
        self.metrics.increment_transactions_begun();
        log_event_with_fields(
            Event::TransactionBegin,
            &[("transaction_id", token.id().to_string().as_str())],
        );
        Ok(token)
    }

    /// Applies the pending writes of the open transaction to the source.
    ///
    /// A commit that fails halfway rebuilds the free list from a rescan. If
    /// the rescan fails as well the free list stays empty and the rescan
    /// error is returned, with the commit error as its source.
    pub fn commit(&mut self, token: TransactionToken) -> ChunkResult<CommitSummary> {
        let id = token.id().to_string();
        let scope =
            ObservationScope::with_fields("TRANSACTION_COMMIT", &[("transaction_id", id.as_str())]);
        match self.source.commit(token) {
            Ok(summary) => {
                self.saved_free = None;
                self.metrics.increment_transactions_committed();
                scope.complete_with_fields(&[
                    ("ranges", summary.ranges.to_string().as_str()),
                    ("bytes", summary.bytes.to_string().as_str()),
                ]);
                log_event_with_fields(Event::TransactionCommit, &[("transaction_id", id.as_str())]);
                Ok(summary)
            }
            Err(err) => {
                let mut err = ChunkError::from(err);
                if err.code() != ChunkErrorCode::NoTransaction {
                    // the source may be half written; trust nothing cached
                    self.saved_free = None;
                    self.cache.clear();
                    self.free.clear();
                    if let Err(rescan) = self.load() {
                        log_event_with_fields(
                            Event::HeaderCorruption,
                            &[
                                ("transaction_id", id.as_str()),
                                ("reason", rescan.message()),
                            ],
                        );
                        err = rescan.with_source(err);
                    }
                }
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    /// Discards the pending writes of the open transaction.
    pub fn rollback(&mut self, token: TransactionToken) -> ChunkResult<()> {
        let id = token.id().to_string();
        self.source.rollback(token)?;
        self.cache.clear();
        if let Some(free) = self.saved_free.take() {
            self.free = free;
        }
        self.metrics.increment_transactions_rolled_back();
        log_event_with_fields(Event::TransactionRollback, &[("transaction_id", id.as_str())]);
        Ok(())
    }

    /// Opens a transaction that rolls back unless committed.
    pub fn transaction(&mut self) -> ChunkResult<Transaction<'_, S>> {
        Transaction::begin(self)
    }
}

impl Store<MemorySource> {
    /// A fresh store in memory.
    pub fn in_memory(config: StoreConfig) -> ChunkResult<Self> {
        Self::create(MemorySource::new(), config)
    }
}

impl Store<FileSource> {
    /// Creates (or overwrites) a store file at `path`.
    pub fn create_file(path: &Path, config: StoreConfig) -> ChunkResult<Self> {
        Self::create(FileSource::create(path)?, config)
    }

    pub fn open_file(path: &Path, config: StoreConfig) -> ChunkResult<Self> {
        Self::open(FileSource::open(path)?, config)
    }
}

fn preamble() -> [u8; PREAMBLE_LEN as usize] {
    let mut bytes = [0u8; PREAMBLE_LEN as usize];
    bytes[..4].copy_from_slice(&STORE_MAGIC);
    bytes[4] = FORMAT_VERSION;
    bytes
}

/// Next-field width for a chunk in a store ending at `end`, one step wider
/// than strictly needed so the store can grow before the field must widen.
fn headroom_width(end: u64) -> WordWidth {
    let needed = WordWidth::for_unsigned(end);
    needed.next().unwrap_or(WordWidth::LARGEST)
}

fn trace_chunk(event: Event, chunk: &Chunk) {
    if event_enabled(event) {
        log_event_with_fields(
            event,
            &[
                ("capacity", chunk.capacity().to_string().as_str()),
                ("chunk_ptr", chunk.ptr().to_string().as_str()),
            ],
        );
    }
}
