//! Random-access stream over a chunk chain
//!
//! A chain is read as one logical byte sequence. Every chunk that has a
//! successor counts with its full capacity; the tail counts with its size.
//! The store keeps chained chunks full, so the logical length is the sum of
//! the sizes. Writing past the tail grows the chain through the store.

use std::io::{self, SeekFrom};

use super::errors::{ChunkError, ChunkResult};
use super::header::Chunk;
use super::pointer::ChunkPointer;
use crate::source::ByteSource;
use crate::store::{Growth, Store};
use crate::transaction::{CommitSummary, TransactionToken};
use crate::word::{self, WordWidth};

const ZEROS: [u8; 256] = [0u8; 256];

/// One write of a batch: `len` bytes of `data` starting at `source_offset`,
/// stored at logical offset `target`.
#[derive(Debug, Clone, Copy)]
pub struct ScatterWrite<'d> {
    pub target: u64,
    pub source_offset: usize,
    pub len: usize,
    pub data: &'d [u8],
}

impl<'d> ScatterWrite<'d> {
    /// The whole of `data` at `target`.
    pub fn new(target: u64, data: &'d [u8]) -> Self {
        Self {
            target,
            source_offset: 0,
            len: data.len(),
            data,
        }
    }

    fn bytes(&self) -> ChunkResult<&'d [u8]> {
        self.source_offset
            .checked_add(self.len)
            .and_then(|end| self.data.get(self.source_offset..end))
            .ok_or_else(|| {
                ChunkError::end_of_stream(format!(
                    "scatter write wants {} bytes at {}, source has {}",
                    self.len,
                    self.source_offset,
                    self.data.len()
                ))
            })
    }
}

/// Cursor over the chain starting at `head`.
///
/// The cursor keeps the header of the chunk it is in; operations that change
/// the chain through the store directly should be followed by [`ChunkIo::reload`].
pub struct ChunkIo<'a, S: ByteSource> {
    store: &'a mut Store<S>,
    head: ChunkPointer,
    current: Chunk,
    /// Logical offset of the first payload byte of `current`
    chunk_start: u64,
    position: u64,
}

impl<'a, S: ByteSource> ChunkIo<'a, S> {
    pub fn new(store: &'a mut Store<S>, head: ChunkPointer) -> ChunkResult<Self> {
        let current = store.chunk(head)?;
        if !current.is_used() {
            return Err(ChunkError::not_a_chunk(head, "chain head is a free chunk"));
        }
        Ok(Self {
            store,
            head,
            current,
            chunk_start: 0,
            position: 0,
        })
    }

    pub fn head(&self) -> ChunkPointer {
        self.head
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the cursor; the chain is walked on the next read or write.
    pub fn set_position(&mut self, position: u64) {
        self.position = position;
    }

    /// Moves the cursor and walks to the chunk holding `position`.
    pub fn seek(&mut self, position: u64) -> ChunkResult<()> {
        self.position = position;
        self.settle()
    }

    /// The store underneath. Call [`ChunkIo::reload`] after changing the
    /// chain through it.
    pub fn store(&mut self) -> &mut Store<S> {
        self.store
    }

    /// Re-reads the header of the chunk under the cursor.
    pub fn reload(&mut self) -> ChunkResult<()> {
        self.current = self.store.chunk(self.current.ptr())?;
        Ok(())
    }

    fn rewind_cursor(&mut self) -> ChunkResult<()> {
        self.current = self.store.chunk(self.head)?;
        self.chunk_start = 0;
        Ok(())
    }

    /// Walks to the chunk holding `position`, or to the tail when the
    /// position lies past every chunk.
    fn settle(&mut self) -> ChunkResult<()> {
        if self.position < self.chunk_start {
            self.rewind_cursor()?;
        }
        while let Some(next) = self.current.next() {
            let end = self.chunk_start + self.current.capacity();
            if self.position < end {
                break;
            }
            self.chunk_start = end;
            self.current = self.store.chunk(next)?;
        }
        Ok(())
    }

    // ==================
    // Reading
    // ==================

    /// Reads at most one chunk's worth of bytes. Returns 0 at the end of the chain.
    pub fn read(&mut self, buf: &mut [u8]) -> ChunkResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.settle()?;
        let end = self.chunk_start + self.current.effective_capacity();
        if self.position >= end {
            return Ok(0);
        }

        let offset = self.position - self.chunk_start;
        let n = (end - self.position).min(buf.len() as u64) as usize;
        self.store
            .read_payload(self.current.data_start() + offset, &mut buf[..n])?;
        self.position += n as u64;
        Ok(n)
    }

    /// Reads until `buf` is full or the chain ends. Returns the bytes read.
    pub fn read_fully(&mut self, buf: &mut [u8]) -> ChunkResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        Ok(filled)
    }

    /// Fills `buf` completely or fails with `EndOfStream`.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> ChunkResult<()> {
        let start = self.position;
        let filled = self.read_fully(buf)?;
        if filled < buf.len() {
            return Err(ChunkError::end_of_stream(format!(
                "wanted {} bytes, chain has {}",
                buf.len(),
                filled
            ))
            .with_details(format!("byte_offset: {}", start)));
        }
        Ok(())
    }

    /// Everything from the cursor to the end of the chain.
    pub fn read_to_vec(&mut self) -> ChunkResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = self.read(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Reads a big-endian word. On `EndOfStream` the cursor does not move.
    pub fn read_word(&mut self, width: WordWidth) -> ChunkResult<u64> {
        let start = self.position;
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..width.bytes()];
        if let Err(err) = self.read_exact(bytes) {
            self.position = start;
            return Err(err);
        }
        Ok(word::read_word(width, bytes)?)
    }

    // ==================
    // Writing
    // ==================

    /// Writes all of `buf` at the cursor, growing the chain as needed.
    ///
    /// A cursor past the end of the chain zero-fills the gap first.
    pub fn write(&mut self, buf: &[u8]) -> ChunkResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.settle()?;
        if self.current.is_tail() {
            let end = self.chunk_start + self.current.size();
            if self.position > end {
                let target = self.position;
                self.position = end;
                self.fill_zero(target - end)?;
            }
        }

        let mut written = 0;
        while written < buf.len() {
            self.settle()?;
            let offset = self.position - self.chunk_start;
            if offset >= self.current.capacity() {
                self.ensure_forward_capacity((buf.len() - written) as u64)?;
                continue;
            }

            let n = (self.current.capacity() - offset).min((buf.len() - written) as u64);
            let chunk_bytes = &buf[written..written + n as usize];
            self.store
                .write_payload(self.current.data_start() + offset, chunk_bytes)?;
            if offset + n > self.current.size() {
                self.current.set_size(offset + n);
                self.store.write_chunk(&mut self.current)?;
            }
            self.position += n;
            written += n as usize;
        }
        Ok(written)
    }

    /// Gives the full tail under the cursor room for `extra` more bytes.
    fn ensure_forward_capacity(&mut self, extra: u64) -> ChunkResult<()> {
        debug_assert!(self.current.is_tail());
        self.store
            .grow_chain(self.current.ptr(), extra, Growth::Amortized)?;
        self.reload()
    }

    /// Writes a big-endian word; fails with `OutOfBitDepth` if it does not fit.
    pub fn write_word(&mut self, value: u64, width: WordWidth) -> ChunkResult<()> {
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..width.bytes()];
        word::write_word_checked(width, bytes, value)?;
        self.write(bytes)?;
        Ok(())
    }

    /// Writes `count` zero bytes at the cursor.
    pub fn fill_zero(&mut self, mut count: u64) -> ChunkResult<()> {
        while count > 0 {
            let n = count.min(ZEROS.len() as u64) as usize;
            self.write(&ZEROS[..n])?;
            count -= n as u64;
        }
        Ok(())
    }

    /// Applies every write of `batch`, growing the chain once up front.
    ///
    /// Leaves the cursor behind the last write.
    pub fn write_batch(&mut self, batch: &[ScatterWrite<'_>]) -> ChunkResult<()> {
        let mut needed = 0;
        for write in batch {
            let len = write.bytes()?.len() as u64;
            needed = needed.max(write.target + len);
        }
        if needed > self.capacity()? {
            self.set_capacity(needed)?;
        }
        for write in batch {
            self.set_position(write.target);
            self.write(write.bytes()?)?;
        }
        Ok(())
    }

    // ==================
    // Capacity
    // ==================

    /// Logical length of the chain. Walks the whole chain.
    pub fn size(&mut self) -> ChunkResult<u64> {
        let chain = self.store.chain(self.head)?;
        Ok(chain.iter().map(Chunk::size).sum())
    }

    /// Payload bytes the chain holds without growing. Walks the whole chain.
    pub fn capacity(&mut self) -> ChunkResult<u64> {
        let chain = self.store.chain(self.head)?;
        Ok(chain.iter().map(Chunk::capacity).sum())
    }

    /// Truncates or grows the chain to exactly `target` bytes of capacity.
    ///
    /// Truncation frees every chunk behind the cut. The cursor is kept even
    /// if it now lies past the end.
    pub fn set_capacity(&mut self, target: u64) -> ChunkResult<()> {
        let chain = self.store.chain(self.head)?;
        let mut start = 0;
        for chunk in &chain {
            let end = start + chunk.capacity();
            if target < end || (target == end && !chunk.is_tail()) {
                self.store.truncate_at(chunk.ptr(), target - start)?;
                return self.rewind_cursor();
            }
            start = end;
        }

        if target > start {
            if let Some(tail) = chain.last() {
                self.store.grow_chain(tail.ptr(), target - start, Growth::Exact)?;
            }
        }
        self.rewind_cursor()
    }

    // ==================
    // Transactions
    // ==================

    pub fn is_in_transaction(&self) -> bool {
        self.store.is_in_transaction()
    }

    pub fn open_transaction(&mut self) -> ChunkResult<TransactionToken> {
        self.store.begin_transaction()
    }

    pub fn commit(&mut self, token: TransactionToken) -> ChunkResult<CommitSummary> {
        let summary = self.store.commit(token)?;
        self.rewind_cursor()?;
        Ok(summary)
    }

    /// Rolls back and re-reads the head. Fails if the head itself did not
    /// exist before the transaction.
    pub fn rollback(&mut self, token: TransactionToken) -> ChunkResult<()> {
        self.store.rollback(token)?;
        self.rewind_cursor()
    }
}

impl<S: ByteSource> io::Read for ChunkIo<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(ChunkIo::read(self, buf)?)
    }
}

impl<S: ByteSource> io::Write for ChunkIo<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(ChunkIo::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.store.flush()?)
    }
}

impl<S: ByteSource> io::Seek for ChunkIo<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => {
                ChunkIo::seek(self, offset)?;
                return Ok(offset);
            }
            SeekFrom::End(delta) => (self.size()?, delta),
            SeekFrom::Current(delta) => (self.position, delta),
        };
        let target = base.checked_add_signed(delta).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of chain")
        })?;
        ChunkIo::seek(self, target)?;
        Ok(target)
    }
}
