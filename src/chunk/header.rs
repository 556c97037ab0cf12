//! In-memory chunk header
//!
//! ```text
//! +-------+----------------+----------------+----------------+---------------+
//! | flags | capacity       | size           | next           | payload ...   |
//! | 1 B   | body_width B   | body_width B   | next_width B   | capacity B    |
//! +-------+----------------+----------------+----------------+---------------+
//! ```
//!
//! All words are big-endian. A next field of zero (or of width VOID) means
//! the chunk is the tail of its chain.

use super::errors::{ChunkError, ChunkResult};
use super::flags::HeaderFlags;
use super::pointer::ChunkPointer;
use crate::source::ByteSource;
use crate::store::Store;
use crate::word::{self, WordWidth};

/// Widest possible header: flags plus two LONG body words and a LONG next word.
pub const MAX_HEADER_LEN: usize = 1 + 3 * 8;

/// Header of a LONG-bodied chunk without a next field.
const MAX_BODY_HEADER_LEN: u64 = 1 + 2 * 8;

/// One chunk header as loaded from (or destined for) a source.
///
/// Mutators only touch the in-memory copy and mark it dirty;
/// [`Chunk::sync`] writes it back.
#[derive(Debug, Clone)]
pub struct Chunk {
    ptr: ChunkPointer,
    used: bool,
    body_width: WordWidth,
    next_width: WordWidth,
    capacity: u64,
    size: u64,
    next: Option<ChunkPointer>,
    header_len: usize,
    dirty: bool,
}

impl Chunk {
    /// A new, used, empty chunk. Fails if `capacity` does not fit `body_width`.
    pub fn new(
        ptr: ChunkPointer,
        body_width: WordWidth,
        next_width: WordWidth,
        capacity: u64,
    ) -> ChunkResult<Self> {
        body_width.ensure_can_fit(capacity)?;
        Ok(Self {
            ptr,
            used: true,
            body_width,
            next_width,
            capacity,
            size: 0,
            next: None,
            header_len: Self::header_len_for(body_width, next_width),
            dirty: true,
        })
    }

    /// An unused, unlinked chunk whose header and payload cover exactly
    /// `span` bytes starting at `ptr`.
    ///
    /// Any span of at least one byte has such a layout.
    pub fn spanning(ptr: ChunkPointer, span: u64) -> ChunkResult<Self> {
        assert!(span > 0, "a chunk needs at least one byte");
        let (body_width, next_width, capacity) = match span {
            1 => (WordWidth::Void, WordWidth::Void, 0),
            2 => (WordWidth::Void, WordWidth::Byte, 0),
            _ => WordWidth::ALL[1..]
                .iter()
                .map(|&width| (width, Self::header_len_for(width, WordWidth::Void) as u64))
                .find(|&(width, header)| span >= header && width.can_fit(span - header))
                .map(|(width, header)| (width, WordWidth::Void, span - header))
                .unwrap_or_else(|| {
                    (WordWidth::LARGEST, WordWidth::Void, span - MAX_BODY_HEADER_LEN)
                }),
        };
        let mut chunk = Self::new(ptr, body_width, next_width, capacity)?;
        chunk.used = false;
        Ok(chunk)
    }

    pub fn header_len_for(body_width: WordWidth, next_width: WordWidth) -> usize {
        1 + 2 * body_width.bytes() + next_width.bytes()
    }

    /// Reads and validates the header at `ptr`.
    pub fn read<S: ByteSource>(source: &mut S, ptr: ChunkPointer) -> ChunkResult<Self> {
        let flag = source.read_byte(ptr.value())?;
        let flags = HeaderFlags::decode(flag)
            .map_err(|mismatch| ChunkError::malformed_header(ptr, mismatch.to_string()))?;

        let header_len = Self::header_len_for(flags.body_width, flags.next_width);
        let mut buf = [0u8; MAX_HEADER_LEN];
        buf[0] = flag;
        source.read_range(ptr.value() + 1, &mut buf[1..header_len])?;
        Self::decode(ptr, &buf[..header_len])
    }

    /// Decodes a header from `bytes`, which must start with the flag byte.
    pub fn decode(ptr: ChunkPointer, bytes: &[u8]) -> ChunkResult<Self> {
        let Some(&flag) = bytes.first() else {
            return Err(ChunkError::malformed_header(ptr, "empty header"));
        };
        let flags = HeaderFlags::decode(flag)
            .map_err(|mismatch| ChunkError::malformed_header(ptr, mismatch.to_string()))?;

        let body = flags.body_width.bytes();
        let header_len = Self::header_len_for(flags.body_width, flags.next_width);
        if bytes.len() < header_len {
            return Err(ChunkError::malformed_header(
                ptr,
                format!("header needs {} bytes, got {}", header_len, bytes.len()),
            ));
        }

        let capacity = word::read_word(flags.body_width, &bytes[1..1 + body])?;
        let size = word::read_word(flags.body_width, &bytes[1 + body..1 + 2 * body])?;
        let next = word::read_word(flags.next_width, &bytes[1 + 2 * body..header_len])?;

        if size > capacity {
            return Err(ChunkError::malformed_header(
                ptr,
                format!("size {} exceeds capacity {}", size, capacity),
            ));
        }

        Ok(Self {
            ptr,
            used: flags.used,
            body_width: flags.body_width,
            next_width: flags.next_width,
            capacity,
            size,
            next: ChunkPointer::new(next).to_option(),
            header_len,
            dirty: false,
        })
    }

    /// Serialized header bytes.
    pub fn encode(&self) -> ChunkResult<Vec<u8>> {
        let body = self.body_width.bytes();
        let mut out = vec![0u8; self.header_len];
        out[0] = HeaderFlags::new(self.used, self.body_width, self.next_width).encode();
        word::write_word_checked(self.body_width, &mut out[1..1 + body], self.capacity)?;
        word::write_word_checked(self.body_width, &mut out[1 + body..1 + 2 * body], self.size)?;
        word::write_word_checked(
            self.next_width,
            &mut out[1 + 2 * body..],
            ChunkPointer::from_option(self.next).value(),
        )?;
        Ok(out)
    }

    /// Writes the header back if it changed. Returns whether anything was written.
    pub fn sync<S: ByteSource>(&mut self, source: &mut S) -> ChunkResult<bool> {
        if !self.dirty {
            return Ok(false);
        }
        let bytes = self.encode()?;
        source.write_range(self.ptr.value(), &bytes)?;
        self.dirty = false;
        Ok(true)
    }

    /// Marks every chunk of the chain starting here unused and hands them to
    /// the store's free list.
    ///
    /// Returns the number of chunks freed.
    pub fn free_chain<S: ByteSource>(&self, store: &mut Store<S>) -> ChunkResult<usize> {
        let ptrs: Vec<ChunkPointer> = store.chain(self.ptr)?.iter().map(Chunk::ptr).collect();
        store.free(&ptrs)?;
        Ok(ptrs.len())
    }

    pub fn ptr(&self) -> ChunkPointer {
        self.ptr
    }

    pub fn is_used(&self) -> bool {
        self.used
    }

    pub fn body_width(&self) -> WordWidth {
        self.body_width
    }

    pub fn next_width(&self) -> WordWidth {
        self.next_width
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn next(&self) -> Option<ChunkPointer> {
        self.next
    }

    pub fn is_tail(&self) -> bool {
        self.next.is_none()
    }

    pub fn header_len(&self) -> usize {
        self.header_len
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// First payload byte.
    pub fn data_start(&self) -> u64 {
        self.ptr.value() + self.header_len as u64
    }

    /// One past the last payload byte; where the following chunk begins.
    pub fn data_end(&self) -> u64 {
        self.data_start() + self.capacity
    }

    pub fn remaining(&self) -> u64 {
        self.capacity - self.size
    }

    /// Bytes this chunk contributes to the logical stream of its chain.
    ///
    /// A chained chunk always counts in full; only the tail is cut at its size.
    pub fn effective_capacity(&self) -> u64 {
        if self.next.is_some() {
            self.capacity
        } else {
            self.size
        }
    }

    /// Compares every encoded field, ignoring the dirty mark.
    pub fn same_header(&self, other: &Chunk) -> bool {
        self.ptr == other.ptr
            && self.used == other.used
            && self.body_width == other.body_width
            && self.next_width == other.next_width
            && self.capacity == other.capacity
            && self.size == other.size
            && self.next == other.next
    }

    pub fn set_used(&mut self, used: bool) {
        if self.used != used {
            self.used = used;
            self.dirty = true;
        }
    }

    /// Changes the capacity. The size is clamped to the new capacity.
    pub fn set_capacity(&mut self, capacity: u64) -> ChunkResult<()> {
        self.body_width.ensure_can_fit(capacity)?;
        self.capacity = capacity;
        self.size = self.size.min(capacity);
        self.dirty = true;
        Ok(())
    }

    /// # Panics
    ///
    /// If `size` exceeds the capacity.
    pub fn set_size(&mut self, size: u64) {
        assert!(
            size <= self.capacity,
            "chunk {}: size {} exceeds capacity {}",
            self.ptr,
            size,
            self.capacity
        );
        if self.size != size {
            self.size = size;
            self.dirty = true;
        }
    }

    /// Header bytes needed to widen the next field to `width`.
    pub fn next_width_delta(&self, width: WordWidth) -> usize {
        width.bytes().saturating_sub(self.next_width.bytes())
    }

    /// Widens the next field so it can hold any pointer up to `width`.
    ///
    /// The header grows into the payload: `data_end` stays put and the
    /// capacity shrinks by the returned number of bytes. Callers that care
    /// about payload bytes must move them.
    pub fn widen_next(&mut self, width: WordWidth) -> ChunkResult<usize> {
        let delta = self.next_width_delta(width);
        if delta == 0 {
            return Ok(0);
        }
        if self.capacity < delta as u64 {
            return Err(ChunkError::header_overflow(self.ptr, delta, self.capacity));
        }
        self.capacity -= delta as u64;
        self.size = self.size.min(self.capacity);
        self.next_width = width;
        self.header_len = Self::header_len_for(self.body_width, self.next_width);
        self.dirty = true;
        Ok(delta)
    }

    /// Links (or unlinks, with `None`) the successor chunk, widening the
    /// next field if the pointer does not fit it.
    pub fn set_next(&mut self, next: Option<ChunkPointer>) -> ChunkResult<()> {
        if let Some(ptr) = next {
            self.widen_next(WordWidth::for_unsigned(ptr.value()))?;
        }
        if self.next != next {
            self.next = next;
            self.dirty = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkErrorCode;
    use crate::source::MemorySource;

    fn sample() -> Chunk {
        let mut chunk = Chunk::new(ChunkPointer::new(5), WordWidth::Byte, WordWidth::Short, 40).unwrap();
        chunk.set_size(12);
        chunk.set_next(Some(ChunkPointer::new(300))).unwrap();
        chunk
    }

    #[test]
    fn test_header_length() {
        let chunk = sample();
        assert_eq!(chunk.header_len(), 1 + 2 + 2);
        assert_eq!(chunk.data_start(), 10);
        assert_eq!(chunk.data_end(), 50);
        assert_eq!(Chunk::header_len_for(WordWidth::Void, WordWidth::Void), 1);
    }

    #[test]
    fn test_sync_then_read() {
        let mut source = MemorySource::from_bytes(vec![0u8; 64]);
        let mut chunk = sample();
        assert!(chunk.sync(&mut source).unwrap());
        assert!(!chunk.is_dirty());
        assert!(!chunk.sync(&mut source).unwrap());

        let loaded = Chunk::read(&mut source, ChunkPointer::new(5)).unwrap();
        assert!(loaded.same_header(&chunk));
        assert_eq!(loaded.next(), Some(ChunkPointer::new(300)));
        assert_eq!(loaded.effective_capacity(), 40);
    }

    #[test]
    fn test_zero_bytes_are_malformed() {
        let mut source = MemorySource::from_bytes(vec![0u8; 16]);
        let err = Chunk::read(&mut source, ChunkPointer::new(5)).unwrap_err();
        assert_eq!(err.code(), ChunkErrorCode::MalformedHeader);
    }

    #[test]
    fn test_size_above_capacity_is_malformed() {
        let flag = HeaderFlags::new(true, WordWidth::Byte, WordWidth::Void).encode();
        let err = Chunk::decode(ChunkPointer::new(5), &[flag, 4, 9]).unwrap_err();
        assert_eq!(err.code(), ChunkErrorCode::MalformedHeader);
    }

    #[test]
    fn test_capacity_must_fit_body_width() {
        let err = Chunk::new(ChunkPointer::new(5), WordWidth::Byte, WordWidth::Void, 256).unwrap_err();
        assert_eq!(err.code(), ChunkErrorCode::OutOfBitDepth);

        let mut chunk = Chunk::new(ChunkPointer::new(5), WordWidth::Byte, WordWidth::Void, 8).unwrap();
        assert!(chunk.set_capacity(300).is_err());
        assert_eq!(chunk.capacity(), 8);
    }

    #[test]
    fn test_set_capacity_clamps_size() {
        let mut chunk = sample();
        chunk.set_capacity(4).unwrap();
        assert_eq!(chunk.size(), 4);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn test_size_above_capacity_panics() {
        let mut chunk = sample();
        chunk.set_size(41);
    }

    #[test]
    fn test_set_next_widens_into_payload() {
        let mut chunk = Chunk::new(ChunkPointer::new(5), WordWidth::Byte, WordWidth::Void, 10).unwrap();
        let end = chunk.data_end();
        chunk.set_next(Some(ChunkPointer::new(70_000))).unwrap();
        assert_eq!(chunk.next_width(), WordWidth::SmallInt);
        assert_eq!(chunk.capacity(), 7);
        assert_eq!(chunk.data_end(), end);
    }

    #[test]
    fn test_widening_beyond_payload_overflows() {
        let mut chunk = Chunk::new(ChunkPointer::new(5), WordWidth::Byte, WordWidth::Void, 1).unwrap();
        let err = chunk.set_next(Some(ChunkPointer::new(70_000))).unwrap_err();
        assert_eq!(err.code(), ChunkErrorCode::HeaderOverflow);
        assert_eq!(chunk.next(), None);
        assert_eq!(chunk.capacity(), 1);
    }

    #[test]
    fn test_unlink_keeps_width() {
        let mut chunk = sample();
        chunk.set_next(None).unwrap();
        assert!(chunk.is_tail());
        assert_eq!(chunk.next_width(), WordWidth::Short);
        assert_eq!(chunk.effective_capacity(), 12);
    }

    #[test]
    fn test_void_widths() {
        let mut source = MemorySource::from_bytes(vec![0u8; 8]);
        let mut chunk = Chunk::new(ChunkPointer::new(5), WordWidth::Void, WordWidth::Void, 0).unwrap();
        chunk.set_used(false);
        chunk.sync(&mut source).unwrap();
        let loaded = Chunk::read(&mut source, ChunkPointer::new(5)).unwrap();
        assert!(!loaded.is_used());
        assert_eq!(loaded.capacity(), 0);
        assert_eq!(loaded.header_len(), 1);
    }

    #[test]
    fn test_spanning_covers_exact_span() {
        for span in (1u64..=20).chain([200, 258, 259, 260, 65_540, 65_541, 1 << 30]) {
            let chunk = Chunk::spanning(ChunkPointer::new(100), span).unwrap();
            assert!(!chunk.is_used());
            assert_eq!(chunk.data_end() - 100, span, "span {}", span);
        }
    }

    #[test]
    fn test_spanning_two_bytes_uses_next_field() {
        let chunk = Chunk::spanning(ChunkPointer::new(100), 2).unwrap();
        assert_eq!(chunk.header_len(), 2);
        assert_eq!(chunk.capacity(), 0);
        assert_eq!(chunk.next_width(), WordWidth::Byte);
    }
}
