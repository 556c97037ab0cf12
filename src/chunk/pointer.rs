//! Absolute chunk addresses

use std::fmt;
use std::ops::Add;

use super::errors::{ChunkError, ChunkErrorCode, ChunkResult};
use super::header::Chunk;
use crate::source::ByteSource;
use crate::store::Store;

/// Absolute byte offset of a chunk header within a store.
///
/// Zero is reserved as the null pointer; the store preamble occupies it, so
/// no chunk can ever live there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkPointer(u64);

impl ChunkPointer {
    pub const NULL: ChunkPointer = ChunkPointer(0);

    pub const fn new(value: u64) -> Self {
        ChunkPointer(value)
    }

    pub const fn value(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Fails with `NullPointer` when this is the null pointer.
    pub fn require_non_null(self) -> ChunkResult<Self> {
        if self.is_null() {
            Err(ChunkError::null_pointer("chunk pointer is null"))
        } else {
            Ok(self)
        }
    }

    /// `None` for the null pointer.
    pub fn to_option(self) -> Option<Self> {
        if self.is_null() {
            None
        } else {
            Some(self)
        }
    }

    pub fn from_option(ptr: Option<ChunkPointer>) -> Self {
        ptr.unwrap_or(ChunkPointer::NULL)
    }

    /// Loads the chunk this pointer addresses.
    ///
    /// A header that fails validation is reported as `NotAChunk`: from the
    /// pointer's point of view the address simply is not a chunk.
    pub fn dereference<S: ByteSource>(self, store: &mut Store<S>) -> ChunkResult<Chunk> {
        let ptr = self.require_non_null()?;
        store.chunk(ptr).map_err(|err| {
            if err.code() == ChunkErrorCode::MalformedHeader {
                ChunkError::not_a_chunk(ptr, err.message().to_string()).with_source(err)
            } else {
                err
            }
        })
    }
}

impl Add<u64> for ChunkPointer {
    type Output = ChunkPointer;

    /// Offsets the pointer. Overflowing the address space is a bug in the caller.
    fn add(self, delta: u64) -> ChunkPointer {
        match self.0.checked_add(delta) {
            Some(value) => ChunkPointer(value),
            None => panic!("chunk pointer overflow: {} + {}", self.0, delta),
        }
    }
}

impl From<ChunkPointer> for u64 {
    fn from(ptr: ChunkPointer) -> u64 {
        ptr.0
    }
}

impl fmt::Display for ChunkPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_pointer() {
        assert!(ChunkPointer::NULL.is_null());
        assert!(ChunkPointer::default().is_null());
        let err = ChunkPointer::NULL.require_non_null().unwrap_err();
        assert_eq!(err.code(), ChunkErrorCode::NullPointer);
        assert_eq!(ChunkPointer::NULL.to_option(), None);
    }

    #[test]
    fn test_option_round_trip() {
        let ptr = ChunkPointer::new(17);
        assert_eq!(ptr.to_option(), Some(ptr));
        assert_eq!(ChunkPointer::from_option(Some(ptr)), ptr);
        assert_eq!(ChunkPointer::from_option(None), ChunkPointer::NULL);
    }

    #[test]
    fn test_add_offsets() {
        let ptr = ChunkPointer::new(100) + 28;
        assert_eq!(ptr.value(), 128);
        assert_eq!(u64::from(ptr), 128);
    }

    #[test]
    #[should_panic(expected = "chunk pointer overflow")]
    fn test_add_overflow_panics() {
        let _ = ChunkPointer::new(u64::MAX) + 1;
    }

    #[test]
    fn test_ordering_follows_address() {
        assert!(ChunkPointer::new(5) < ChunkPointer::new(6));
    }
}
