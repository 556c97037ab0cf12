//! Byte-addressable backing sources
//!
//! A source is an opaque, resizable run of bytes. The chunk layer owns all
//! interpretation of the bytes; sources only move them.
//!
//! # Implementors
//!
//! - [`MemorySource`] - growable in-memory buffer
//! - [`FileSource`] - plain file
//! - [`crate::transaction::TxSource`] - transactional overlay around another source

mod errors;
mod file;
mod memory;

pub use errors::{SourceError, SourceResult};
pub use file::FileSource;
pub use memory::MemorySource;

pub(crate) use errors::check_range;

use crate::word::{self, WordWidth};

/// The primitive byte operations the chunk layer needs from storage.
///
/// # Invariants
///
/// - `read_range` fills the whole buffer or fails with `OutOfBounds`
/// - `write_range` never extends the source; callers `resize` first
/// - `resize` zero-fills grown regions
pub trait ByteSource {
    /// Current length in bytes.
    fn length(&self) -> SourceResult<u64>;

    /// Grows (zero-filled) or truncates the source.
    fn resize(&mut self, new_length: u64) -> SourceResult<()>;

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> SourceResult<()>;

    /// Overwrites `data.len()` bytes starting at `offset`.
    fn write_range(&mut self, offset: u64, data: &[u8]) -> SourceResult<()>;

    /// Makes previous writes durable. No-op for volatile sources.
    fn flush(&mut self) -> SourceResult<()> {
        Ok(())
    }

    fn read_byte(&mut self, offset: u64) -> SourceResult<u8> {
        let mut b = [0u8; 1];
        self.read_range(offset, &mut b)?;
        Ok(b[0])
    }

    fn write_byte(&mut self, offset: u64, value: u8) -> SourceResult<()> {
        self.write_range(offset, &[value])
    }

    /// Reads a big-endian word of the given width.
    fn read_word(&mut self, offset: u64, width: WordWidth) -> SourceResult<u64> {
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..width.bytes()];
        self.read_range(offset, bytes)?;
        Ok(word::read_word(width, bytes)?)
    }

    /// Writes a big-endian word, failing with `OutOfBitDepth` if it does not fit.
    fn write_word(&mut self, offset: u64, value: u64, width: WordWidth) -> SourceResult<()> {
        let mut buf = [0u8; 8];
        let bytes = &mut buf[..width.bytes()];
        word::write_word_checked(width, bytes, value)?;
        self.write_range(offset, bytes)
    }
}
