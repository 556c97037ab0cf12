//! Chunk layer
//!
//! A chunk is a variable-size header followed by a payload. Chunks link into
//! chains through their next pointer, and a chain reads as one byte stream
//! through [`ChunkIo`].
//!
//! # Invariants
//!
//! - `size <= capacity` for every header, on disk and in memory
//! - The top bit of every flag byte is set; anything else is not a header
//! - Widening a header never moves `data_end`
//! - Pointer 0 is null and never addresses a chunk

mod errors;
mod flags;
mod header;
mod io;
mod pointer;

pub use errors::{ChunkError, ChunkErrorCode, ChunkResult, Severity};
pub use flags::{HeaderFlags, MarkerMismatch};
pub use header::{Chunk, MAX_HEADER_LEN};
pub use io::{ChunkIo, ScatterWrite};
pub use pointer::ChunkPointer;
