//! chunkdb - chained variable-size chunks over a byte source
//!
//! A store divides one byte source (a file or a memory buffer) into chunks.
//! Each chunk carries a compact header with its capacity, its used size and
//! an optional pointer to the next chunk, so chains of chunks read and write
//! like a single growable stream.
//!
//! # Layers
//!
//! - [`word`] - fixed-width big-endian integer codec
//! - [`source`] - byte sources (memory, file)
//! - [`transaction`] - write overlay with commit and rollback
//! - [`chunk`] - headers, pointers and the chain stream
//! - [`store`] - allocation, free list and header cache

pub mod chunk;
pub mod cli;
pub mod config;
pub mod observability;
pub mod source;
pub mod store;
pub mod transaction;
pub mod word;

pub use chunk::{Chunk, ChunkError, ChunkErrorCode, ChunkIo, ChunkPointer, ChunkResult, ScatterWrite};
pub use config::{ConfigError, StoreConfig};
pub use source::{ByteSource, FileSource, MemorySource, SourceError};
pub use store::{Growth, Store, StoreStats, Transaction, ROOT_PTR};
pub use transaction::{CommitSummary, TransactionToken, TxSource};
pub use word::{WordError, WordWidth};
