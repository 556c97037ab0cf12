//! Observable store events
//!
//! Events are explicit and typed. Each carries its own severity so call
//! sites never pick one ad hoc.

use std::fmt;

use super::logger::Severity;

/// Observable events of a chunk store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// New store initialized on an empty source
    StoreCreated,
    /// Existing store opened and scanned
    StoreOpened,
    /// Configuration file loaded
    ConfigLoaded,

    // Allocation
    /// Chunk appended at the end of the source
    ChunkAllocated,
    /// Free chunk handed out again
    ChunkReused,
    /// Chunk returned to the free list
    ChunkFreed,
    /// Free chunk split off the unused part of a larger one
    ChunkSplit,
    /// Trailing free chunk cut off the source
    StoreTrimmed,

    // Chains
    /// Tail chunk grew in place at the end of the source
    ChainGrownInPlace,
    /// New successor linked behind a tail
    ChainLinked,
    /// Chain cut back to a shorter capacity
    ChainTruncated,
    /// Next-pointer field widened into the payload
    HeaderWidened,

    // Transactions
    /// Transaction opened
    TransactionBegin,
    /// Pending writes applied to the source
    TransactionCommit,
    /// Pending writes discarded
    TransactionRollback,

    // Corruption (FATAL)
    /// Cached header disagrees with the source
    CacheMismatch,
    /// Header failed validation during a scan
    HeaderCorruption,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::StoreCreated => "STORE_CREATED",
            Event::StoreOpened => "STORE_OPENED",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ChunkAllocated => "CHUNK_ALLOCATED",
            Event::ChunkReused => "CHUNK_REUSED",
            Event::ChunkFreed => "CHUNK_FREED",
            Event::ChunkSplit => "CHUNK_SPLIT",
            Event::StoreTrimmed => "STORE_TRIMMED",
            Event::ChainGrownInPlace => "CHAIN_GROWN_IN_PLACE",
            Event::ChainLinked => "CHAIN_LINKED",
            Event::ChainTruncated => "CHAIN_TRUNCATED",
            Event::HeaderWidened => "HEADER_WIDENED",
            Event::TransactionBegin => "TRANSACTION_BEGIN",
            Event::TransactionCommit => "TRANSACTION_COMMIT",
            Event::TransactionRollback => "TRANSACTION_ROLLBACK",
            Event::CacheMismatch => "CACHE_MISMATCH",
            Event::HeaderCorruption => "HEADER_CORRUPTION",
        }
    }

    /// Returns true if this event indicates corruption
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::CacheMismatch | Event::HeaderCorruption)
    }

    pub fn severity(&self) -> Severity {
        match self {
            Event::CacheMismatch | Event::HeaderCorruption => Severity::Fatal,
            Event::StoreCreated
            | Event::StoreOpened
            | Event::ConfigLoaded
            | Event::StoreTrimmed
            | Event::HeaderWidened
            | Event::TransactionCommit
            | Event::TransactionRollback => Severity::Info,
            Event::ChunkAllocated
            | Event::ChunkReused
            | Event::ChunkFreed
            | Event::ChunkSplit
            | Event::ChainGrownInPlace
            | Event::ChainLinked
            | Event::ChainTruncated
            | Event::TransactionBegin => Severity::Trace,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
