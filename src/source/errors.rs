//! Byte source errors

use std::io;

use thiserror::Error;

use crate::word::WordError;

/// Result type for byte source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Failures raised by byte sources and the transaction overlay
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("range {offset}+{len} is outside source of length {length}")]
    OutOfBounds { offset: u64, len: u64, length: u64 },

    #[error(transparent)]
    Word(#[from] WordError),

    #[error("a transaction is already open on this source")]
    TransactionAlreadyOpen,

    #[error("transaction {0} is not the open transaction")]
    NoTransaction(u64),
}

impl SourceError {
    pub(crate) fn out_of_bounds(offset: u64, len: usize, length: u64) -> Self {
        SourceError::OutOfBounds {
            offset,
            len: len as u64,
            length,
        }
    }
}

/// Fails with `OutOfBounds` unless `[offset, offset + len)` lies within `length`.
pub(crate) fn check_range(offset: u64, len: usize, length: u64) -> SourceResult<()> {
    match offset.checked_add(len as u64) {
        Some(end) if end <= length => Ok(()),
        _ => Err(SourceError::out_of_bounds(offset, len, length)),
    }
}
