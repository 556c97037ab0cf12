//! Chunk layer error types
//!
//! Error codes:
//! - CHUNK_OUT_OF_BIT_DEPTH (FATAL severity)
//! - CHUNK_MALFORMED_HEADER (FATAL severity)
//! - CHUNK_NOT_A_CHUNK (FATAL severity)
//! - CHUNK_NULL_POINTER (ERROR severity)
//! - CHUNK_END_OF_STREAM (ERROR severity)
//! - CHUNK_TRANSACTION_ALREADY_OPEN (FATAL severity)
//! - CHUNK_NO_TRANSACTION (ERROR severity)
//! - CHUNK_SOURCE_FAILURE (ERROR severity)
//! - CHUNK_INVALID_STORE (FATAL severity)
//! - CHUNK_CACHE_MISMATCH (FATAL severity)
//! - CHUNK_HEADER_OVERFLOW (ERROR severity)

use std::error::Error as StdError;
use std::fmt;
use std::io;

use super::pointer::ChunkPointer;
use crate::source::SourceError;
use crate::word::WordError;

/// Severity levels for chunk errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation fails, the store stays usable
    Error,
    /// Corruption or misuse; the store must not be trusted further
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Chunk-layer error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkErrorCode {
    /// Value does not fit the chosen word width
    OutOfBitDepth,
    /// Header marker bits or fields are inconsistent
    MalformedHeader,
    /// Pointer does not address a chunk header
    NotAChunk,
    /// Null pointer where a chunk was required
    NullPointer,
    /// Fewer bytes remain than the operation needs
    EndOfStream,
    /// A transaction is already open on the source
    TransactionAlreadyOpen,
    /// Commit or rollback without a matching open transaction
    NoTransaction,
    /// Backing source I/O failure
    SourceFailure,
    /// Store preamble is missing or unsupported
    InvalidStore,
    /// Cached header differs from the bytes in the source
    CacheMismatch,
    /// Header cannot grow into the payload region
    HeaderOverflow,
}

impl ChunkErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ChunkErrorCode::OutOfBitDepth => "CHUNK_OUT_OF_BIT_DEPTH",
            ChunkErrorCode::MalformedHeader => "CHUNK_MALFORMED_HEADER",
            ChunkErrorCode::NotAChunk => "CHUNK_NOT_A_CHUNK",
            ChunkErrorCode::NullPointer => "CHUNK_NULL_POINTER",
            ChunkErrorCode::EndOfStream => "CHUNK_END_OF_STREAM",
            ChunkErrorCode::TransactionAlreadyOpen => "CHUNK_TRANSACTION_ALREADY_OPEN",
            ChunkErrorCode::NoTransaction => "CHUNK_NO_TRANSACTION",
            ChunkErrorCode::SourceFailure => "CHUNK_SOURCE_FAILURE",
            ChunkErrorCode::InvalidStore => "CHUNK_INVALID_STORE",
            ChunkErrorCode::CacheMismatch => "CHUNK_CACHE_MISMATCH",
            ChunkErrorCode::HeaderOverflow => "CHUNK_HEADER_OVERFLOW",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ChunkErrorCode::OutOfBitDepth
            | ChunkErrorCode::MalformedHeader
            | ChunkErrorCode::NotAChunk
            | ChunkErrorCode::TransactionAlreadyOpen
            | ChunkErrorCode::InvalidStore
            | ChunkErrorCode::CacheMismatch => Severity::Fatal,
            ChunkErrorCode::NullPointer
            | ChunkErrorCode::EndOfStream
            | ChunkErrorCode::NoTransaction
            | ChunkErrorCode::SourceFailure
            | ChunkErrorCode::HeaderOverflow => Severity::Error,
        }
    }

    /// Whether the error means the stored bytes cannot be trusted
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ChunkErrorCode::MalformedHeader
                | ChunkErrorCode::NotAChunk
                | ChunkErrorCode::InvalidStore
                | ChunkErrorCode::CacheMismatch
        )
    }
}

impl fmt::Display for ChunkErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Chunk error with code, context and optional cause
#[derive(Debug)]
pub struct ChunkError {
    code: ChunkErrorCode,
    message: String,
    details: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl ChunkError {
    /// Create an error with the given code and message
    pub fn new(code: ChunkErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Attach context details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Attach the underlying cause
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Header at `ptr` failed validation
    pub fn malformed_header(ptr: ChunkPointer, reason: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::MalformedHeader, reason).with_details(format!("chunk_ptr: {}", ptr))
    }

    /// `ptr` does not address a chunk
    pub fn not_a_chunk(ptr: ChunkPointer, reason: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::NotAChunk, reason).with_details(format!("chunk_ptr: {}", ptr))
    }

    /// A null pointer reached an operation that needs a chunk
    pub fn null_pointer(context: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::NullPointer, context)
    }

    /// Not enough bytes left in the stream
    pub fn end_of_stream(message: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::EndOfStream, message)
    }

    /// Store preamble missing or unsupported
    pub fn invalid_store(reason: impl Into<String>) -> Self {
        Self::new(ChunkErrorCode::InvalidStore, reason)
    }

    /// Cached header for `ptr` disagrees with the source
    pub fn cache_mismatch(ptr: ChunkPointer) -> Self {
        Self::new(ChunkErrorCode::CacheMismatch, "cached header differs from stored header")
            .with_details(format!("chunk_ptr: {}", ptr))
    }

    /// Header of `ptr` needs `needed` more bytes than its payload can give up
    pub fn header_overflow(ptr: ChunkPointer, needed: usize, capacity: u64) -> Self {
        Self::new(
            ChunkErrorCode::HeaderOverflow,
            format!("header needs {} more bytes, capacity is {}", needed, capacity),
        )
        .with_details(format!("chunk_ptr: {}", ptr))
    }

    pub fn code(&self) -> ChunkErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ChunkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl StdError for ChunkError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<WordError> for ChunkError {
    fn from(err: WordError) -> Self {
        let code = match err {
            WordError::OutOfBitDepth { .. } | WordError::SignedOutOfBitDepth { .. } => {
                ChunkErrorCode::OutOfBitDepth
            }
            WordError::EndOfStream { .. } => ChunkErrorCode::EndOfStream,
        };
        ChunkError::new(code, err.to_string()).with_source(err)
    }
}

impl From<SourceError> for ChunkError {
    fn from(err: SourceError) -> Self {
        let code = match &err {
            SourceError::Io(_) => ChunkErrorCode::SourceFailure,
            SourceError::OutOfBounds { .. } => ChunkErrorCode::EndOfStream,
            SourceError::Word(WordError::EndOfStream { .. }) => ChunkErrorCode::EndOfStream,
            SourceError::Word(_) => ChunkErrorCode::OutOfBitDepth,
            SourceError::TransactionAlreadyOpen => ChunkErrorCode::TransactionAlreadyOpen,
            SourceError::NoTransaction(_) => ChunkErrorCode::NoTransaction,
        };
        ChunkError::new(code, err.to_string()).with_source(err)
    }
}

impl From<ChunkError> for io::Error {
    fn from(err: ChunkError) -> Self {
        let kind = match err.code() {
            ChunkErrorCode::EndOfStream => io::ErrorKind::UnexpectedEof,
            ChunkErrorCode::MalformedHeader | ChunkErrorCode::NotAChunk => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

/// Result type for chunk operations
pub type ChunkResult<T> = Result<T, ChunkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::WordWidth;

    #[test]
    fn test_corruption_codes_are_fatal() {
        let err = ChunkError::malformed_header(ChunkPointer::new(42), "marker bits mismatch");
        assert!(err.is_fatal());
        assert!(err.code().is_corruption());
        assert_eq!(err.details(), Some("chunk_ptr: 42"));
    }

    #[test]
    fn test_display_contains_code_and_context() {
        let err = ChunkError::not_a_chunk(ChunkPointer::new(7), "marker bits mismatch");
        let display = err.to_string();
        assert!(display.contains("FATAL"));
        assert!(display.contains("CHUNK_NOT_A_CHUNK"));
        assert!(display.contains("marker bits mismatch"));
        assert!(display.contains("chunk_ptr: 7"));
    }

    #[test]
    fn test_word_error_maps_to_out_of_bit_depth() {
        let err: ChunkError = WordWidth::Byte.ensure_can_fit(256).unwrap_err().into();
        assert_eq!(err.code(), ChunkErrorCode::OutOfBitDepth);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_source_error_mapping() {
        let err: ChunkError = SourceError::TransactionAlreadyOpen.into();
        assert_eq!(err.code(), ChunkErrorCode::TransactionAlreadyOpen);
        let err: ChunkError = SourceError::OutOfBounds { offset: 1, len: 2, length: 2 }.into();
        assert_eq!(err.code(), ChunkErrorCode::EndOfStream);
        let err: ChunkError = SourceError::Io(io::Error::new(io::ErrorKind::Other, "disk")).into();
        assert_eq!(err.code(), ChunkErrorCode::SourceFailure);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_into_io_error_kind() {
        let io_err: io::Error = ChunkError::end_of_stream("short word").into();
        assert_eq!(io_err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
