//! CLI-specific error types

use std::fmt;
use std::io;

use crate::chunk::ChunkError;
use crate::config::ConfigError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (stdin/stdout)
    IoError,
    /// The store rejected the operation
    StoreError,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "CHUNKDB_CLI_CONFIG_ERROR",
            Self::IoError => "CHUNKDB_CLI_IO_ERROR",
            Self::StoreError => "CHUNKDB_CLI_STORE_ERROR",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn store_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::StoreError, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<ChunkError> for CliError {
    fn from(e: ChunkError) -> Self {
        Self::store_error(e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::ChunkPointer;

    #[test]
    fn test_store_error_keeps_chunk_code() {
        let err = CliError::from(ChunkError::not_a_chunk(ChunkPointer::new(9), "garbage"));
        assert_eq!(err.code(), &CliErrorCode::StoreError);
        assert!(err.to_string().starts_with("CHUNKDB_CLI_STORE_ERROR"));
        assert!(err.message().contains("CHUNK_NOT_A_CHUNK"));
    }

    #[test]
    fn test_config_error_code() {
        let err = CliError::from(ConfigError::Invalid("bad".to_string()));
        assert_eq!(err.code_str(), "CHUNKDB_CLI_CONFIG_ERROR");
    }
}
