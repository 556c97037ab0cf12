//! CLI module for chunkdb
//!
//! Provides command-line access to a store file:
//! - init: create a store
//! - info: dump headers and counters
//! - alloc / free: manage chains
//! - cat / write: move chain contents through stdout and stdin
//! - checksum: CRC32 of a chain

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{alloc, cat, checksum, free, info, init, run, run_command, write};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_stdin, write_raw, write_response};
