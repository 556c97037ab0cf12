//! CLI argument definitions using clap
//!
//! Commands:
//! - chunkdb init --file <path>
//! - chunkdb info --file <path>
//! - chunkdb alloc --file <path> --capacity <n>
//! - chunkdb cat --file <path> --chain <ptr>
//! - chunkdb write --file <path> --chain <ptr> [--append]
//! - chunkdb free --file <path> --chain <ptr>
//! - chunkdb checksum --file <path> --chain <ptr>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// chunkdb - chained variable-size chunks in a single file
#[derive(Parser, Debug)]
#[command(name = "chunkdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON store configuration; defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a new store file, overwriting any existing one
    Init {
        /// Store file
        #[arg(long)]
        file: PathBuf,
    },

    /// Print every chunk header and the store counters as JSON
    Info {
        /// Store file
        #[arg(long)]
        file: PathBuf,
    },

    /// Allocate a new chain and print its head pointer
    Alloc {
        /// Store file
        #[arg(long)]
        file: PathBuf,

        /// Minimum payload capacity of the head chunk
        #[arg(long, default_value_t = 0)]
        capacity: u64,
    },

    /// Copy the contents of a chain to stdout
    Cat {
        /// Store file
        #[arg(long)]
        file: PathBuf,

        /// Head pointer of the chain
        #[arg(long)]
        chain: u64,
    },

    /// Replace (or extend) the contents of a chain with stdin
    Write {
        /// Store file
        #[arg(long)]
        file: PathBuf,

        /// Head pointer of the chain
        #[arg(long)]
        chain: u64,

        /// Append after the current contents instead of replacing them
        #[arg(long)]
        append: bool,
    },

    /// Free every chunk of a chain
    Free {
        /// Store file
        #[arg(long)]
        file: PathBuf,

        /// Head pointer of the chain
        #[arg(long)]
        chain: u64,
    },

    /// Print the CRC32 of a chain's contents
    Checksum {
        /// Store file
        #[arg(long)]
        file: PathBuf,

        /// Head pointer of the chain
        #[arg(long)]
        chain: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_with_global_config() {
        let cli = Cli::try_parse_from([
            "chunkdb", "write", "--file", "s.db", "--chain", "74", "--append", "--config", "c.json",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.json")));
        match cli.command {
            Command::Write {
                file,
                chain,
                append,
            } => {
                assert_eq!(file, PathBuf::from("s.db"));
                assert_eq!(chain, 74);
                assert!(append);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_alloc_capacity_defaults_to_zero() {
        let cli = Cli::try_parse_from(["chunkdb", "alloc", "--file", "s.db"]).unwrap();
        assert!(matches!(cli.command, Command::Alloc { capacity: 0, .. }));
    }

    #[test]
    fn test_chain_is_required() {
        assert!(Cli::try_parse_from(["chunkdb", "cat", "--file", "s.db"]).is_err());
    }
}
