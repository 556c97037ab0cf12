//! CLI command implementations
//!
//! Every command opens the store file, does one thing and flushes. Commands
//! that change chain contents run inside a transaction, so a failure leaves
//! the file as it was.

use std::path::Path;

use serde_json::{json, Value};

use crate::chunk::{Chunk, ChunkPointer};
use crate::config::StoreConfig;
use crate::observability::Logger;
use crate::source::FileSource;
use crate::store::Store;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_stdin, write_raw, write_response};

/// Parse arguments, load configuration and run the command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let config = load_config(cli.config.as_deref())?;
    Logger::set_min_severity(config.log_severity()?);
    run_command(cli.command, config)
}

pub fn run_command(cmd: Command, config: StoreConfig) -> CliResult<()> {
    match cmd {
        Command::Init { file } => init(&file, config),
        Command::Info { file } => info(&file, config),
        Command::Alloc { file, capacity } => alloc(&file, config, capacity),
        Command::Cat { file, chain } => cat(&file, config, chain),
        Command::Write {
            file,
            chain,
            append,
        } => write(&file, config, chain, append),
        Command::Free { file, chain } => free(&file, config, chain),
        Command::Checksum { file, chain } => checksum(&file, config, chain),
    }
}

fn load_config(path: Option<&Path>) -> CliResult<StoreConfig> {
    match path {
        Some(path) => Ok(StoreConfig::load(path)?),
        None => Ok(StoreConfig::default()),
    }
}

pub fn init(file: &Path, config: StoreConfig) -> CliResult<()> {
    let store = Store::create_file(file, config)?;
    write_response(json!({
        "initialized": true,
        "root": store.root().value(),
    }))
}

pub fn info(file: &Path, config: StoreConfig) -> CliResult<()> {
    let mut store = Store::open_file(file, config)?;
    let chunks: Vec<Value> = store.chunks()?.iter().map(chunk_json).collect();
    let stats = store.stats()?;
    write_response(json!({
        "root": store.root().value(),
        "stats": serde_json::to_value(stats)?,
        "chunks": chunks,
        "metrics": serde_json::to_value(store.metrics().snapshot())?,
    }))
}

pub fn alloc(file: &Path, config: StoreConfig, capacity: u64) -> CliResult<()> {
    let mut store = Store::open_file(file, config)?;
    let head = store.new_chain(capacity)?;
    let capacity = store.chunk(head)?.capacity();
    store.flush()?;
    write_response(json!({ "chain": head.value(), "capacity": capacity }))
}

pub fn cat(file: &Path, config: StoreConfig, chain: u64) -> CliResult<()> {
    let mut store = Store::open_file(file, config)?;
    let head = resolve_chain(&mut store, chain)?;
    let data = store.io(head)?.read_to_vec()?;
    write_raw(&data)
}

pub fn write(file: &Path, config: StoreConfig, chain: u64, append: bool) -> CliResult<()> {
    let data = read_stdin()?;
    let mut store = Store::open_file(file, config)?;
    let head = resolve_chain(&mut store, chain)?;

    let mut tx = store.transaction()?;
    if !append {
        // keep the head chunk, drop everything else
        let capacity = tx.chunk(head)?.capacity();
        tx.truncate_at(head, capacity)?;
        let mut first = tx.chunk(head)?;
        first.set_size(0);
        tx.write_chunk(&mut first)?;
    }
    let size = {
        let mut io = tx.io(head)?;
        let end = io.size()?;
        io.set_position(end);
        io.write(&data)?;
        io.size()?
    };
    tx.commit()?;
    store.flush()?;

    write_response(json!({ "chain": chain, "written": data.len(), "size": size }))
}

pub fn free(file: &Path, config: StoreConfig, chain: u64) -> CliResult<()> {
    let mut store = Store::open_file(file, config)?;
    let head = resolve_chain(&mut store, chain)?;
    if head == store.root() {
        return Err(CliError::store_error("the root chunk cannot be freed"));
    }

    let freed = store.chunk(head)?.free_chain(&mut store)?;
    store.flush()?;
    write_response(json!({ "chain": chain, "freed_chunks": freed }))
}

pub fn checksum(file: &Path, config: StoreConfig, chain: u64) -> CliResult<()> {
    let mut store = Store::open_file(file, config)?;
    let head = resolve_chain(&mut store, chain)?;
    let crc = store.chain_checksum(head)?;
    write_response(json!({
        "chain": chain,
        "crc32": crc,
        "hex": format!("{:08x}", crc),
    }))
}

/// Checks that `chain` addresses a used chunk.
fn resolve_chain(store: &mut Store<FileSource>, chain: u64) -> CliResult<ChunkPointer> {
    let ptr = ChunkPointer::new(chain);
    let chunk = ptr.dereference(store)?;
    if !chunk.is_used() {
        return Err(CliError::store_error(format!("chunk {} is free", chain)));
    }
    Ok(ptr)
}

fn chunk_json(chunk: &Chunk) -> Value {
    json!({
        "ptr": chunk.ptr().value(),
        "used": chunk.is_used(),
        "body_width": chunk.body_width().name(),
        "next_width": chunk.next_width().name(),
        "capacity": chunk.capacity(),
        "size": chunk.size(),
        "next": chunk.next().map(ChunkPointer::value),
    })
}
