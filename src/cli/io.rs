//! Stdin/stdout handling for the CLI
//!
//! - Command results: single JSON object on stdout
//! - Chain contents: raw bytes in (`write`) and out (`cat`)

use std::io::{self, Read, Write};

use serde_json::Value;

use super::errors::CliResult;

/// Read all of stdin as raw bytes
pub fn read_stdin() -> CliResult<Vec<u8>> {
    let mut data = Vec::new();
    io::stdin().lock().read_to_end(&mut data)?;
    Ok(data)
}

/// Write raw bytes to stdout
pub fn write_raw(data: &[u8]) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(data)?;
    stdout.flush()?;
    Ok(())
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
