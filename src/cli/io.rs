//! JSON output for the CLI
//!
//! One JSON document per line on stdout, UTF-8.

use std::io::{self, Write};

use serde::Serialize;

use super::errors::CliResult;

/// Write one value as a JSON line to stdout
pub fn write_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    write_json_to(&mut stdout, value)
}

/// Write one value as a JSON line to `out`
pub fn write_json_to<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> CliResult<()> {
    serde_json::to_writer(&mut *out, value)?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}
