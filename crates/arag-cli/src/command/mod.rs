//! Subcommand execution.

mod codec;
mod pull;
mod schema;

use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::config::Command;

/// Runs a parsed subcommand.
pub async fn execute(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Schema(command) => schema::execute(command),
        Command::Codec(command) => codec::execute(command),
        Command::Pull(args) => pull::execute(args).await,
    }
}

/// Writes a value to stdout as pretty-printed JSON.
fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value).context("failed to write output")?;
    writeln!(stdout).context("failed to write output")?;
    Ok(())
}

/// Reads a whole file, naming it in the error.
fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}
