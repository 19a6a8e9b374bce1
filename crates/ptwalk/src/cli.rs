//! Command-line surface.

use clap::Parser;
use std::path::PathBuf;

/// Walk the x86-64 page tables for a virtual address.
///
/// Connects to a gdbstub (QEMU's `-s` endpoint) by default, or walks a
/// raw physical memory dump when `--dump` is given.
#[derive(Debug, Parser)]
#[command(name = "ptwalk", version)]
pub struct Cli {
    /// Virtual address to translate, hexadecimal (0x...) or decimal.
    pub address: String,

    /// gdbstub endpoint to connect to.
    #[arg(long, value_name = "HOST:PORT", default_value = "localhost:1234", conflicts_with = "dump")]
    pub connect: String,

    /// Raw physical memory dump to walk instead of a live target.
    #[arg(long, value_name = "FILE", requires = "cr3")]
    pub dump: Option<PathBuf>,

    /// CR3 value to use with --dump, hexadecimal (0x...) or decimal.
    #[arg(long, value_name = "ADDR", value_parser = parse_u64)]
    pub cr3: Option<u64>,

    /// Emit the result as JSON instead of the human-readable report.
    #[arg(long)]
    pub json: bool,
}

fn parse_u64(raw: &str) -> Result<u64, String> {
    crate::walk::translate::parse_address(raw)
        .map_err(|_| format!("'{raw}' is not a hexadecimal (0x...) or decimal value"))
}
