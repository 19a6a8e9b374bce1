//! ptwalk: x86-64 page-table walk inspector.
//!
//! Translates one virtual address to its physical address by walking the
//! 4-level paging hierarchy rooted at CR3, against either a live gdbstub
//! target or a raw physical memory dump, and prints a per-level trace of
//! the walk.

mod cli;
mod render;
mod target;
mod walk;

use anyhow::Context;
use clap::Parser;
use target::{DumpTarget, GdbTarget, Target};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays clean for the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let target: Box<dyn Target> = match &cli.dump {
        Some(path) => {
            let cr3 = cli.cr3.context("--dump requires --cr3")?;
            Box::new(DumpTarget::open(path, cr3)?)
        }
        None => Box::new(GdbTarget::connect(&cli.connect)?),
    };

    match walk::translate(target.as_ref(), &cli.address) {
        Ok(translation) => {
            if cli.json {
                println!("{}", render::json_report(&translation)?);
            } else {
                print!("{}", render::report(&translation));
            }
            Ok(())
        }
        Err(failure) => {
            // Whatever was observed before the abort is still shown.
            if cli.json {
                println!("{}", render::json_failure(&failure)?);
            } else {
                print!("{}", render::failure_report(&failure));
            }
            std::process::exit(1);
        }
    }
}
