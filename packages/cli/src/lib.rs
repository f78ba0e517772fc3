//! Library half of the `vfiles` binary: argument parsing, subcommands and
//! logging setup.

pub mod commands;
pub mod logging;

use std::path::PathBuf;

use clap::builder::RangedU64ValueParser;
use clap::Parser;

use vfiles::{DiskStore, StoreOptions, DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE};

use crate::commands::{CliError, Command};

/// vfiles - read and write a disk-backed virtual file store
#[derive(Parser, Debug)]
#[command(name = "vfiles")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the store
    #[arg(long, env = "VFILES_ROOT")]
    pub root: PathBuf,

    /// Largest chunk, in bytes, used when streaming content in or out
    #[arg(
        long,
        default_value_t = DEFAULT_CHUNK_SIZE,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..=MAX_CHUNK_SIZE as u64)
    )]
    pub chunk_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// Open the store named by `args` and run its command, writing results to
/// stdout.
pub async fn run(args: Args) -> Result<(), CliError> {
    let options = StoreOptions::new().with_chunk_size(args.chunk_size);
    let store = DiskStore::open_with_options(args.root, options)?;
    let mut stdout = tokio::io::stdout();
    commands::execute(&store, args.command, args.chunk_size, &mut stdout).await
}
