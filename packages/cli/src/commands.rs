//! Subcommands of the `vfiles` binary.
//!
//! - `write <path> [--from <file>]` - Store a file, streaming it from
//!   `<file>` or stdin
//! - `read <path>` - Stream a file to stdout
//! - `stats <path>` - Print metadata as one JSON object
//! - `ls [path] [-r]` - Print one JSON object per entry, pre-order
//! - `mv <from> <to>` - Move a file or directory
//! - `rm <path>` - Remove a file or directory

use std::io;
use std::path::PathBuf;

use bytes::Bytes;
use clap::Subcommand;
use futures::stream::{self, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use vfiles::{
    clamp_chunk_size, ChunkSource, DiskStoreError, FilesApi, ListOptions, ProducerError,
};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a file, replacing any previous content
    Write {
        path: String,
        /// Read content from this file instead of stdin
        #[arg(long)]
        from: Option<PathBuf>,
    },
    /// Write a file's content to stdout
    Read { path: String },
    /// Show metadata for a file or directory
    Stats { path: String },
    /// List a directory
    Ls {
        #[arg(default_value = "/")]
        path: String,
        /// Include everything below the directory
        #[arg(short, long)]
        recursive: bool,
    },
    /// Move a file or directory
    Mv { from: String, to: String },
    /// Remove a file or directory
    Rm { path: String },
}

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Store(#[from] vfiles::Error),
    #[error("{0}")]
    Open(#[from] DiskStoreError),
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Stream everything `reader` yields as chunks of at most `chunk_size`
/// bytes, clamped like [`vfiles::StoreOptions::with_chunk_size`].
pub fn reader_source<R>(reader: R, chunk_size: usize) -> ChunkSource
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let chunk_size = clamp_chunk_size(chunk_size);
    stream::try_unfold(reader, move |mut reader| async move {
        let mut buffer = vec![0u8; chunk_size];
        let read = reader.read(&mut buffer).await?;
        if read == 0 {
            return Ok(None);
        }
        buffer.truncate(read);
        Ok::<_, ProducerError>(Some((Bytes::from(buffer), reader)))
    })
    .boxed()
}

/// Run one command against `store`, printing results to `out`.
pub async fn execute<W>(
    store: &dyn FilesApi,
    command: Command,
    chunk_size: usize,
    out: &mut W,
) -> Result<(), CliError>
where
    W: AsyncWrite + Unpin + Send,
{
    match command {
        Command::Write { path, from } => {
            let source = match from {
                Some(file) => reader_source(tokio::fs::File::open(file).await?, chunk_size),
                None => reader_source(tokio::io::stdin(), chunk_size),
            };
            store.write(&path, source).await?;
        }
        Command::Read { path } => {
            let mut chunks = store.read(&path).await?;
            while let Some(chunk) = chunks.next().await {
                out.write_all(&chunk?).await?;
            }
        }
        Command::Stats { path } => {
            let info = store.stats(&path).await?;
            write_json_line(out, &info).await?;
        }
        Command::Ls { path, recursive } => {
            let mut entries = store.list(&path, ListOptions { recursive }).await?;
            while let Some(info) = entries.next().await {
                write_json_line(out, &info?).await?;
            }
        }
        Command::Mv { from, to } => store.move_path(&from, &to).await?,
        Command::Rm { path } => store.remove(&path).await?,
    }
    out.flush().await?;
    Ok(())
}

async fn write_json_line<W, T>(out: &mut W, value: &T) -> Result<(), CliError>
where
    W: AsyncWrite + Unpin + Send,
    T: serde::Serialize + ?Sized,
{
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    out.write_all(&line).await?;
    Ok(())
}
