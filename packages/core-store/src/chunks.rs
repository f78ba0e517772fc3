//! Lazy byte-chunk streams.
//!
//! Writes consume a [`ChunkSource`]: a single-pass producer owned by the
//! caller whose failures are [`ProducerError`]s. Reads hand back a
//! [`ChunkStream`] whose failures come from the store itself. Chunk
//! boundaries carry no meaning; only the concatenated bytes do.

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};

use crate::error::{Error, ProducerError, Result};
use crate::info::FileInfo;

/// Caller-supplied chunks consumed by `write`.
pub type ChunkSource = BoxStream<'static, std::result::Result<Bytes, ProducerError>>;

/// Chunks produced by `read`.
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// Entries produced by `list`.
pub type InfoStream = BoxStream<'static, Result<FileInfo>>;

/// A source that yields `data` as a single chunk.
pub fn once(data: impl Into<Bytes>) -> ChunkSource {
    let data = data.into();
    stream::once(async move { Ok(data) }).boxed()
}

/// A source that yields each item of `chunks` in order.
pub fn from_iter<I>(chunks: I) -> ChunkSource
where
    I: IntoIterator,
    I::Item: Into<Bytes>,
    I::IntoIter: Send + 'static,
{
    stream::iter(chunks.into_iter().map(|chunk| Ok(chunk.into()))).boxed()
}

/// A source that yields fallible items in order, stopping the write at the
/// first error.
pub fn from_results<I>(chunks: I) -> ChunkSource
where
    I: IntoIterator<Item = std::result::Result<Bytes, ProducerError>>,
    I::IntoIter: Send + 'static,
{
    stream::iter(chunks).boxed()
}

/// Stream `data` back in slices of at most `chunk_size` bytes.
///
/// Slices share the underlying buffer; nothing is copied.
pub fn split(data: Bytes, chunk_size: usize) -> ChunkStream {
    let chunk_size = chunk_size.max(1);
    stream::unfold(data, move |mut rest| async move {
        if rest.is_empty() {
            return None;
        }
        let chunk = rest.split_to(chunk_size.min(rest.len()));
        Some((Ok(chunk), rest))
    })
    .boxed()
}

/// Concatenate every chunk of a read.
pub async fn collect(mut chunks: ChunkStream) -> Result<Bytes> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = chunks.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    Ok(buffer.freeze())
}

/// Collect a listing into a vector, failing on the first error.
pub async fn collect_infos(mut infos: InfoStream) -> Result<Vec<FileInfo>> {
    let mut collected = Vec::new();
    while let Some(info) = infos.next().await {
        collected.push(info?);
    }
    Ok(collected)
}

/// Convert a read into a source, e.g. to copy a file between stores.
pub fn pipe(chunks: ChunkStream) -> ChunkSource {
    chunks
        .map(|chunk| chunk.map_err(|e: Error| ProducerError::new(e)))
        .boxed()
}
