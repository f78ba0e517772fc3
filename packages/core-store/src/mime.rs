//! File name extension to MIME type lookup.

use std::collections::BTreeMap;

use collection_literals::btree;
use lazy_static::lazy_static;

/// Type reported for unknown or missing extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

lazy_static! {
    static ref MIME_TYPES: BTreeMap<&'static str, &'static str> = btree! {
        // Text
        "txt" => "text/plain",
        "text" => "text/plain",
        "log" => "text/plain",
        "md" => "text/markdown",
        "markdown" => "text/markdown",
        "csv" => "text/csv",
        "tsv" => "text/tab-separated-values",
        "html" => "text/html",
        "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "mjs" => "text/javascript",
        "xml" => "application/xml",
        "json" => "application/json",
        "yaml" => "application/yaml",
        "yml" => "application/yaml",
        "toml" => "application/toml",
        // Images
        "png" => "image/png",
        "jpg" => "image/jpeg",
        "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/vnd.microsoft.icon",
        "avif" => "image/avif",
        // Audio and video
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        // Fonts
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        // Documents and archives
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "tar" => "application/x-tar",
        "wasm" => "application/wasm",
        "bin" => OCTET_STREAM,
    };
}

/// Resolve the MIME type for a file name.
///
/// The extension is everything after the last `.`, compared
/// case-insensitively. Names without an extension, and dot-files such as
/// `.profile`, resolve to [`OCTET_STREAM`].
///
/// ```rust
/// use vfiles_core_store::mime;
///
/// assert_eq!(mime::resolve("c.txt"), "text/plain");
/// assert_eq!(mime::resolve("my-data.bin"), "application/octet-stream");
/// assert_eq!(mime::resolve("README"), "application/octet-stream");
/// ```
pub fn resolve(name: &str) -> &'static str {
    let extension = match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() => extension,
        _ => return OCTET_STREAM,
    };

    MIME_TYPES
        .get(extension.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(OCTET_STREAM)
}
