//! Error types for export operations

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Errors surfaced to the caller of an export.
///
/// Per-item problems (a formula that does not rasterize, an image that cannot be
/// embedded, a clipboard method that is unavailable) never show up here; they are
/// absorbed and recorded as warnings. Only failures that leave the caller without
/// a result are reported.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Another export is still running on the same exporter.
    #[error("An export is already in progress; wait for it to finish and try again")]
    ExportInProgress,

    /// Every clipboard strategy failed.
    #[error(
        "Could not copy to the clipboard ({reasons}). Try again, select the preview and copy it manually, or download the document as a file"
    )]
    ClipboardExhausted { reasons: String },

    /// The normalized document could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Writing an exported file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while reading an image source.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// The session store has no data for this handle (expired or never registered).
    #[error("Session handle '{0}' is not available")]
    UnknownHandle(String),

    /// A network or file fetch failed.
    #[error("Failed to fetch '{url}': {reason}")]
    Fetch { url: String, reason: String },

    /// The resource is bigger than the configured limit.
    #[error("Resource '{url}' exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: usize },

    /// The source cannot be resolved by this loader.
    #[error("Unsupported image source '{0}'")]
    Unsupported(String),
}

/// Reasons a formula could not be rasterized.
///
/// The rasterizer never returns these to its caller; they end up in the log and in
/// the export warnings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RasterError {
    #[error("formula serialized to empty markup")]
    EmptySerialization,

    #[error("unresolved symbol references: {}", .0.join(", "))]
    UnresolvedSymbols(Vec<String>),

    #[error("rasterization did not finish within {0:?}")]
    Timeout(Duration),

    #[error("failed to decode vector markup: {0}")]
    Decode(String),

    #[error("cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },

    #[error("failed to encode raster image: {0}")]
    Encode(String),

    #[error("raster task aborted: {0}")]
    Task(String),
}
