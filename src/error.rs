//! Error types for qrdrop.

use thiserror::Error;

/// Common error type for qrdrop.
#[derive(Error, Debug)]
pub enum ShareError {
    /// The upload form carried no file field.
    #[error("no file provided")]
    NoFileProvided,

    /// The file field was present but contained zero bytes.
    #[error("uploaded file is empty")]
    EmptyUpload,

    /// The file exceeded the configured upload limit.
    #[error("file too large (max {limit} bytes)")]
    SizeExceeded {
        /// Limit in bytes.
        limit: u64,
    },

    /// Storage I/O failed while writing an upload.
    #[error("failed to write {key}: {source}")]
    WriteFailure {
        /// Key being written.
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// No stored object exists under the key.
    #[error("{0} not found")]
    NotFound(String),

    /// Storage I/O failed while reading an existing object.
    #[error("failed to read {key}: {source}")]
    ReadFailure {
        /// Key being read.
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// The key would resolve outside the storage namespace.
    #[error("invalid storage key: {0:?}")]
    PathTraversalRejected(String),

    /// The URL does not fit in a link code.
    #[error("URL of {len} bytes is too long to encode")]
    OversizedInput {
        /// Length of the rejected URL in bytes.
        len: usize,
    },

    /// The link code image could not be produced.
    #[error("failed to encode link code: {0}")]
    Encode(String),

    /// Another object already occupies the key.
    #[error("{0} already exists")]
    Conflict(String),

    /// The request body could not be parsed as a multipart form.
    #[error("invalid multipart data: {0}")]
    Multipart(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error outside of object reads and writes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for qrdrop operations.
pub type Result<T> = std::result::Result<T, ShareError>;
