use std::path::PathBuf;

use thiserror::Error;

use crate::codec::TextCodec;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures surfaced by [`crate::XRayProjector::write`] and the output helpers.
///
/// Any error means the target file must be discarded; nothing is partially
/// committed by the SQLite sink.
#[derive(Error, Debug)]
pub enum Error {
    /// The bundle violates a structural rule the projection relies on.
    #[error("malformed bundle: {0}")]
    MalformedBundle(String),

    /// The table sink rejected an operation.
    #[error("sink failure: {0}")]
    SinkFailure(#[from] SinkError),

    /// A string field holds characters the configured codec cannot represent.
    #[error("cannot encode field `{field}` as {codec}")]
    EncodingFailure { field: String, codec: TextCodec },

    /// The book identifier cannot be used to name the output file.
    #[error("invalid ASIN: {0:?}")]
    InvalidAsin(String),

    #[error("failed to compile pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Errors raised by a [`crate::TableSink`] implementation.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("refusing to overwrite existing database: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("sink already saved")]
    AlreadySaved,

    #[error("sink rejected operation: {0}")]
    Rejected(String),
}
