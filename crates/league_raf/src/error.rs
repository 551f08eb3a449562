//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file is not a valid archive index
    #[error("invalid archive index: {0}")]
    InvalidIndex(String),

    /// a compressed payload could not be inflated
    #[error("corrupt compressed payload: {0}")]
    CorruptPayload(String),

    /// rewritten data failed its self-verification
    #[error("integrity check failed: {0}")]
    IntegrityCheck(String),

    /// unable to find requested entry
    #[error("unable to find entry {0}")]
    EntryNotFound(String),

    /// the mesh codec collaborator rejected a payload
    #[error("mesh codec failure: {0}")]
    MeshCodec(String),

    /// recording rewritten sizes failed
    #[error("failed to record rewritten sizes")]
    SizeSink(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
