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

    /// file is not a valid release manifest
    #[error("invalid release manifest: {0}")]
    InvalidManifest(String),

    /// a file entry holds values that cannot be right
    #[error("manifest sanity check failed: {0}")]
    SanityCheck(String),

    /// unable to find requested path
    #[error("unable to find {0} in the release manifest")]
    PathNotFound(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
