//! Error types for the virtual filesystem and loader.

use thiserror::Error;

/// Errors from operations on the in-memory store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VfsError {
    /// The path does not name an entry.
    #[error("no such file or directory: {path}")]
    NotFound { path: String },

    /// The entry is a directory where a file was required.
    #[error("is a directory: {path}")]
    IsDirectory { path: String },

    /// The entry is a file where a directory was required.
    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    /// A file already occupies a path needed as a directory.
    #[error("file exists: {path}")]
    AlreadyExists { path: String },

    /// The directory still has children.
    #[error("directory not empty: {path}")]
    NotEmpty { path: String },

    /// The path is not absolute.
    #[error("path is not absolute: {path}")]
    NotAbsolute { path: String },
}

/// A failure fetching archive bytes from their source.
#[derive(Debug, Error)]
#[error("fetching {name:?}: {message}")]
pub struct TransportError {
    /// The archive name that was requested.
    pub name: String,
    /// Human-readable description of the failure.
    pub message: String,
}

impl TransportError {
    /// Build a transport error from any displayable cause.
    pub fn new(name: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self {
            name: name.into(),
            message: cause.to_string(),
        }
    }
}

/// Errors that abort archive loading.
///
/// All of these are fatal to initialization as a whole: the store must never
/// be half-populated when the toolchain starts.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The archive bytes could not be fetched.
    #[error("archive transport: {0}")]
    Transport(#[from] TransportError),

    /// The archive bytes could not be decoded.
    #[error("archive decode: {0}")]
    Decode(#[from] toolhost_archive::ArchiveError),

    /// A decoded entry could not be staged into the store.
    #[error("archive staging: {0}")]
    Vfs(#[from] VfsError),

    /// A cache shard name is not a single hexadecimal digit.
    #[error("invalid cache shard name: {name:?}")]
    InvalidShard { name: String },
}
