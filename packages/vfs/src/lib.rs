//! Virtual filesystem for the sandboxed toolchain.
//!
//! The sandbox has no disk. This crate provides the in-memory namespace that
//! substitutes for one: a [`VfsStore`] of path to file/directory nodes, and a
//! [`Loader`] that stages packed archives (the standard-library tree,
//! prebuilt tool binaries, build-cache shards) into the store before the
//! toolchain's first read.
//!
//! Population happens once, completely. Any transport or decode failure
//! during loading aborts initialization — the toolchain never starts against
//! a partially populated store.

pub mod error;
pub mod loader;
pub mod path;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

pub use error::{LoadError, TransportError, VfsError};
pub use loader::{base_layout, ArchiveSource, Loader, MapSource, MountLayout};
pub use store::{Metadata, Node, NodeKind, VfsStore};

#[cfg(feature = "http")]
pub use http::HttpSource;
