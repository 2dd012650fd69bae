//! Packed-archive codec.
//!
//! A packed archive is a compressed, serialized mapping from path strings to
//! byte content, used to stage a standard-library tree, prebuilt tool
//! binaries, and build-cache shards into the sandbox's in-memory filesystem
//! before the toolchain starts.
//!
//! Two generations of the wire format exist and both are decoded here:
//!
//! - **Tagged binary** (current): a gzip stream containing a one-byte map
//!   tag plus a 32-bit big-endian entry count, followed by tagged
//!   length-prefixed key/value pairs.
//! - **Legacy**: a gzip stream containing a JSON object of path to
//!   base64-encoded content.
//!
//! The generation is detected from the decompressed stream's leading byte;
//! callers never select a version. Some transports transparently decompress
//! responses, so a payload may arrive with its outer gzip layer already
//! stripped — [`decode`] detects a surviving inner gzip layer and unwraps it.

pub mod codec;
pub mod error;
mod gzip;

pub use codec::{decode, encode, ArchiveMap};
pub use error::{ArchiveError, Result};
