//! Error types for the archive codec.

use thiserror::Error;

/// Errors produced while encoding or decoding a packed archive.
///
/// Every decode failure is fatal to the archive as a whole; there is no
/// entry-by-entry recovery, because a partially staged filesystem is worse
/// than no filesystem at all.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The gzip layer could not be read.
    #[error("gzip stream error: {0}")]
    Gzip(#[source] std::io::Error),

    /// The stream ended before the announced data.
    #[error("archive truncated: needed {needed} more bytes")]
    Truncated { needed: usize },

    /// A tag byte did not match the expected wire tag.
    #[error("unexpected tag byte {found:#04x}, expected {expected:#04x}")]
    Tag { expected: u8, found: u8 },

    /// The decompressed stream starts with no known generation marker.
    #[error("unknown archive generation (leading byte {leading:#04x})")]
    UnknownGeneration { leading: u8 },

    /// The decompressed stream was empty.
    #[error("empty archive stream")]
    Empty,

    /// An entry key is not valid UTF-8.
    #[error("archive key is not valid UTF-8")]
    KeyEncoding(#[source] std::string::FromUtf8Error),

    /// The legacy generation did not contain a JSON object of strings.
    #[error("legacy archive is not a JSON object of strings: {0}")]
    LegacyJson(#[source] serde_json::Error),

    /// A legacy entry's content is not valid base64.
    #[error("legacy archive value for {key:?} is not valid base64: {source}")]
    LegacyBase64 {
        key: String,
        #[source]
        source: base64::DecodeError,
    },

    /// A key, value, or entry count does not fit a 32-bit length field.
    #[error("archive entry does not fit a 32-bit length field ({len} bytes)")]
    EntryTooLarge { len: usize },
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, ArchiveError>;
