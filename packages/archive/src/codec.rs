//! Encode and decode packed archives.
//!
//! The tagged binary generation is the one new archives are written in:
//!
//! ```text
//! gzip(
//!     0xBA                    map, 32-bit length
//!     u32 BE                  entry count
//!     repeated entries:
//!         0x7A  u32 BE  key   text string, 32-bit length, UTF-8
//!         0x5A  u32 BE  value byte string, 32-bit length, raw
//! )
//! ```
//!
//! All integers are big-endian. The legacy generation is a gzip-compressed
//! JSON object of path to base64 string. [`decode`] tells the two apart by
//! the decompressed stream's leading byte: `0xBA` is tagged binary, `{` is
//! legacy JSON.

use std::collections::BTreeMap;
use std::io::Write;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{ArchiveError, Result};
use crate::gzip::decompress;

/// A decoded archive: path keys mapped to raw content.
///
/// Keys are unique within one archive and carry no ordering significance.
pub type ArchiveMap = BTreeMap<String, Bytes>;

/// Map with 32-bit entry count.
const TAG_MAP32: u8 = 0xba;
/// Text string with 32-bit length.
const TAG_TEXT32: u8 = 0x7a;
/// Byte string with 32-bit length.
const TAG_BYTES32: u8 = 0x5a;

/// Encode a mapping into the tagged binary generation.
///
/// Fails with [`ArchiveError::EntryTooLarge`] if the entry count or any
/// key/value length does not fit the format's 32-bit length fields.
pub fn encode(map: &ArchiveMap) -> Result<Vec<u8>> {
    let count = len32(map.len())?;

    let mut out = GzEncoder::new(Vec::new(), Compression::default());
    write_all(&mut out, &[TAG_MAP32])?;
    write_all(&mut out, &count.to_be_bytes())?;
    for (key, value) in map {
        write_all(&mut out, &[TAG_TEXT32])?;
        write_all(&mut out, &len32(key.len())?.to_be_bytes())?;
        write_all(&mut out, key.as_bytes())?;
        write_all(&mut out, &[TAG_BYTES32])?;
        write_all(&mut out, &len32(value.len())?.to_be_bytes())?;
        write_all(&mut out, value)?;
    }
    out.finish().map_err(ArchiveError::Gzip)
}

/// Decode a packed archive of either generation.
///
/// Decompresses (unwrapping a doubled gzip layer if present), then detects
/// the generation from the leading byte. Any malformed header, tag, length,
/// key encoding, or base64 value fails the whole archive.
pub fn decode(input: &[u8]) -> Result<ArchiveMap> {
    let payload = decompress(input)?;
    match payload.first() {
        Some(&TAG_MAP32) => decode_tagged(&payload),
        Some(&b'{') => decode_legacy(&payload),
        Some(&leading) => Err(ArchiveError::UnknownGeneration { leading }),
        None => Err(ArchiveError::Empty),
    }
}

fn decode_tagged(payload: &[u8]) -> Result<ArchiveMap> {
    let mut reader = TagReader::new(payload);
    reader.tag(TAG_MAP32)?;
    let count = reader.len32()?;

    let mut map = ArchiveMap::new();
    for _ in 0..count {
        reader.tag(TAG_TEXT32)?;
        let len = reader.len32()?;
        let key = String::from_utf8(reader.take(len)?.to_vec())
            .map_err(ArchiveError::KeyEncoding)?;

        reader.tag(TAG_BYTES32)?;
        let len = reader.len32()?;
        let value = Bytes::copy_from_slice(reader.take(len)?);

        map.insert(key, value);
    }
    Ok(map)
}

fn decode_legacy(payload: &[u8]) -> Result<ArchiveMap> {
    let entries: BTreeMap<String, String> =
        serde_json::from_slice(payload).map_err(ArchiveError::LegacyJson)?;

    let mut map = ArchiveMap::new();
    for (key, encoded) in entries {
        let value = BASE64
            .decode(encoded.as_bytes())
            .map_err(|source| ArchiveError::LegacyBase64 {
                key: key.clone(),
                source,
            })?;
        map.insert(key, Bytes::from(value));
    }
    Ok(map)
}

fn len32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| ArchiveError::EntryTooLarge { len })
}

fn write_all(out: &mut impl Write, bytes: &[u8]) -> Result<()> {
    out.write_all(bytes).map_err(ArchiveError::Gzip)
}

/// Cursor over the decompressed tagged stream.
struct TagReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TagReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let remaining = self.buf.len() - self.pos;
        if remaining < len {
            return Err(ArchiveError::Truncated {
                needed: len - remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn tag(&mut self, expected: u8) -> Result<()> {
        let found = self.take(1)?[0];
        if found != expected {
            return Err(ArchiveError::Tag { expected, found });
        }
        Ok(())
    }

    fn len32(&mut self) -> Result<usize> {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(bytes) as usize)
    }
}
