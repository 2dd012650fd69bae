//! Decompression with a nested-layer check.

use std::io::{Cursor, Read};

use flate2::read::GzDecoder;

use crate::error::{ArchiveError, Result};

/// Leading bytes of a gzip member.
pub(crate) const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompress an archive payload, unwrapping a surviving inner gzip layer.
///
/// Certain hosts transparently decompress a payload in transit, which leaves
/// the payload wrapped one layer deeper than the sender intended. After the
/// first pass this peeks the next two bytes; if they are the gzip magic, a
/// second pass runs over the re-assembled stream. The peeked bytes are
/// chained back in front of the remaining stream, so nothing the second
/// pass needs is ever consumed.
pub(crate) fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut first = GzDecoder::new(input);

    let mut magic = [0u8; 2];
    let seen = read_up_to(&mut first, &mut magic)?;
    let rejoined = Cursor::new(magic[..seen].to_vec()).chain(first);

    let mut payload = Vec::new();
    if seen == magic.len() && magic == GZIP_MAGIC {
        GzDecoder::new(rejoined)
            .read_to_end(&mut payload)
            .map_err(ArchiveError::Gzip)?;
    } else {
        let mut rejoined = rejoined;
        rejoined
            .read_to_end(&mut payload)
            .map_err(ArchiveError::Gzip)?;
    }
    Ok(payload)
}

/// Read until `buf` is full or the stream ends, returning the bytes read.
fn read_up_to(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ArchiveError::Gzip(e)),
        }
    }
    Ok(filled)
}
