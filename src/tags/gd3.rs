//! GD3 tag block decoding.
//!
//! Layout: `"Gd3 "`, u32 version, u32 byte length of the string table, then
//! eleven null-terminated UTF-16LE strings whose order matches
//! [`TagKey::ALL`](super::TagKey::ALL) one to one:
//! track (en/jp), game (en/jp), system (en/jp), author (en/jp), release date,
//! ripper, notes.

use super::utf16::decode_units;
use super::{CanonicalTagSet, TagKey};
use crate::container::cursor::{ByteCursor, Result};

/// GD3 block signature.
pub const GD3_MAGIC: &[u8; 4] = b"Gd3 ";

/// Size of the fixed part (magic, version, length).
pub const GD3_HEADER_LEN: usize = 12;

/// Decode the GD3 block starting at the beginning of `block`.
///
/// A string table that is shorter than its declared length, or that stops
/// before all eleven strings, is not an error: the strings decoded so far are
/// kept and the rest stay empty.
pub fn parse_gd3(block: &[u8]) -> Result<CanonicalTagSet> {
    let mut cursor = ByteCursor::new(block);
    cursor.expect(GD3_MAGIC, "Gd3 ")?;
    let _version = cursor.read_u32_le()?;
    let declared_len = cursor.read_u32_le()? as usize;

    let available = declared_len.min(cursor.remaining());
    let table = cursor.take(available)?;
    let mut strings = ByteCursor::new(table);

    let mut tags = CanonicalTagSet::new();
    for key in TagKey::ALL {
        if strings.is_empty() {
            break;
        }
        let (units, _terminated) = strings.read_utf16z();
        tags.set(key, decode_units(&units));
    }
    Ok(tags)
}
