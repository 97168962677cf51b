//! Minimal UTF-16LE to UTF-8 decoding.
//!
//! GD3 strings are UTF-16LE. Every BMP code unit maps directly to a scalar
//! value, well-formed surrogate pairs are combined, and anything else becomes
//! U+FFFD.

const HIGH_SURROGATES: std::ops::RangeInclusive<u16> = 0xD800..=0xDBFF;
const LOW_SURROGATES: std::ops::RangeInclusive<u16> = 0xDC00..=0xDFFF;

/// Decode a slice of UTF-16 code units into a UTF-8 `String`.
pub fn decode_units(units: &[u16]) -> String {
    let mut out = String::with_capacity(units.len());
    let mut i = 0;
    while i < units.len() {
        let unit = units[i];
        i += 1;

        if HIGH_SURROGATES.contains(&unit) {
            match units.get(i) {
                Some(&low) if LOW_SURROGATES.contains(&low) => {
                    i += 1;
                    let scalar =
                        0x1_0000 + (((unit as u32) - 0xD800) << 10) + ((low as u32) - 0xDC00);
                    out.push(char::from_u32(scalar).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                _ => out.push(char::REPLACEMENT_CHARACTER),
            }
            continue;
        }

        if LOW_SURROGATES.contains(&unit) {
            out.push(char::REPLACEMENT_CHARACTER);
            continue;
        }

        out.push(char::from_u32(unit as u32).unwrap_or(char::REPLACEMENT_CHARACTER));
    }
    out
}

/// Decode little-endian UTF-16 bytes. A trailing odd byte is ignored.
pub fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    decode_units(&units)
}
