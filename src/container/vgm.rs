//! VGM header parsing.
//!
//! Only the fields the engine itself needs are read: the authoritative length,
//! loop information and the location of the GD3 tag block. Everything that
//! concerns the chips is left to the native engine.

use nom::bytes::complete::tag;
use nom::number::complete::le_u32;
use nom::IResult;

use super::cursor::Result;
use crate::duration::rescale;
use crate::error::ContainerError;
use crate::tags::{parse_gd3, CanonicalTagSet};

/// Sample rate all VGM timing fields are expressed in.
pub const VGM_TICK_RATE: u32 = 44_100;

/// VGM signature.
pub const VGM_MAGIC: &[u8; 4] = b"Vgm ";

/// Minimum header size covering every field read here (up to loop samples).
pub const VGM_MIN_HEADER_LEN: usize = 0x24;

/// Data offset used by files older than 1.50.
const LEGACY_DATA_OFFSET: usize = 0x40;

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Parsed VGM header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VgmHeader {
    /// BCD version (e.g. `0x171` for 1.71).
    pub version: u32,
    /// Absolute end-of-file offset as recorded in the header.
    pub eof_offset: usize,
    /// Absolute offset of the GD3 block, if present.
    pub gd3_offset: Option<usize>,
    /// Length of the whole song in 44.1 kHz ticks.
    pub total_samples: u32,
    /// Absolute offset of the loop point, if the song loops.
    pub loop_offset: Option<usize>,
    /// Length of the looped section in 44.1 kHz ticks.
    pub loop_samples: u32,
    /// Recording rate hint (0 when absent).
    pub rate: u32,
    /// Absolute offset of the command stream.
    pub data_offset: usize,
}

/// Whether `data` starts like a gzip stream (`.vgz`).
pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

/// Turn a header-relative offset into an absolute one (0 means "absent").
fn relative(base: usize, value: u32) -> Option<usize> {
    if value == 0 {
        None
    } else {
        base.checked_add(value as usize)
    }
}

struct FixedFields {
    eof: u32,
    version: u32,
    gd3: u32,
    total_samples: u32,
    loop_offset: u32,
    loop_samples: u32,
}

fn fixed_fields(input: &[u8]) -> IResult<&[u8], FixedFields> {
    let (input, _) = tag(&VGM_MAGIC[..])(input)?;
    let (input, eof) = le_u32(input)?;
    let (input, version) = le_u32(input)?;
    let (input, _sn76489_clock) = le_u32(input)?;
    let (input, _ym2413_clock) = le_u32(input)?;
    let (input, gd3) = le_u32(input)?;
    let (input, total_samples) = le_u32(input)?;
    let (input, loop_offset) = le_u32(input)?;
    let (input, loop_samples) = le_u32(input)?;
    Ok((
        input,
        FixedFields {
            eof,
            version,
            gd3,
            total_samples,
            loop_offset,
            loop_samples,
        },
    ))
}

fn read_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

impl VgmHeader {
    /// Parse the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() >= VGM_MAGIC.len() && &data[..VGM_MAGIC.len()] != VGM_MAGIC {
            return Err(ContainerError::InvalidMagic { expected: "Vgm " });
        }
        let fields = match fixed_fields(data) {
            Ok((_, fields)) => fields,
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e))
                if e.code == nom::error::ErrorKind::Tag =>
            {
                return Err(ContainerError::InvalidMagic { expected: "Vgm " });
            }
            Err(_) => {
                return Err(ContainerError::UnexpectedEof {
                    offset: data.len(),
                })
            }
        };

        let rate = if fields.version >= 0x101 {
            read_u32_at(data, 0x24).unwrap_or(0)
        } else {
            0
        };
        let data_offset = if fields.version >= 0x150 {
            read_u32_at(data, 0x34)
                .and_then(|rel| relative(0x34, rel))
                .unwrap_or(LEGACY_DATA_OFFSET)
        } else {
            LEGACY_DATA_OFFSET
        };

        let header = VgmHeader {
            version: fields.version,
            eof_offset: relative(0x04, fields.eof).unwrap_or(data.len()),
            gd3_offset: relative(0x14, fields.gd3),
            total_samples: fields.total_samples,
            loop_offset: relative(0x1C, fields.loop_offset),
            loop_samples: fields.loop_samples,
            rate,
            data_offset,
        };

        if header.loop_offset.is_some() && header.loop_samples > header.total_samples {
            return Err(ContainerError::InvalidData {
                msg: format!(
                    "loop length {} exceeds total length {}",
                    header.loop_samples, header.total_samples
                ),
            });
        }

        Ok(header)
    }

    /// Human-readable version, e.g. `"1.71"`.
    pub fn version_string(&self) -> String {
        format!("{:x}.{:02x}", self.version >> 8, self.version & 0xFF)
    }

    /// Whether the song declares a loop section.
    pub fn has_loop(&self) -> bool {
        self.loop_offset.is_some() && self.loop_samples > 0
    }

    /// Authoritative song length converted to `sample_rate`.
    pub fn length_samples(&self, sample_rate: u32) -> u64 {
        ticks_to_samples(self.total_samples as u64, sample_rate)
    }

    /// Length of the intro (everything before the loop point) at `sample_rate`.
    pub fn intro_samples(&self, sample_rate: u32) -> u64 {
        let intro = self.total_samples.saturating_sub(self.loop_samples);
        ticks_to_samples(intro as u64, sample_rate)
    }

    /// Decode the GD3 block referenced by this header.
    ///
    /// Files without tags, or with a damaged block, produce an empty set.
    pub fn tags(&self, data: &[u8]) -> CanonicalTagSet {
        let Some(offset) = self.gd3_offset else {
            return CanonicalTagSet::new();
        };
        match data.get(offset..).map(parse_gd3) {
            Some(Ok(tags)) => tags,
            Some(Err(e)) => {
                log::warn!("ignoring unreadable GD3 block at 0x{offset:x}: {e}");
                CanonicalTagSet::new()
            }
            None => {
                log::warn!("GD3 offset 0x{offset:x} lies outside the file");
                CanonicalTagSet::new()
            }
        }
    }
}

/// Convert 44.1 kHz VGM ticks to samples at `sample_rate`.
pub fn ticks_to_samples(ticks: u64, sample_rate: u32) -> u64 {
    rescale(ticks, sample_rate as u64, VGM_TICK_RATE as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagKey;

    fn header_bytes(version: u32, total: u32, loop_rel: u32, loop_len: u32, gd3_rel: u32) -> Vec<u8> {
        let mut data = vec![0u8; 0x40];
        data[..4].copy_from_slice(VGM_MAGIC);
        data[0x08..0x0C].copy_from_slice(&version.to_le_bytes());
        data[0x14..0x18].copy_from_slice(&gd3_rel.to_le_bytes());
        data[0x18..0x1C].copy_from_slice(&total.to_le_bytes());
        data[0x1C..0x20].copy_from_slice(&loop_rel.to_le_bytes());
        data[0x20..0x24].copy_from_slice(&loop_len.to_le_bytes());
        data[0x24..0x28].copy_from_slice(&60u32.to_le_bytes());
        data
    }

    #[test]
    fn parses_length_and_loop_fields() {
        let data = header_bytes(0x171, 44_100 * 90, 0x24, 44_100 * 60, 0);
        let header = VgmHeader::parse(&data).unwrap();
        assert_eq!(header.version_string(), "1.71");
        assert_eq!(header.total_samples, 44_100 * 90);
        assert_eq!(header.loop_offset, Some(0x1C + 0x24));
        assert!(header.has_loop());
        assert_eq!(header.rate, 60);
        assert_eq!(header.data_offset, 0x40);
        assert_eq!(header.gd3_offset, None);
    }

    #[test]
    fn length_is_rescaled_to_output_rate() {
        let data = header_bytes(0x150, 44_100 * 10, 0, 0, 0);
        let header = VgmHeader::parse(&data).unwrap();
        assert_eq!(header.length_samples(44_100), 441_000);
        assert_eq!(header.length_samples(48_000), 480_000);
        assert_eq!(header.length_samples(22_050), 220_500);
        assert!(!header.has_loop());
    }

    #[test]
    fn long_songs_do_not_overflow() {
        let data = header_bytes(0x171, u32::MAX, 0, 0, 0);
        let header = VgmHeader::parse(&data).unwrap();
        assert_eq!(
            header.length_samples(192_000),
            u32::MAX as u64 * 192_000 / 44_100
        );
    }

    #[test]
    fn native_tick_counts_near_the_limit_saturate() {
        assert_eq!(ticks_to_samples(u64::MAX, 48_000), u64::MAX);
        assert_eq!(ticks_to_samples(u64::MAX, 44_100), u64::MAX);
        assert_eq!(ticks_to_samples(u64::MAX / 2, 22_050), u64::MAX / 4);
    }

    #[test]
    fn intro_excludes_loop_section() {
        let data = header_bytes(0x171, 44_100 * 90, 0x100, 44_100 * 60, 0);
        let header = VgmHeader::parse(&data).unwrap();
        assert_eq!(header.intro_samples(44_100), 44_100 * 30);
    }

    #[test]
    fn rejects_bad_signature_and_short_headers() {
        let mut data = header_bytes(0x171, 1, 0, 0, 0);
        data[0] = b'X';
        assert_eq!(
            VgmHeader::parse(&data),
            Err(ContainerError::InvalidMagic { expected: "Vgm " })
        );
        assert!(matches!(
            VgmHeader::parse(&header_bytes(0x171, 1, 0, 0, 0)[..0x10]),
            Err(ContainerError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            VgmHeader::parse(b"Vg"),
            Err(ContainerError::InvalidMagic { .. })
        ));
    }

    #[test]
    fn rejects_loop_longer_than_song() {
        let data = header_bytes(0x171, 100, 0x24, 200, 0);
        assert!(matches!(
            VgmHeader::parse(&data),
            Err(ContainerError::InvalidData { .. })
        ));
    }

    #[test]
    fn reads_tags_through_gd3_offset() {
        let mut data = header_bytes(0x171, 100, 0, 0, 0x40 - 0x14);
        data.extend_from_slice(b"Gd3 ");
        data.extend_from_slice(&0x100u32.to_le_bytes());
        let title: Vec<u8> = "Title"
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .chain([0, 0])
            .collect();
        data.extend_from_slice(&(title.len() as u32).to_le_bytes());
        data.extend_from_slice(&title);

        let header = VgmHeader::parse(&data).unwrap();
        assert_eq!(header.gd3_offset, Some(0x40));
        assert_eq!(header.tags(&data).get(TagKey::Title), "Title");
    }

    #[test]
    fn dangling_gd3_offset_yields_empty_tags() {
        let data = header_bytes(0x171, 100, 0, 0, 0x1000);
        let header = VgmHeader::parse(&data).unwrap();
        assert!(header.tags(&data).is_empty());
    }

    #[test]
    fn detects_gzip_payloads() {
        assert!(is_gzip(&[0x1F, 0x8B, 0x08, 0x00]));
        assert!(!is_gzip(VGM_MAGIC));
    }
}
