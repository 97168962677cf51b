//! KSS header parsing (track range only).
//!
//! Two header flavours exist:
//!
//! * `KSCC`: 16-byte header, no song range; the driver accepts 0..=255.
//! * `KSSX`: byte 0x0E gives the size of an extra header at 0x10. When that
//!   extra header is at least 0x10 bytes, u16 at 0x18 is the first song and
//!   u16 at 0x1A the last one.
//!
//! Other MSX formats (MGS, BGM, ...) carry a single song.

use std::ops::RangeInclusive;
use std::path::Path;

use super::cursor::{ByteCursor, Result};
use crate::error::ContainerError;
use crate::format::extension_of;

const KSCC_MAGIC: &[u8; 4] = b"KSCC";
const KSSX_MAGIC: &[u8; 4] = b"KSSX";

const KSS_HEADER_LEN: usize = 0x10;
const KSSX_EXTRA_SIZE_OFFSET: usize = 0x0E;
const KSSX_SONG_RANGE_OFFSET: usize = 0x18;
const KSSX_MIN_EXTRA_LEN: u8 = 0x10;

/// Inclusive range of native song numbers a file declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackRange {
    /// First native song number.
    pub first: u16,
    /// Last native song number (inclusive).
    pub last: u16,
}

impl TrackRange {
    /// Range containing only song 0.
    pub const SINGLE: TrackRange = TrackRange { first: 0, last: 0 };

    /// Number of songs in the range.
    pub fn count(&self) -> u32 {
        u32::from(self.last - self.first) + 1
    }

    /// Native song number for a 0-based canonical index.
    pub fn native(&self, index: u32) -> Option<u16> {
        if index < self.count() {
            Some(self.first + index as u16)
        } else {
            None
        }
    }

    /// The range as a std inclusive range.
    pub fn as_range(&self) -> RangeInclusive<u16> {
        self.first..=self.last
    }
}

/// KSS header flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KssVariant {
    /// Original `KSCC` header.
    Kscc,
    /// Extended `KSSX` header.
    Kssx,
}

/// The parts of a KSS header the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KssHeader {
    /// Header flavour.
    pub variant: KssVariant,
    /// Load address of the Z80 image.
    pub load_address: u16,
    /// Declared song range.
    pub tracks: TrackRange,
}

/// Parse a KSS header.
pub fn parse_kss(data: &[u8]) -> Result<KssHeader> {
    let mut cursor = ByteCursor::new(data);
    let magic = cursor.take(4)?;
    let variant = if magic == KSCC_MAGIC {
        KssVariant::Kscc
    } else if magic == KSSX_MAGIC {
        KssVariant::Kssx
    } else {
        return Err(ContainerError::InvalidMagic {
            expected: "KSCC/KSSX",
        });
    };
    let load_address = cursor.read_u16_le()?;
    if data.len() < KSS_HEADER_LEN {
        return Err(ContainerError::UnexpectedEof {
            offset: data.len(),
        });
    }

    let tracks = match variant {
        KssVariant::Kscc => TrackRange {
            first: 0,
            last: 255,
        },
        KssVariant::Kssx => kssx_range(data)?,
    };

    Ok(KssHeader {
        variant,
        load_address,
        tracks,
    })
}

fn kssx_range(data: &[u8]) -> Result<TrackRange> {
    let extra_len = data[KSSX_EXTRA_SIZE_OFFSET];
    if extra_len < KSSX_MIN_EXTRA_LEN {
        return Ok(TrackRange {
            first: 0,
            last: 255,
        });
    }
    let mut cursor = ByteCursor::at(data, KSSX_SONG_RANGE_OFFSET)?;
    let first = cursor.read_u16_le()?;
    let last = cursor.read_u16_le()?;
    if last < first {
        return Err(ContainerError::InvalidData {
            msg: format!("song range {first}..={last} is reversed"),
        });
    }
    Ok(TrackRange { first, last })
}

/// Track range for an MSX file: from the header for `.kss`, a single song otherwise.
pub fn track_range_for(path: &Path, data: &[u8]) -> Result<TrackRange> {
    match extension_of(path).as_deref() {
        Some("kss") => parse_kss(data).map(|header| header.tracks),
        _ => Ok(TrackRange::SINGLE),
    }
}
