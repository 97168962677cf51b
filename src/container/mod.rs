//! Container headers the engine reads itself.
//!
//! Most formats are opaque to the engine and handed to a native library as
//! is. VGM and KSS are the exceptions: their length, tags and song range are
//! read here so probes work without constructing a native player.

pub mod cursor;
pub mod kss;
pub mod vgm;

pub use cursor::ByteCursor;
pub use kss::{parse_kss, track_range_for, KssHeader, TrackRange};
pub use vgm::{is_gzip, VgmHeader};
