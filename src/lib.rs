//! Backend-dispatch playback engine for chiptune, tracker and MIDI files
//!
//! One transport and one audio contract over five families of synthesis
//! backends:
//!
//! - register logs (VGM, S98, DRO, GYM)
//! - emulated console music (NSF, SPC, GBS, HES, AY, SAP)
//! - tracker modules (MOD, XM, S3M, IT, ...)
//! - MSX music (KSS, MGS, ...)
//! - General MIDI rendered through OPL synthesis
//!
//! The engine classifies a file by extension, opens exactly one backend for
//! it, and normalizes the backend's audio (saturated interleaved `i16`),
//! positions and lengths (samples at the output rate), tracks (0-based) and
//! metadata (eleven canonical tags). Rendered audio is also fed to a
//! lock-free tap that a UI thread can turn into a magnitude spectrum.
//!
//! The synthesis itself lives in native libraries the host links; they plug
//! in through [`NativeLibrary`]. VGM length and tags and KSS song ranges are
//! read by the engine itself and work without any native library.
//!
//! # Crate layout
//! - [`format`]: extension → [`BackendKind`]
//! - [`container`]: VGM and KSS headers
//! - [`tags`]: canonical tags and GD3 decoding
//! - [`duration`]: track length policy
//! - [`native`]: native engine traits and the aux-file resolver
//! - [`backend`]: one adapter per backend family
//! - [`spectrum`]: ring tap and FFT
//! - [`engine`]: session and transport
//! - [`host`]: thread-safe handle with total results
//! - [`config`]: JSON configuration
//!
//! # Quick start
//! ```no_run
//! use std::sync::Arc;
//! use vgmdeck::{DeckHandle, NullLibrary};
//!
//! let deck = DeckHandle::new(Arc::new(NullLibrary));
//! println!("{} samples", deck.get_track_length_direct("song.vgm"));
//! if deck.open("song.vgm") {
//!     let mut buffer = vec![0i16; 2 * 1024];
//!     let frames = deck.fill_buffer(&mut buffer, 1024);
//!     let bars = deck.get_spectrum();
//!     println!("{frames} frames, {} bars, tags: {}", bars.len(), deck.get_tags());
//! }
//! ```

#![warn(missing_docs)]

pub mod backend; // Backend adapters
pub mod config; // Engine configuration
pub mod container; // VGM / KSS headers
pub mod duration; // Length policy
pub mod engine; // Session + transport
pub mod error; // Error types
pub mod format; // File classification
pub mod host; // Host handle
pub mod native; // Native library boundary
pub mod spectrum; // Ring tap + FFT
pub mod tags; // Canonical metadata

// Public API exports
pub use backend::{Backend, Capabilities, StereoFrame};
pub use config::{ConfigError, EngineConfig};
pub use container::{KssHeader, TrackRange, VgmHeader};
pub use duration::{estimate_samples, LengthHint};
pub use engine::{Engine, EngineSettings, ProbeError, TransportState};
pub use error::{ContainerError, NativeError, OpenError, TrackError};
pub use format::{classify, BackendKind};
pub use host::DeckHandle;
pub use native::{
    AuxFiles, DeviceInfo, NativeLibrary, NullLibrary, RomPath, SourceFile, UNITY_VOLUME,
};
pub use spectrum::{SpectrumError, SpectrumTap};
pub use tags::{CanonicalTagSet, TagKey};
