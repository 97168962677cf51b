//! Error types shared by the engine, the adapters and the native boundary.

use crate::format::BackendKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a native synthesis library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeError {
    /// No native library is registered for this backend.
    #[error("native library not available")]
    Unavailable,
    /// The native library refused the data or the request.
    #[error("native library rejected the request: {0}")]
    Rejected(String),
    /// The native library does not know the requested track.
    #[error("native library has no track {0}")]
    InvalidTrack(u32),
}

impl From<String> for NativeError {
    fn from(msg: String) -> Self {
        NativeError::Rejected(msg)
    }
}

impl From<&str> for NativeError {
    fn from(msg: &str) -> Self {
        NativeError::Rejected(msg.to_string())
    }
}

/// Errors raised while parsing a container header or tag block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Data ended before a required field.
    #[error("unexpected end of data at offset 0x{offset:04x}")]
    UnexpectedEof {
        /// Offset of the field that could not be read.
        offset: usize,
    },
    /// Magic bytes did not match the expected identifier.
    #[error("expected '{expected}' signature")]
    InvalidMagic {
        /// Human-readable form of the expected signature.
        expected: &'static str,
    },
    /// Generic validation error.
    #[error("{msg}")]
    InvalidData {
        /// Explanation of the validation failure.
        msg: String,
    },
}

/// Reasons an `open` call can fail.
///
/// A failed open always leaves the engine closed.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is empty.
    #[error("file is empty")]
    EmptyFile,
    /// The container header is malformed.
    #[error("invalid header: {0}")]
    InvalidHeader(#[from] ContainerError),
    /// The native player cannot decode the payload's encoding (e.g. gzip).
    #[error("unsupported payload: {0}")]
    UnsupportedPayload(String),
    /// No native library is available for the backend.
    #[error("no native library registered for the {0} backend")]
    BackendUnavailable(BackendKind),
    /// The native library rejected the file.
    #[error("{kind} backend rejected the file: {source}")]
    Native {
        /// Backend whose native library failed.
        kind: BackendKind,
        /// Error reported by the native library.
        #[source]
        source: NativeError,
    },
}

impl OpenError {
    /// Wrap a native error for `kind`, mapping `Unavailable` to
    /// [`OpenError::BackendUnavailable`].
    pub fn native(kind: BackendKind, source: NativeError) -> Self {
        match source {
            NativeError::Unavailable => OpenError::BackendUnavailable(kind),
            source => OpenError::Native { kind, source },
        }
    }
}

/// Reasons a track change can be rejected.
///
/// A rejected change leaves the current track untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// No file is open.
    #[error("no file is open")]
    NoSession,
    /// Index outside `0..count`.
    #[error("track {index} out of range (track count: {count})")]
    OutOfRange {
        /// Requested 0-based index.
        index: u32,
        /// Number of tracks available.
        count: u32,
    },
    /// The native library refused to switch.
    #[error("native track switch failed: {0}")]
    Native(#[from] NativeError),
}

/// Result alias for open operations.
pub type OpenResult<T> = std::result::Result<T, OpenError>;
