//! Error taxonomy shared by every buffer, stream and chain operation.
//!
//! Extent algebra never fails; everything else surfaces a [`StreamError`] to
//! the immediate caller.  There is no retry anywhere in the crate.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    /// A write (or capacity change) would exceed a fixed-capacity buffer.
    #[error("Write of {length} bytes at {position} exceeds fixed capacity {capacity}")]
    Capacity { position: u64, length: u64, capacity: u64 },

    /// The parent of a differencing layer could not be located, or the
    /// located file carries a different identity than the child expects.
    #[error("Cannot resolve parent of {}: {reason}", child.display())]
    ChainResolution { child: PathBuf, reason: String },

    /// Linking the parent would revisit a layer already in the chain.
    #[error("Differencing chain loops back to {}", path.display())]
    CycleDetected { path: PathBuf },

    #[error("Invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("Buffer is read-only")]
    ReadOnly,

    #[error("Buffer has been closed")]
    Closed,

    /// A provider kind name that is not part of the closed provider set.
    #[error("Unknown provider kind '{0}'")]
    UnknownProvider(String),

    #[error("Locator record error: {0}")]
    Locator(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, StreamError>;

impl StreamError {
    pub(crate) fn invalid_range(reason: impl Into<String>) -> Self {
        StreamError::InvalidRange { reason: reason.into() }
    }

    pub(crate) fn chain(child: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        StreamError::ChainResolution { child: child.into(), reason: reason.into() }
    }
}

impl From<StreamError> for io::Error {
    fn from(e: StreamError) -> Self {
        let kind = match &e {
            StreamError::Io(inner)                => inner.kind(),
            StreamError::Capacity { .. }          => io::ErrorKind::WriteZero,
            StreamError::InvalidRange { .. }      => io::ErrorKind::InvalidInput,
            StreamError::ReadOnly                 => io::ErrorKind::PermissionDenied,
            StreamError::Closed                   => io::ErrorKind::BrokenPipe,
            StreamError::ChainResolution { .. }   => io::ErrorKind::NotFound,
            StreamError::CycleDetected { .. }
            | StreamError::UnknownProvider(_)
            | StreamError::Locator(_)             => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, e)
    }
}

/// Checked `start + len`, the common guard for every range argument.
pub(crate) fn range_end(start: u64, len: u64) -> Result<u64> {
    start.checked_add(len).ok_or_else(|| {
        StreamError::invalid_range(format!("range {start}+{len} overflows u64"))
    })
}
