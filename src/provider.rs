//! Closed provider-kind factory.
//!
//! Embedding applications describe a base provider as a small JSON document
//! tagged with its `kind`:
//!
//! ```json
//! { "kind": "file_range", "path": "disk.img", "offset": 512, "length": 4096 }
//! ```
//!
//! The set of kinds is closed.  A name outside it is rejected with
//! [`StreamError::UnknownProvider`] before any field is looked at.

use std::fs::OpenOptions;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::buffer::{Buffer, MediumBuffer, SparseMemoryBuffer};
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::overlay::{SubBuffer, ZeroBuffer};
use crate::ownership::InnerBuffer;

// ── ProviderKind ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Zero,
    Memory,
    File,
    FileRange,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 4] = [
        ProviderKind::Zero,
        ProviderKind::Memory,
        ProviderKind::File,
        ProviderKind::FileRange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::Zero      => "zero",
            ProviderKind::Memory    => "memory",
            ProviderKind::File      => "file",
            ProviderKind::FileRange => "file_range",
        }
    }

    pub fn from_name(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "zero"       => Ok(ProviderKind::Zero),
            "memory"     => Ok(ProviderKind::Memory),
            "file"       => Ok(ProviderKind::File),
            "file_range" => Ok(ProviderKind::FileRange),
            _            => Err(StreamError::UnknownProvider(s.to_string())),
        }
    }
}

// ── ProviderSpec ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProviderSpec {
    /// All-zero content of a fixed length.
    Zero { length: u64 },
    /// Empty chunked in-memory buffer.
    Memory {
        #[serde(default)]
        config: StreamConfig,
    },
    /// A whole file.  Growable when writable.
    File {
        path: PathBuf,
        #[serde(default)]
        writable: bool,
    },
    /// A read-only window of a file.
    FileRange { path: PathBuf, offset: u64, length: u64 },
}

impl ProviderSpec {
    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderSpec::Zero { .. }      => ProviderKind::Zero,
            ProviderSpec::Memory { .. }    => ProviderKind::Memory,
            ProviderSpec::File { .. }      => ProviderKind::File,
            ProviderSpec::FileRange { .. } => ProviderKind::FileRange,
        }
    }

    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        if let Some(kind) = value.get("kind").and_then(|k| k.as_str()) {
            ProviderKind::from_name(kind)?;
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Construct the provider a spec describes.
pub fn open_provider(spec: &ProviderSpec) -> Result<Box<dyn Buffer>> {
    Ok(match spec {
        ProviderSpec::Zero { length } => Box::new(ZeroBuffer::new(*length)),
        ProviderSpec::Memory { config } => Box::new(SparseMemoryBuffer::from_config(config)),
        ProviderSpec::File { path, writable } => {
            let file = OpenOptions::new().read(true).write(*writable).open(path)?;
            let medium = MediumBuffer::new(file)?;
            if *writable {
                Box::new(medium)
            } else {
                Box::new(medium.read_only())
            }
        }
        ProviderSpec::FileRange { path, offset, length } => {
            let file = OpenOptions::new().read(true).open(path)?;
            let medium = MediumBuffer::fixed(file)?.read_only();
            Box::new(SubBuffer::new(InnerBuffer::owned(medium), *offset, *length)?)
        }
    })
}
