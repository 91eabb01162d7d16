//! Construction-time configuration.
//!
//! Nothing in the crate reads ambient state: chunk sizes and capacity modes
//! are handed to constructors explicitly, either directly or through a
//! [`StreamConfig`] loaded by the embedding application.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default chunk size for sparse in-memory buffers: 64 KiB.
pub const DEFAULT_CHUNK_SIZE:          u64 = 64 * 1024;
/// Default chunk size for snapshot overlays: 4 KiB.
pub const DEFAULT_SNAPSHOT_CHUNK_SIZE: u64 = 4 * 1024;

/// Whether a buffer may grow past its declared capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityMode {
    /// Writes past the given capacity fail.
    Fixed(u64),
    /// Capacity extends to cover every write.
    Growable,
}

impl Default for CapacityMode {
    fn default() -> Self {
        CapacityMode::Growable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub chunk_size:          u64,
    pub snapshot_chunk_size: u64,
    pub capacity:            CapacityMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size:          DEFAULT_CHUNK_SIZE,
            snapshot_chunk_size: DEFAULT_SNAPSHOT_CHUNK_SIZE,
            capacity:            CapacityMode::Growable,
        }
    }
}

impl StreamConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let mut cfg: StreamConfig = serde_json::from_slice(bytes)?;
        cfg.chunk_size          = cfg.chunk_size.max(1);
        cfg.snapshot_chunk_size = cfg.snapshot_chunk_size.max(1);
        Ok(cfg)
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = StreamConfig::from_json(br#"{ "chunk_size": 512 }"#).unwrap();
        assert_eq!(cfg.chunk_size, 512);
        assert_eq!(cfg.snapshot_chunk_size, DEFAULT_SNAPSHOT_CHUNK_SIZE);
        assert_eq!(cfg.capacity, CapacityMode::Growable);
    }

    #[test]
    fn fixed_capacity_parses() {
        let cfg = StreamConfig::from_json(br#"{ "capacity": { "fixed": 4096 } }"#).unwrap();
        assert_eq!(cfg.capacity, CapacityMode::Fixed(4096));
    }

    #[test]
    fn zero_chunk_size_is_clamped() {
        let cfg = StreamConfig::from_json(br#"{ "chunk_size": 0 }"#).unwrap();
        assert_eq!(cfg.chunk_size, 1);
    }
}
