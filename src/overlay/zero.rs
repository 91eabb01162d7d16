//! Terminal provider that holds nothing and reads as zeros.
//!
//! Ends every differencing chain and backs freshly created, fully sparse
//! images.  It never reports an allocated extent and refuses writes.

use crate::buffer::{clipped_len, Buffer};
use crate::error::{Result, StreamError};
use crate::extent::Extent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZeroBuffer {
    length: u64,
}

impl ZeroBuffer {
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Buffer for ZeroBuffer {
    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        false
    }

    fn capacity(&self) -> u64 {
        self.length
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let n = clipped_len(pos, buf.len(), self.length);
        buf[..n].fill(0);
        Ok(n)
    }

    fn write(&mut self, _pos: u64, _data: &[u8]) -> Result<()> {
        Err(StreamError::ReadOnly)
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        self.length = value;
        Ok(())
    }

    fn extents(&mut self, _start: u64, _count: u64) -> Result<Vec<Extent>> {
        Ok(Vec::new())
    }

    fn clear(&mut self, _start: u64, _count: u64) -> Result<()> {
        Ok(())
    }
}
