//! Copy-on-write snapshot over a base provider.
//!
//! All writes go to a private chunked overlay; the base is only ever read.
//! The first write into an overlay chunk seeds it with the base bytes it
//! shadows, so every allocated overlay range is a current image of those
//! bytes and [`SnapshotBuffer::commit`] can copy the ranges down as they are.
//! `clear` drops overlay ranges, which then read from the base again.
//!
//! `reset()` throws the overlay away, after which the snapshot reads exactly
//! as the base does.  Closing discards the overlay too; the base is released
//! according to its link's ownership.

use log::debug;

use crate::buffer::{Buffer, SparseMemoryBuffer};
use crate::config::StreamConfig;
use crate::error::{range_end, Result, StreamError};
use crate::extent::Extent;
use crate::ownership::InnerBuffer;
use crate::stream::{layered_extents, layered_read};

#[derive(Debug)]
pub struct SnapshotBuffer {
    base:    InnerBuffer,
    overlay: SparseMemoryBuffer,
    length:  u64,
}

impl SnapshotBuffer {
    pub fn new(base: InnerBuffer, chunk_size: u64) -> Self {
        let length = base.capacity();
        Self {
            base,
            overlay: SparseMemoryBuffer::new(chunk_size),
            length,
        }
    }

    pub fn from_config(base: InnerBuffer, cfg: &StreamConfig) -> Self {
        Self::new(base, cfg.snapshot_chunk_size)
    }

    /// Whether any write has been buffered since the last reset/commit.
    pub fn is_dirty(&self) -> bool {
        self.overlay.allocated_chunks() > 0
    }

    /// Ranges currently shadowed by the overlay, at chunk granularity.
    pub fn dirty_extents(&mut self) -> Result<Vec<Extent>> {
        let cap = self.overlay.capacity();
        self.overlay.extents(0, cap)
    }

    /// Discard every buffered write.
    pub fn reset(&mut self) {
        debug!("snapshot reset: discarding {} overlay chunk(s)", self.overlay.allocated_chunks());
        self.overlay = SparseMemoryBuffer::new(self.overlay.chunk_size());
        self.length = self.base.capacity();
    }

    /// Write every buffered range into the base, then start over with an
    /// empty overlay.
    ///
    /// The base is checked before anything is written: it must accept writes
    /// and hold the snapshot's full length, growing first if it can.  When
    /// that fails the base is untouched and the overlay is kept.
    pub fn commit(&mut self) -> Result<()> {
        if self.base.is_released() {
            return Err(StreamError::Closed);
        }
        let dirty = self.dirty_extents()?;
        let base_len = self.base.capacity();
        if !dirty.is_empty() || self.length > base_len {
            if !self.base.can_write() {
                return Err(StreamError::ReadOnly);
            }
            if self.length > base_len {
                debug!("snapshot commit: growing base from {base_len} to {}", self.length);
                self.base.set_capacity(self.length)?;
            }
        }

        debug!("snapshot commit: {} extent(s) into base", dirty.len());
        let mut scratch = Vec::new();
        for e in dirty {
            scratch.resize(e.length as usize, 0);
            let got = self.overlay.read(e.start, &mut scratch)?;
            self.base.write(e.start, &scratch[..got])?;
        }
        self.base.flush()?;
        self.reset();
        Ok(())
    }

    /// Seed every not-yet-materialized overlay chunk in `[start, end)` from
    /// the base.
    fn seed_chunks(&mut self, start: u64, end: u64) -> Result<()> {
        let cs = self.overlay.chunk_size();
        let mut scratch = vec![0u8; cs as usize];
        for idx in start / cs..=(end - 1) / cs {
            let chunk_start = idx * cs;
            if !self.overlay.extents(chunk_start, cs)?.is_empty() {
                continue;
            }
            let got = self.base.read(chunk_start, &mut scratch)?;
            if got > 0 {
                self.overlay.write(chunk_start, &scratch[..got])?;
            }
        }
        Ok(())
    }
}

impl Buffer for SnapshotBuffer {
    fn can_read(&self) -> bool {
        self.base.can_read()
    }

    fn can_write(&self) -> bool {
        !self.base.is_released()
    }

    fn capacity(&self) -> u64 {
        self.length
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if self.base.is_released() {
            return Err(StreamError::Closed);
        }
        layered_read(&mut self.overlay, Some(&mut self.base), self.length, pos, buf)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        if self.base.is_released() {
            return Err(StreamError::Closed);
        }
        if data.is_empty() {
            return Ok(());
        }
        let end = range_end(pos, data.len() as u64)?;
        self.seed_chunks(pos, end)?;
        self.overlay.write(pos, data)?;
        self.length = self.length.max(end);
        Ok(())
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        let base_len = self.base.capacity();
        if value < base_len {
            return Err(StreamError::invalid_range(format!(
                "snapshot cannot shrink to {value}, below its {base_len}-byte base"
            )));
        }
        if value < self.overlay.capacity() {
            self.overlay.set_capacity(value)?;
        }
        self.length = value;
        Ok(())
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        layered_extents(&mut self.overlay, Some(&mut self.base), self.length, start, count)
    }

    /// Drops buffered writes in the range, exposing the base bytes again.
    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        self.overlay.clear(start, count)
    }

    fn close(&mut self) -> Result<()> {
        self.overlay.discard();
        self.base.release()
    }
}
