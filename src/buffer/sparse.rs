//! Chunked in-memory sparse buffer.
//!
//! Storage is a map from chunk index to a fixed-size chunk.  A chunk exists
//! only once something has been written into it and is then allocated as a
//! whole; reads of absent chunks return zeros.  Each chunk keeps the ranges
//! of it that are still allocated: `clear` subtracts from them and zeroes the
//! bytes, and a chunk is dropped once nothing of it remains allocated.

use std::collections::BTreeMap;

use log::trace;

use crate::buffer::{check_fixed_write, clipped_len, Buffer};
use crate::config::{CapacityMode, StreamConfig};
use crate::error::{range_end, Result, StreamError};
use crate::extent::{self, Extent};

#[derive(Debug, Clone)]
struct Chunk {
    data:      Box<[u8]>,
    /// Still-allocated ranges of this chunk, in absolute offsets.
    allocated: Vec<Extent>,
}

#[derive(Debug, Clone)]
pub struct SparseMemoryBuffer {
    chunk_size: u64,
    chunks:     BTreeMap<u64, Chunk>,
    capacity:   u64,
    /// Upper bound for fixed-capacity buffers.
    limit:      Option<u64>,
}

impl SparseMemoryBuffer {
    /// Growable buffer starting at capacity 0.
    pub fn new(chunk_size: u64) -> Self {
        Self::with_capacity(chunk_size, CapacityMode::Growable)
    }

    pub fn with_capacity(chunk_size: u64, mode: CapacityMode) -> Self {
        let (capacity, limit) = match mode {
            CapacityMode::Fixed(n) => (n, Some(n)),
            CapacityMode::Growable => (0, None),
        };
        Self {
            chunk_size: chunk_size.max(1),
            chunks: BTreeMap::new(),
            capacity,
            limit,
        }
    }

    pub fn from_config(cfg: &StreamConfig) -> Self {
        Self::with_capacity(cfg.chunk_size, cfg.capacity)
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// Number of materialized chunks.
    pub fn allocated_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_growable(&self) -> bool {
        self.limit.is_none()
    }

    /// Drop every chunk.  Capacity is left as is.
    pub fn discard(&mut self) {
        self.chunks.clear();
    }

    /// Chunk indices touched by `[start, end)`; `end` must exceed `start`.
    fn chunk_span(&self, start: u64, end: u64) -> (u64, u64) {
        (start / self.chunk_size, (end - 1) / self.chunk_size)
    }
}

impl Buffer for SparseMemoryBuffer {
    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let n  = clipped_len(pos, buf.len(), self.capacity);
        let cs = self.chunk_size;

        let mut done = 0usize;
        while done < n {
            let abs  = pos + done as u64;
            let idx  = abs / cs;
            let off  = (abs % cs) as usize;
            let take = (cs as usize - off).min(n - done);
            let dst  = &mut buf[done..done + take];
            match self.chunks.get(&idx) {
                Some(chunk) => dst.copy_from_slice(&chunk.data[off..off + take]),
                None        => dst.fill(0),
            }
            done += take;
        }
        Ok(n)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Ok(());
        }
        // Validate before touching any chunk so a rejected write leaves no trace.
        let end = range_end(pos, data.len() as u64)?;
        if self.limit.is_some() {
            check_fixed_write(pos, data.len(), self.capacity)?;
        }

        let cs = self.chunk_size;
        let mut done = 0usize;
        while done < data.len() {
            let abs  = pos + done as u64;
            let idx  = abs / cs;
            let off  = (abs % cs) as usize;
            let take = (cs as usize - off).min(data.len() - done);
            let chunk = self.chunks.entry(idx).or_insert_with(|| {
                trace!("materializing chunk {idx} ({cs} bytes)");
                Chunk {
                    data:      vec![0u8; cs as usize].into_boxed_slice(),
                    allocated: vec![Extent::new(idx * cs, cs)],
                }
            });
            chunk.data[off..off + take].copy_from_slice(&data[done..done + take]);
            chunk.allocated = extent::union(&chunk.allocated, &[Extent::new(abs, take as u64)]);
            done += take;
        }

        self.capacity = self.capacity.max(end);
        Ok(())
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        if let Some(limit) = self.limit {
            if value > limit {
                return Err(StreamError::Capacity {
                    position: 0,
                    length:   value,
                    capacity: limit,
                });
            }
        }
        if value < self.capacity {
            // Bytes past the new end must read as zero if the buffer regrows.
            self.clear(value, u64::MAX - value)?;
        }
        self.capacity = value;
        Ok(())
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        let end = range_end(start, count)?.min(self.capacity);
        if start >= end {
            return Ok(Vec::new());
        }
        let (first, last) = self.chunk_span(start, end);
        let raw: Vec<Extent> = self.chunks
            .range(first..=last)
            .flat_map(|(_, chunk)| chunk.allocated.iter().copied())
            .collect();
        Ok(extent::clip(&raw, start, end - start))
    }

    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        let end = range_end(start, count)?;
        if start >= end {
            return Ok(());
        }
        let (first, last) = self.chunk_span(start, end);
        let cs = self.chunk_size;
        let cleared = [Extent::from_bounds(start, end)];
        let mut emptied = Vec::new();

        for (idx, chunk) in self.chunks.range_mut(first..=last) {
            chunk.allocated = extent::subtract(&chunk.allocated, &cleared);
            if chunk.allocated.is_empty() {
                emptied.push(*idx);
                continue;
            }
            let chunk_start = idx * cs;
            let chunk_end   = chunk_start.saturating_add(cs);
            let from = (start.max(chunk_start) - chunk_start) as usize;
            let to   = (end.min(chunk_end) - chunk_start) as usize;
            chunk.data[from..to].fill(0);
        }
        for idx in emptied {
            trace!("dropping chunk {idx}");
            self.chunks.remove(&idx);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.discard();
        Ok(())
    }
}
