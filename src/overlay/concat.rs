//! Concatenation of several providers into one address space.
//!
//! Part `i` occupies `[start_i, start_i + len_i)` where `start_i` is the sum
//! of the lengths before it.  Starts are computed once at construction and a
//! global offset is mapped to its part by binary search.  Zero-length parts
//! occupy no addresses and are never selected.

use crate::buffer::{check_fixed_write, clipped_len, Buffer};
use crate::error::{range_end, Result, StreamError};
use crate::extent::{self, Extent};
use crate::ownership::InnerBuffer;

#[derive(Debug)]
pub struct ConcatBuffer {
    parts:   Vec<InnerBuffer>,
    starts:  Vec<u64>,
    lengths: Vec<u64>,
    length:  u64,
}

impl ConcatBuffer {
    pub fn new(parts: Vec<InnerBuffer>) -> Result<Self> {
        let mut starts  = Vec::with_capacity(parts.len());
        let mut lengths = Vec::with_capacity(parts.len());
        let mut total   = 0u64;
        for part in &parts {
            let len = part.capacity();
            starts.push(total);
            lengths.push(len);
            total = range_end(total, len)?;
        }
        Ok(Self { parts, starts, lengths, length: total })
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// Index of the part holding global offset `pos`.
    fn locate(&self, pos: u64) -> Option<usize> {
        if pos >= self.length {
            return None;
        }
        // Last part starting at or before `pos`; zero-length parts share their
        // start with the next non-empty part and sort before it.
        Some(self.starts.partition_point(|&s| s <= pos) - 1)
    }

    /// Visit each part overlapping `[start, end)` with the local sub-range.
    fn for_each_part<F>(&mut self, start: u64, end: u64, mut f: F) -> Result<()>
    where
        F: FnMut(&mut InnerBuffer, u64, u64, u64) -> Result<()>,
    {
        let end = end.min(self.length);
        let Some(mut i) = self.locate(start) else {
            return Ok(());
        };
        while i < self.parts.len() && self.starts[i] < end {
            let part_start = self.starts[i];
            let local_from = start.max(part_start) - part_start;
            let local_to   = end.min(part_start + self.lengths[i]) - part_start;
            if local_to > local_from {
                f(&mut self.parts[i], part_start, local_from, local_to - local_from)?;
            }
            i += 1;
        }
        Ok(())
    }
}

impl Buffer for ConcatBuffer {
    fn can_read(&self) -> bool {
        self.parts.iter().all(|p| p.can_read())
    }

    fn can_write(&self) -> bool {
        self.parts.iter().all(|p| p.can_write())
    }

    fn capacity(&self) -> u64 {
        self.length
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let n = clipped_len(pos, buf.len(), self.length);
        if n == 0 {
            return Ok(0);
        }
        let buf = &mut buf[..n];
        self.for_each_part(pos, pos + n as u64, |part, part_start, from, count| {
            let at  = (part_start + from - pos) as usize;
            let dst = &mut buf[at..at + count as usize];
            let got = part.read(from, dst)?;
            dst[got..].fill(0);
            Ok(())
        })?;
        Ok(n)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        check_fixed_write(pos, data.len(), self.length)?;
        if data.is_empty() {
            return Ok(());
        }
        self.for_each_part(pos, pos + data.len() as u64, |part, part_start, from, count| {
            let at = (part_start + from - pos) as usize;
            part.write(from, &data[at..at + count as usize])
        })
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        if value == self.length {
            return Ok(());
        }
        Err(StreamError::Capacity { position: 0, length: value, capacity: self.length })
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        let end = range_end(start, count)?;
        let mut found = Vec::new();
        self.for_each_part(start, end, |part, part_start, from, count| {
            found.extend(part.extents(from, count)?.iter().map(|e| e.offset_by(part_start)));
            Ok(())
        })?;
        Ok(extent::normalize(&found))
    }

    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        let end = range_end(start, count)?;
        self.for_each_part(start, end, |part, _, from, count| part.clear(from, count))
    }

    fn flush(&mut self) -> Result<()> {
        for part in &mut self.parts {
            part.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        // Release every part even if an earlier one fails.
        let mut first_err = None;
        for part in &mut self.parts {
            if let Err(e) = part.release() {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
