//! Buffer backed directly by a random-access medium (a file, a cursor, a
//! device handle).
//!
//! By default allocation is coarse: the whole capacity is reported as one
//! allocated extent.  An explicit allocation map can be attached with
//! [`MediumBuffer::with_allocation`]; reads outside it return zeros and
//! writes extend it once the medium accepted the bytes.

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::debug;

use crate::buffer::{check_fixed_write, clipped_len, Buffer};
use crate::error::{range_end, Result, StreamError};
use crate::extent::{self, Extent};

const ZERO_FILL_CHUNK: usize = 64 * 1024;

pub struct MediumBuffer<M> {
    medium:     Option<M>,
    capacity:   u64,
    growable:   bool,
    writable:   bool,
    allocation: Option<Vec<Extent>>,
}

impl<M: Read + Write + Seek> MediumBuffer<M> {
    /// Growable buffer whose capacity starts at the medium's current length.
    pub fn new(mut medium: M) -> Result<Self> {
        let capacity = medium.seek(SeekFrom::End(0))?;
        Ok(Self {
            medium: Some(medium),
            capacity,
            growable:   true,
            writable:   true,
            allocation: None,
        })
    }

    /// Fixed-capacity buffer over the medium's current length.
    pub fn fixed(medium: M) -> Result<Self> {
        let mut buf = Self::new(medium)?;
        buf.growable = false;
        Ok(buf)
    }

    /// Fixed-capacity buffer with an explicit declared length, independent
    /// of the medium's physical size.  Bytes past the physical end read as
    /// zero.
    pub fn with_length(medium: M, capacity: u64) -> Result<Self> {
        let mut buf = Self::fixed(medium)?;
        buf.capacity = capacity;
        Ok(buf)
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Track allocation explicitly instead of reporting the whole capacity.
    pub fn with_allocation(mut self, allocated: &[Extent]) -> Self {
        self.allocation = Some(extent::clip(allocated, 0, self.capacity));
        self
    }

    pub fn allocation(&self) -> Option<&[Extent]> {
        self.allocation.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.medium.is_none()
    }

    fn medium(&mut self) -> Result<&mut M> {
        self.medium.as_mut().ok_or(StreamError::Closed)
    }

    /// Fill `buf` from the medium at `pos`; bytes past the physical end are zero.
    fn read_raw(&mut self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let medium = self.medium()?;
        medium.seek(SeekFrom::Start(pos))?;
        let mut filled = 0;
        while filled < buf.len() {
            match medium.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        buf[filled..].fill(0);
        Ok(())
    }

    fn write_raw(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        let medium = self.medium()?;
        medium.seek(SeekFrom::Start(pos))?;
        medium.write_all(data)?;
        Ok(())
    }

    fn zero_fill(&mut self, start: u64, count: u64) -> Result<()> {
        let zeros = vec![0u8; ZERO_FILL_CHUNK.min(count as usize)];
        let mut done = 0u64;
        while done < count {
            let take = (count - done).min(zeros.len() as u64) as usize;
            self.write_raw(start + done, &zeros[..take])?;
            done += take as u64;
        }
        Ok(())
    }
}

impl<M: Read + Write + Seek> Buffer for MediumBuffer<M> {
    fn can_read(&self) -> bool {
        self.medium.is_some()
    }

    fn can_write(&self) -> bool {
        self.medium.is_some() && self.writable
    }

    fn capacity(&self) -> u64 {
        self.capacity
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let n = clipped_len(pos, buf.len(), self.capacity);
        if n == 0 {
            return Ok(0);
        }
        let Some(allocation) = &self.allocation else {
            self.read_raw(pos, &mut buf[..n])?;
            return Ok(n);
        };

        let present = extent::clip(allocation, pos, n as u64);
        buf[..n].fill(0);
        for e in present {
            let from = (e.start - pos) as usize;
            let to   = from + e.length as usize;
            self.read_raw(e.start, &mut buf[from..to])?;
        }
        Ok(n)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        if !self.writable {
            return Err(StreamError::ReadOnly);
        }
        if data.is_empty() {
            return Ok(());
        }
        let end = range_end(pos, data.len() as u64)?;
        if !self.growable {
            check_fixed_write(pos, data.len(), self.capacity)?;
        }

        self.write_raw(pos, data)?;

        // Only record what the medium actually accepted.
        self.capacity = self.capacity.max(end);
        if let Some(allocation) = &mut self.allocation {
            *allocation = extent::union(allocation, &[Extent::new(pos, data.len() as u64)]);
        }
        Ok(())
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        if !self.growable && value > self.capacity {
            return Err(StreamError::Capacity {
                position: 0,
                length:   value,
                capacity: self.capacity,
            });
        }
        if value < self.capacity {
            if let Some(allocation) = &mut self.allocation {
                *allocation = extent::clip(allocation, 0, value);
            } else if self.writable {
                let tail = self.capacity - value;
                debug!("zeroing {tail} bytes past new medium length {value}");
                self.zero_fill(value, tail)?;
            } else {
                return Err(StreamError::ReadOnly);
            }
        }
        self.capacity = value;
        Ok(())
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        let end = range_end(start, count)?.min(self.capacity);
        if start >= end {
            return Ok(Vec::new());
        }
        Ok(match &self.allocation {
            Some(allocation) => extent::clip(allocation, start, end - start),
            None             => vec![Extent::from_bounds(start, end)],
        })
    }

    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        if !self.writable {
            return Err(StreamError::ReadOnly);
        }
        let end = range_end(start, count)?.min(self.capacity);
        if start >= end {
            return Ok(());
        }
        if let Some(allocation) = &mut self.allocation {
            *allocation = extent::subtract(allocation, &[Extent::from_bounds(start, end)]);
            return Ok(());
        }
        self.zero_fill(start, end - start)
    }

    fn flush(&mut self) -> Result<()> {
        self.medium()?.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        match self.medium.take() {
            Some(mut medium) => {
                let flushed = if self.writable { medium.flush() } else { Ok(()) };
                drop(medium);
                flushed?;
            }
            None => debug!("medium already closed"),
        }
        Ok(())
    }
}
