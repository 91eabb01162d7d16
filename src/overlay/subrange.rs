//! A fixed window `[base, base + length)` of a larger provider, exposed as
//! its own zero-based buffer.  Typical use is one file's data carved out of
//! a shared medium.

use crate::buffer::{check_fixed_write, clipped_len, Buffer};
use crate::error::{range_end, Result, StreamError};
use crate::extent::{self, Extent};
use crate::ownership::InnerBuffer;

#[derive(Debug)]
pub struct SubBuffer {
    inner:  InnerBuffer,
    base:   u64,
    length: u64,
}

impl SubBuffer {
    pub fn new(inner: InnerBuffer, base: u64, length: u64) -> Result<Self> {
        range_end(base, length)?;
        Ok(Self { inner, base, length })
    }

    pub fn base(&self) -> u64 {
        self.base
    }
}

impl Buffer for SubBuffer {
    fn can_read(&self) -> bool {
        self.inner.can_read()
    }

    fn can_write(&self) -> bool {
        self.inner.can_write()
    }

    fn capacity(&self) -> u64 {
        self.length
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let n = clipped_len(pos, buf.len(), self.length);
        if n == 0 {
            return Ok(0);
        }
        // The window may extend past what the inner provider holds.
        let got = self.inner.read(self.base + pos, &mut buf[..n])?;
        buf[got..n].fill(0);
        Ok(n)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        check_fixed_write(pos, data.len(), self.length)?;
        self.inner.write(self.base + pos, data)
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        if value > self.length {
            return Err(StreamError::Capacity { position: 0, length: value, capacity: self.length });
        }
        self.length = value;
        Ok(())
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        let end = range_end(start, count)?.min(self.length);
        if start >= end {
            return Ok(Vec::new());
        }
        let inner: Vec<Extent> = self.inner
            .extents(self.base + start, end - start)?
            .iter()
            .map(|e| e.rebase(self.base))
            .collect();
        Ok(extent::clip(&inner, start, end - start))
    }

    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        let end = range_end(start, count)?.min(self.length);
        if start >= end {
            return Ok(());
        }
        self.inner.clear(self.base + start, end - start)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.release()
    }
}
