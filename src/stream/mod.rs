//! Cursor streams and the layered read algorithm.
//!
//! # Layered read
//! For a `top` layer over an optional `parent`, a read of `[pos, pos+len)`:
//! 1. clips the range to the logical length,
//! 2. asks `top` for its allocated extents in that range,
//! 3. reads those extents from `top`,
//! 4. reads every gap from `parent`, or zero-fills it when there is none,
//! 5. leaves the bytes in range order in the caller's buffer.
//!
//! Writes are never forwarded: they always land in `top`.  A child therefore
//! shadows whatever it wrote while the parent stays pristine and shareable.
//!
//! # Stream
//! [`BufferStream`] adds a cursor to any buffer link and implements
//! `std::io::{Read, Write, Seek}`.  A read at exactly the end returns 0; a
//! read positioned strictly past the logical length is an
//! [`StreamError::InvalidRange`].

use std::io::{self, Read, Seek, SeekFrom, Write};

use crate::buffer::{clipped_len, Buffer};
use crate::error::{range_end, Result, StreamError};
use crate::extent::{self, Extent};
use crate::ownership::InnerBuffer;

// ── Layered read ─────────────────────────────────────────────────────────────

/// Read `buf.len()` bytes at `pos` from `top`, falling through to `parent`
/// for every range `top` has not allocated.  Returns the byte count, which is
/// short only when the request runs past `length`.
pub fn layered_read(
    top:    &mut dyn Buffer,
    parent: Option<&mut dyn Buffer>,
    length: u64,
    pos:    u64,
    buf:    &mut [u8],
) -> Result<usize> {
    let n = clipped_len(pos, buf.len(), length);
    if n == 0 {
        return Ok(0);
    }
    let buf = &mut buf[..n];

    let allocated = top.extents(pos, n as u64)?;
    for e in &allocated {
        fill_from(top, e, pos, buf)?;
    }

    let holes = extent::gaps(&allocated, pos, n as u64);
    match parent {
        Some(parent) => {
            for e in &holes {
                fill_from(parent, e, pos, buf)?;
            }
        }
        None => {
            for e in &holes {
                slice_of(e, pos, buf).fill(0);
            }
        }
    }
    Ok(n)
}

/// Allocated extents of a layer stack: whatever `top` holds plus whatever
/// the parent holds, clipped to `length`.
pub fn layered_extents(
    top:    &mut dyn Buffer,
    parent: Option<&mut dyn Buffer>,
    length: u64,
    start:  u64,
    count:  u64,
) -> Result<Vec<Extent>> {
    let end = range_end(start, count)?.min(length);
    if start >= end {
        return Ok(Vec::new());
    }
    let own = top.extents(start, end - start)?;
    let inherited = match parent {
        Some(parent) => parent.extents(start, end - start)?,
        None         => Vec::new(),
    };
    Ok(extent::clip(&extent::union(&own, &inherited), start, end - start))
}

fn slice_of<'a>(e: &Extent, base: u64, buf: &'a mut [u8]) -> &'a mut [u8] {
    let from = (e.start - base) as usize;
    &mut buf[from..from + e.length as usize]
}

/// Copy one extent from `source`; whatever the source cannot supply is zero.
fn fill_from(source: &mut dyn Buffer, e: &Extent, base: u64, buf: &mut [u8]) -> Result<()> {
    let dst = slice_of(e, base, buf);
    let got = source.read(e.start, dst)?;
    dst[got..].fill(0);
    Ok(())
}

// ── BufferStream ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct BufferStream {
    inner:    InnerBuffer,
    position: u64,
}

impl BufferStream {
    /// Stream that owns `buffer` and closes it on close/drop.
    pub fn new<B: Buffer + 'static>(buffer: B) -> Self {
        Self::from_inner(InnerBuffer::owned(buffer))
    }

    pub fn from_inner(inner: InnerBuffer) -> Self {
        Self { inner, position: 0 }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn set_position(&mut self, pos: u64) {
        self.position = pos;
    }

    pub fn len(&self) -> u64 {
        self.inner.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_len(&mut self, value: u64) -> Result<()> {
        self.inner.set_capacity(value)
    }

    /// Allocated extents in `[position, position + count)`.
    pub fn extents(&mut self, count: u64) -> Result<Vec<Extent>> {
        self.inner.extents(self.position, count)
    }

    pub fn extents_in(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        self.inner.extents(start, count)
    }

    /// Drop allocation for `[position, position + count)`; the cursor stays put.
    pub fn clear(&mut self, count: u64) -> Result<()> {
        self.inner.clear(self.position, count)
    }

    pub fn close(&mut self) -> Result<()> {
        self.inner.release()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_released()
    }

    pub fn inner(&self) -> &InnerBuffer {
        &self.inner
    }

    fn read_here(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.inner.is_released() {
            return Err(StreamError::Closed);
        }
        let len = self.len();
        if self.position > len {
            return Err(StreamError::invalid_range(format!(
                "read at {} is past the end of a {len}-byte stream",
                self.position
            )));
        }
        let n = self.inner.read(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }

    fn write_here(&mut self, data: &[u8]) -> Result<usize> {
        self.inner.write(self.position, data)?;
        self.position += data.len() as u64;
        Ok(data.len())
    }
}

impl Read for BufferStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_here(buf)?)
    }
}

impl Write for BufferStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_here(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.inner.flush()?)
    }
}

impl Seek for BufferStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(p)   => Some(p),
            SeekFrom::End(d)     => self.len().checked_add_signed(d),
            SeekFrom::Current(d) => self.position.checked_add_signed(d),
        };
        let target = target.ok_or_else(|| {
            StreamError::invalid_range(format!("seek {pos:?} leaves the addressable range"))
        })?;
        self.position = target;
        Ok(target)
    }
}
