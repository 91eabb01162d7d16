//! The buffer capability contract.
//!
//! A [`Buffer`] is random-access byte storage with a declared capacity that
//! can also say which parts of a range actually hold data.  Every provider in
//! the crate (memory, medium, zero fill, concatenation, sub-range, snapshot,
//! differencing layer) implements it, and format readers implement it for
//! their own on-disk layouts.
//!
//! # Contract
//! - `read` never returns bytes past `capacity()`; a request that runs past
//!   the end returns the in-bounds count (possibly 0), never an error.
//! - `write` on a growable buffer extends capacity; on a fixed buffer a write
//!   past capacity fails with [`StreamError::Capacity`] and changes nothing.
//! - `extents` returns a normalized, conservative subset: never an extent
//!   that was not written or backed, never anything outside the query range.
//! - `clear` drops allocation for a range; later reads there return zero.
//! - `close` releases held resources and is idempotent.
//!
//! [`StreamError::Capacity`]: crate::error::StreamError::Capacity

pub mod medium;
pub mod sparse;

pub use medium::MediumBuffer;
pub use sparse::SparseMemoryBuffer;

use crate::error::{range_end, Result, StreamError};
use crate::extent::Extent;

pub trait Buffer {
    fn can_read(&self) -> bool;
    fn can_write(&self) -> bool;

    /// Declared logical length in bytes.
    fn capacity(&self) -> u64;

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize>;
    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()>;
    fn set_capacity(&mut self, value: u64) -> Result<()>;

    /// Allocated sub-ranges of `[start, start + count)`.
    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>>;

    fn clear(&mut self, start: u64, count: u64) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Number of bytes of a `len`-byte access at `pos` that fall inside
/// `capacity`.  Reads use this to clip instead of failing.
#[inline]
pub(crate) fn clipped_len(pos: u64, len: usize, capacity: u64) -> usize {
    if pos >= capacity {
        0
    } else {
        (capacity - pos).min(len as u64) as usize
    }
}

/// Reject a write that does not fit into a fixed capacity.
pub(crate) fn check_fixed_write(pos: u64, len: usize, capacity: u64) -> Result<()> {
    let end = range_end(pos, len as u64)?;
    if end > capacity {
        return Err(StreamError::Capacity { position: pos, length: len as u64, capacity });
    }
    Ok(())
}

impl<B: Buffer + ?Sized> Buffer for Box<B> {
    fn can_read(&self) -> bool {
        (**self).can_read()
    }

    fn can_write(&self) -> bool {
        (**self).can_write()
    }

    fn capacity(&self) -> u64 {
        (**self).capacity()
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read(pos, buf)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        (**self).write(pos, data)
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        (**self).set_capacity(value)
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        (**self).extents(start, count)
    }

    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        (**self).clear(start, count)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}
