//! Ownership links between composed layers.
//!
//! Layers never hold another provider directly; they hold an [`InnerBuffer`]
//! link that pairs a shared handle with an [`Ownership`] flag.  Releasing a
//! link closes the inner provider only when the link owns it, and a link is
//! released at most once: explicitly through `release()`/`close()`, or
//! implicitly on drop.
//!
//! The handle is an `Rc<RefCell<dyn Buffer>>`.  Composition is
//! single-threaded and non-reentrant, so a borrow conflict means two layers
//! of one chain resolve to the same provider, which chain construction
//! rejects up front.

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use log::{debug, warn};

use crate::buffer::Buffer;
use crate::error::{Result, StreamError};
use crate::extent::Extent;

pub type SharedBuffer = Rc<RefCell<dyn Buffer>>;

/// Wrap a provider in a shareable handle.
pub fn share<B: Buffer + 'static>(buffer: B) -> SharedBuffer {
    Rc::new(RefCell::new(buffer))
}

/// Whether releasing a link also closes what it points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// The link closes the inner provider when released.
    Dispose,
    /// The caller keeps responsibility for the inner provider.
    Borrowed,
}

pub struct InnerBuffer {
    buffer:    SharedBuffer,
    ownership: Ownership,
    released:  bool,
}

impl InnerBuffer {
    pub fn new(buffer: SharedBuffer, ownership: Ownership) -> Self {
        Self { buffer, ownership, released: false }
    }

    /// Take sole ownership of a freshly built provider.
    pub fn owned<B: Buffer + 'static>(buffer: B) -> Self {
        Self::new(share(buffer), Ownership::Dispose)
    }

    /// Refer to a provider whose lifetime stays with the caller.
    pub fn borrowed(buffer: &SharedBuffer) -> Self {
        Self::new(Rc::clone(buffer), Ownership::Borrowed)
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn shared(&self) -> &SharedBuffer {
        &self.buffer
    }

    fn get(&self) -> Result<RefMut<'_, dyn Buffer>> {
        if self.released {
            return Err(StreamError::Closed);
        }
        Ok(self.buffer.borrow_mut())
    }

    /// Detach from the inner provider, closing it if this link owns it.
    /// A second call is a no-op.
    pub fn release(&mut self) -> Result<()> {
        if self.released {
            debug!("ignoring repeated release of {:?} link", self.ownership);
            return Ok(());
        }
        self.released = true;
        match self.ownership {
            Ownership::Dispose  => self.buffer.borrow_mut().close(),
            Ownership::Borrowed => Ok(()),
        }
    }
}

impl Drop for InnerBuffer {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("closing inner buffer on drop failed: {e}");
        }
    }
}

impl fmt::Debug for InnerBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerBuffer")
            .field("ownership", &self.ownership)
            .field("released", &self.released)
            .finish()
    }
}

impl Buffer for InnerBuffer {
    fn can_read(&self) -> bool {
        !self.released && self.buffer.borrow().can_read()
    }

    fn can_write(&self) -> bool {
        !self.released && self.buffer.borrow().can_write()
    }

    fn capacity(&self) -> u64 {
        if self.released {
            0
        } else {
            self.buffer.borrow().capacity()
        }
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        self.get()?.read(pos, buf)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        self.get()?.write(pos, data)
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        self.get()?.set_capacity(value)
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        self.get()?.extents(start, count)
    }

    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        self.get()?.clear(start, count)
    }

    fn flush(&mut self) -> Result<()> {
        self.get()?.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.release()
    }
}
