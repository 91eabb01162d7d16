//! One link of a differencing chain.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::buffer::{check_fixed_write, Buffer};
use crate::error::{Result, StreamError};
use crate::extent::Extent;
use crate::ownership::InnerBuffer;
use crate::stream::{layered_extents, layered_read};

/// A child content buffer over an optional parent.
///
/// Reads take the child's allocated bytes and fall through to the parent for
/// the rest; writes go to the child only.  The layer's length is the child's
/// declared length; a shorter parent reads as zero past its end.
#[derive(Debug)]
pub struct DiffLayer {
    content:  InnerBuffer,
    parent:   Option<InnerBuffer>,
    length:   u64,
    identity: Option<Uuid>,
    path:     Option<PathBuf>,
}

impl DiffLayer {
    pub fn new(content: InnerBuffer, parent: Option<InnerBuffer>) -> Self {
        let length = content.capacity();
        Self { content, parent, length, identity: None, path: None }
    }

    pub fn with_origin(mut self, identity: Uuid, path: impl Into<PathBuf>) -> Self {
        self.identity = Some(identity);
        self.path     = Some(path.into());
        self
    }

    pub fn identity(&self) -> Option<Uuid> {
        self.identity
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }

    /// Extents held by this layer alone, ignoring the parent.
    pub fn own_extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        self.content.extents(start, count)
    }
}

impl Buffer for DiffLayer {
    fn can_read(&self) -> bool {
        self.content.can_read()
    }

    fn can_write(&self) -> bool {
        self.content.can_write()
    }

    fn capacity(&self) -> u64 {
        self.length
    }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        if self.content.is_released() {
            return Err(StreamError::Closed);
        }
        let length = self.length;
        let parent = self.parent.as_mut().map(|p| p as &mut dyn Buffer);
        layered_read(&mut self.content, parent, length, pos, buf)
    }

    fn write(&mut self, pos: u64, data: &[u8]) -> Result<()> {
        check_fixed_write(pos, data.len(), self.length)?;
        self.content.write(pos, data)
    }

    fn set_capacity(&mut self, value: u64) -> Result<()> {
        self.content.set_capacity(value)?;
        self.length = value;
        Ok(())
    }

    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        let length = self.length;
        let parent = self.parent.as_mut().map(|p| p as &mut dyn Buffer);
        layered_extents(&mut self.content, parent, length, start, count)
    }

    /// Drops this layer's own data in the range; the parent shows through.
    fn clear(&mut self, start: u64, count: u64) -> Result<()> {
        self.content.clear(start, count)
    }

    fn flush(&mut self) -> Result<()> {
        self.content.flush()
    }

    fn close(&mut self) -> Result<()> {
        let own = self.content.release();
        let inherited = match &mut self.parent {
            Some(parent) => parent.release(),
            None         => Ok(()),
        };
        own.and(inherited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SparseMemoryBuffer;
    use crate::config::CapacityMode;

    #[test]
    fn child_shadows_parent_without_touching_it() {
        let mut parent = SparseMemoryBuffer::new(4);
        parent.write(0, b"parentparent").unwrap();
        let parent = crate::ownership::share(parent);

        let child = SparseMemoryBuffer::with_capacity(4, CapacityMode::Fixed(12));
        let mut layer = DiffLayer::new(
            InnerBuffer::owned(child),
            Some(InnerBuffer::borrowed(&parent)),
        );
        layer.write(4, b"CHLD").unwrap();

        let mut out = [0u8; 12];
        layer.read(0, &mut out).unwrap();
        assert_eq!(&out, b"pareCHLDrent");
        assert_eq!(layer.own_extents(0, 12).unwrap(), vec![Extent::new(4, 4)]);
        assert_eq!(layer.extents(0, 12).unwrap(), vec![Extent::new(0, 12)]);

        parent.borrow_mut().read(0, &mut out).unwrap();
        assert_eq!(&out, b"parentparent");
    }

    #[test]
    fn partial_clear_lets_parent_show_through() {
        let mut parent = SparseMemoryBuffer::new(4);
        parent.write(0, b"PPPPPPPP").unwrap();

        let child = SparseMemoryBuffer::with_capacity(4, CapacityMode::Fixed(8));
        let mut layer = DiffLayer::new(InnerBuffer::owned(child), Some(InnerBuffer::owned(parent)));
        layer.write(0, b"CCCC").unwrap();
        layer.clear(0, 2).unwrap();

        let mut out = [0u8; 8];
        layer.read(0, &mut out).unwrap();
        assert_eq!(&out, b"PPCCPPPP");
        assert_eq!(layer.own_extents(0, 8).unwrap(), vec![Extent::new(2, 2)]);
    }

    #[test]
    fn write_past_layer_length_fails() {
        let child = SparseMemoryBuffer::with_capacity(4, CapacityMode::Fixed(8));
        let mut layer = DiffLayer::new(InnerBuffer::owned(child), None);
        assert!(matches!(layer.write(6, b"abc"), Err(StreamError::Capacity { .. })));
    }
}
