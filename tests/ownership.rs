use std::cell::Cell;
use std::rc::Rc;

use sparsekit::{
    share, Buffer, Extent, InnerBuffer, Ownership, Result, SnapshotBuffer, StreamError, SubBuffer,
};

/// Innermost raw resource: eight bytes that count their closes.
struct RawResource {
    bytes:  [u8; 8],
    closes: Rc<Cell<usize>>,
}

impl RawResource {
    fn new(closes: &Rc<Cell<usize>>) -> Self {
        Self { bytes: *b"rawbytes", closes: Rc::clone(closes) }
    }
}

impl Buffer for RawResource {
    fn can_read(&self) -> bool { true }
    fn can_write(&self) -> bool { false }
    fn capacity(&self) -> u64 { 8 }

    fn read(&mut self, pos: u64, buf: &mut [u8]) -> Result<usize> {
        let from = (pos as usize).min(8);
        let n = buf.len().min(8 - from);
        buf[..n].copy_from_slice(&self.bytes[from..from + n]);
        Ok(n)
    }

    fn write(&mut self, _: u64, _: &[u8]) -> Result<()> { Err(StreamError::ReadOnly) }
    fn set_capacity(&mut self, _: u64) -> Result<()> { Err(StreamError::ReadOnly) }
    fn extents(&mut self, start: u64, count: u64) -> Result<Vec<Extent>> {
        Ok(sparsekit::extent::clip(&[Extent::new(0, 8)], start, count))
    }
    fn clear(&mut self, _: u64, _: u64) -> Result<()> { Err(StreamError::ReadOnly) }

    fn close(&mut self) -> Result<()> {
        self.closes.set(self.closes.get() + 1);
        Ok(())
    }
}

#[test]
fn disposing_outermost_closes_innermost_once() {
    let closes = Rc::new(Cell::new(0));

    let middle = SubBuffer::new(InnerBuffer::owned(RawResource::new(&closes)), 0, 8).unwrap();
    let mut outer = SnapshotBuffer::new(InnerBuffer::owned(middle), 4);
    outer.write(0, b"RAW").unwrap();

    let mut out = [0u8; 8];
    outer.read(0, &mut out).unwrap();
    assert_eq!(&out, b"RAWbytes");

    outer.close().unwrap();
    assert_eq!(closes.get(), 1);
    outer.close().unwrap();
    drop(outer);
    assert_eq!(closes.get(), 1);
}

#[test]
fn dropping_outermost_without_close_still_releases_once() {
    let closes = Rc::new(Cell::new(0));
    {
        let middle = SubBuffer::new(InnerBuffer::owned(RawResource::new(&closes)), 2, 4).unwrap();
        let _outer = SnapshotBuffer::new(InnerBuffer::owned(middle), 4);
    }
    assert_eq!(closes.get(), 1);
}

#[test]
fn borrowed_middle_layer_outlives_the_outer_one() {
    let closes = Rc::new(Cell::new(0));

    let middle = share(SubBuffer::new(InnerBuffer::owned(RawResource::new(&closes)), 0, 8).unwrap());
    let link = InnerBuffer::borrowed(&middle);
    assert_eq!(link.ownership(), Ownership::Borrowed);

    let mut outer = SnapshotBuffer::new(link, 4);
    outer.close().unwrap();
    drop(outer);
    assert_eq!(closes.get(), 0);

    let mut out = [0u8; 4];
    assert_eq!(middle.borrow_mut().read(4, &mut out).unwrap(), 4);
    assert_eq!(&out, b"ytes");

    middle.borrow_mut().close().unwrap();
    assert_eq!(closes.get(), 1);
    middle.borrow_mut().close().unwrap();
    drop(middle);
    assert_eq!(closes.get(), 1);
}

#[test]
fn closed_outer_rejects_io() {
    let closes = Rc::new(Cell::new(0));
    let mut outer = SnapshotBuffer::new(InnerBuffer::owned(RawResource::new(&closes)), 4);
    outer.close().unwrap();
    assert!(matches!(outer.read(0, &mut [0u8; 2]), Err(StreamError::Closed)));
    assert!(matches!(outer.write(0, b"x"), Err(StreamError::Closed)));
}
