use std::io::{Read, Seek, SeekFrom, Write};

use proptest::prelude::*;
use sparsekit::{
    share, Buffer, BufferStream, CapacityMode, ConcatBuffer, Extent, InnerBuffer, MediumBuffer,
    SnapshotBuffer, SparseMemoryBuffer, StreamConfig, SubBuffer, ZeroBuffer,
};

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn memory_with(data: &[u8]) -> SparseMemoryBuffer {
    let mut buf = SparseMemoryBuffer::new(32);
    buf.write(0, data).unwrap();
    buf
}

// ── Chunked allocation accounting ────────────────────────────────────────────

#[test]
fn chunk_accounting_follows_writes_and_clears() {
    let mut buf = SparseMemoryBuffer::new(10);
    buf.write(0, &[1u8; 20]).unwrap();
    assert_eq!(buf.allocated_chunks(), 2);
    buf.clear(0, 20).unwrap();
    assert_eq!(buf.allocated_chunks(), 0);

    buf.write(0, &[1u8; 15]).unwrap();
    buf.clear(0, 15).unwrap();
    assert_eq!(buf.allocated_chunks(), 1);
    assert!(buf.extents(0, 20).unwrap().is_empty());
}

// ── Concatenation ────────────────────────────────────────────────────────────

#[test]
fn concatenation_skips_zero_length_part() {
    let first  = memory_with(&[0xAA; 100]);
    let middle = SparseMemoryBuffer::with_capacity(8, CapacityMode::Fixed(0));
    let third  = memory_with(&pattern(250));

    let mut cat = ConcatBuffer::new(vec![
        InnerBuffer::owned(first),
        InnerBuffer::owned(middle),
        InnerBuffer::owned(third),
    ])
    .unwrap();
    assert_eq!(cat.capacity(), 350);

    let mut out = [0u8; 10];
    assert_eq!(cat.read(95, &mut out).unwrap(), 10);
    assert_eq!(&out[..5], &[0xAA; 5]);
    assert_eq!(&out[5..], &pattern(5)[..]);
}

#[test]
fn concatenated_file_windows_read_as_one_stream() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(b"xxHELLOyyyyWORLDzz").unwrap();
    tmp.flush().unwrap();

    let window = |base, len| {
        let file = tmp.reopen().unwrap();
        let medium = MediumBuffer::fixed(file).unwrap().read_only();
        InnerBuffer::owned(SubBuffer::new(InnerBuffer::owned(medium), base, len).unwrap())
    };
    let cat = ConcatBuffer::new(vec![window(2, 5), window(11, 5)]).unwrap();

    let mut stream = BufferStream::new(cat);
    let mut text = String::new();
    stream.read_to_string(&mut text).unwrap();
    assert_eq!(text, "HELLOWORLD");
}

// ── Snapshot isolation ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn snapshot_writes_never_reach_the_base(
        writes in prop::collection::vec((0u64..600, prop::collection::vec(any::<u8>(), 1..64)), 1..12),
    ) {
        let original = pattern(512);
        let base = share(memory_with(&original));
        let mut snap = SnapshotBuffer::new(InnerBuffer::borrowed(&base), 16);

        let mut expected = original.clone();
        for (pos, data) in &writes {
            snap.write(*pos, data).unwrap();
            let end = *pos as usize + data.len();
            if expected.len() < end {
                expected.resize(end, 0);
            }
            expected[*pos as usize..end].copy_from_slice(data);
        }

        let mut seen = vec![0u8; expected.len()];
        prop_assert_eq!(snap.read(0, &mut seen).unwrap(), expected.len());
        prop_assert_eq!(&seen, &expected);

        drop(snap);
        let mut after = vec![0u8; original.len()];
        base.borrow_mut().read(0, &mut after).unwrap();
        prop_assert_eq!(after, original);
        prop_assert_eq!(base.borrow().capacity(), 512);
    }
}

#[test]
fn snapshot_reset_restores_base_view() {
    let base = share(memory_with(b"0123456789"));
    let cfg = StreamConfig { snapshot_chunk_size: 4, ..StreamConfig::default() };
    let mut snap = SnapshotBuffer::from_config(InnerBuffer::borrowed(&base), &cfg);

    snap.write(3, b"abc").unwrap();
    assert!(snap.is_dirty());
    assert_eq!(snap.dirty_extents().unwrap(), vec![Extent::new(0, 8)]);

    snap.clear(0, 4).unwrap();
    let mut out = [0u8; 10];
    snap.read(0, &mut out).unwrap();
    assert_eq!(&out, b"0123bc6789");

    snap.reset();
    snap.read(0, &mut out).unwrap();
    assert_eq!(&out, b"0123456789");
}

#[test]
fn snapshot_over_file_commits_on_request() {
    let mut tmp = tempfile::NamedTempFile::new().unwrap();
    tmp.write_all(&[b'.'; 64]).unwrap();
    tmp.flush().unwrap();

    let medium = MediumBuffer::fixed(tmp.reopen().unwrap()).unwrap();
    let mut snap = SnapshotBuffer::new(InnerBuffer::owned(medium), 16);
    snap.write(20, b"patch").unwrap();

    let mut on_disk = Vec::new();
    tmp.reopen().unwrap().read_to_end(&mut on_disk).unwrap();
    assert_eq!(on_disk, vec![b'.'; 64]);

    snap.commit().unwrap();
    on_disk.clear();
    tmp.reopen().unwrap().read_to_end(&mut on_disk).unwrap();
    assert_eq!(&on_disk[20..25], b"patch");
    assert_eq!(on_disk.len(), 64);
}

// ── Stream over layers ───────────────────────────────────────────────────────

#[test]
fn stream_over_zero_fill_reads_zeros_to_eof() {
    let mut stream = BufferStream::new(ZeroBuffer::new(10));
    let mut all = Vec::new();
    stream.read_to_end(&mut all).unwrap();
    assert_eq!(all, vec![0u8; 10]);
    assert!(stream.extents_in(0, 10).unwrap().is_empty());
    assert!(stream.write(b"x").is_err());
}

#[test]
fn stream_seek_from_end_and_extents_at_cursor() {
    let mut stream = BufferStream::new(SparseMemoryBuffer::new(8));
    stream.seek(SeekFrom::Start(32)).unwrap();
    stream.write_all(b"tail").unwrap();
    assert_eq!(stream.len(), 36);

    stream.seek(SeekFrom::End(-4)).unwrap();
    assert_eq!(stream.position(), 32);
    assert_eq!(stream.extents(4).unwrap(), vec![Extent::new(32, 4)]);

    stream.set_position(0);
    assert!(stream.extents(32).unwrap().is_empty());
}
