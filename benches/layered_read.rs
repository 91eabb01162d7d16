use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sparsekit::extent::{self, Extent};
use sparsekit::{share, Buffer, DiffLayer, InnerBuffer, SnapshotBuffer, SparseMemoryBuffer, ZeroBuffer};

const MIB: u64 = 1024 * 1024;

/// Every other 4 KiB block allocated.
fn checkerboard(chunk_size: u64, len: u64) -> SparseMemoryBuffer {
    let mut buf = SparseMemoryBuffer::new(chunk_size);
    let block = vec![0x5Au8; 4096];
    let mut pos = 0;
    while pos < len {
        buf.write(pos, &block).unwrap();
        pos += 8192;
    }
    buf.set_capacity(len).unwrap();
    buf
}

fn bench_layered_read(c: &mut Criterion) {
    let mut out = vec![0u8; MIB as usize];

    c.bench_function("diff_layer_read_1mb_checkerboard", |b| {
        let base = InnerBuffer::owned(ZeroBuffer::new(MIB));
        let mut layer = DiffLayer::new(InnerBuffer::owned(checkerboard(4096, MIB)), Some(base));
        b.iter(|| layer.read(0, black_box(&mut out)).unwrap())
    });

    c.bench_function("snapshot_read_1mb_after_scattered_writes", |b| {
        let base = share(checkerboard(64 * 1024, MIB));
        let mut snap = SnapshotBuffer::new(InnerBuffer::borrowed(&base), 4096);
        for i in 0..64 {
            snap.write(i * 16_384 + 100, b"scattered").unwrap();
        }
        b.iter(|| snap.read(0, black_box(&mut out)).unwrap())
    });
}

fn bench_extent_algebra(c: &mut Criterion) {
    let a: Vec<Extent> = (0..10_000).map(|i| Extent::new(i * 10, 6)).collect();
    let b: Vec<Extent> = (0..10_000).map(|i| Extent::new(i * 10 + 3, 5)).collect();

    c.bench_function("extent_union_10k", |bench| {
        bench.iter(|| extent::union(black_box(&a), black_box(&b)))
    });
    c.bench_function("extent_subtract_10k", |bench| {
        bench.iter(|| extent::subtract(black_box(&a), black_box(&b)))
    });
}

criterion_group!(benches, bench_layered_read, bench_extent_algebra);
criterion_main!(benches);
