use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use partmem::{layout::MIB, protection::ProtectionFlags, region::Region, store::BlockStore};

const BLOCK_SIZES: [usize; 5] = [64, 256, 1024, 4096, 16384];
const ITERATIONS: usize = 100;

fn fresh_store() -> BlockStore {
    let mut region = Region::create(16 * MIB).unwrap();
    let partition = region.add_partition("Read/Write", 16 * MIB, ProtectionFlags::READ_WRITE).unwrap();
    BlockStore::init(partition).unwrap()
}

/// Create and fill `ITERATIONS` blocks per round
fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_write");
    for size in BLOCK_SIZES {
        let pattern: Vec<u8> = (0..size).map(|i| i as u8).collect();
        group.throughput(Throughput::Bytes((size * ITERATIONS) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &pattern, |b, pattern| {
            b.iter_batched(
                fresh_store,
                |mut store| {
                    for _ in 0..ITERATIONS {
                        let id = store.create_block(pattern.len()).unwrap().id();
                        store.write(id, black_box(pattern)).unwrap();
                    }
                    store
                },
                criterion::BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_read");
    for size in BLOCK_SIZES {
        let mut store = fresh_store();
        let id = store.create_block(size).unwrap().id();
        let mut buffer = vec![0u8; size];
        group.throughput(Throughput::Bytes((size * ITERATIONS) as u64));
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| {
                for _ in 0..ITERATIONS {
                    store.read(id, black_box(&mut buffer)).unwrap();
                }
            });
        });
    }
    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_verify");
    for size in BLOCK_SIZES {
        let mut store = fresh_store();
        let id = store.create_block(size).unwrap().id();
        store.write(id, &vec![0xA5; size]).unwrap();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_function(BenchmarkId::from_parameter(size), |b| {
            b.iter(|| black_box(store.verify(id).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_write, bench_read, bench_verify);
criterion_main!(benches);
