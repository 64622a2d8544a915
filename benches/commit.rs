// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tl2mem::SharedRegion;

fn bench_solo_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("solo_commit");

    for words in [1usize, 4, 16, 64] {
        let size = words * 8;
        group.throughput(Throughput::Elements(words as u64));
        group.bench_with_input(BenchmarkId::new("words", words), &size, |b, &size| {
            let region = SharedRegion::new(size, 8).unwrap();
            let start = region.start();
            let payload = vec![0xABu8; size];

            b.iter(|| {
                let mut tx = region.begin(false);
                tx.write(black_box(payload.as_ptr()), size, start).unwrap();
                black_box(tx.commit());
            });
        });
    }

    group.finish();
}

fn bench_read_only_fast_path(c: &mut Criterion) {
    let region = SharedRegion::new(8, 8).unwrap();
    c.bench_function("read_only_commit", |b| {
        b.iter(|| {
            let tx = region.begin(true);
            black_box(tx.commit());
        });
    });
}

fn bench_read_validation(c: &mut Criterion) {
    let region = SharedRegion::new(8, 8).unwrap();
    let start = region.start();

    c.bench_function("read_then_write_commit", |b| {
        b.iter(|| {
            let mut tx = region.begin(false);
            let mut buf = [0u8; 8];
            tx.read(start, 8, buf.as_mut_ptr()).unwrap();
            tx.write(buf.as_ptr(), 8, start).unwrap();
            black_box(tx.commit());
        });
    });
}

criterion_group!(benches, bench_solo_commit, bench_read_only_fast_path, bench_read_validation);
criterion_main!(benches);
