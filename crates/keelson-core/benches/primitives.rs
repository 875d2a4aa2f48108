//! Microbenchmarks for the hot-path primitives.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::time::Duration;

use keelson_core::{Buffer, HeapTimer};

fn bench_buffer(c: &mut Criterion) {
    let payload = vec![0xabu8; 512];

    c.bench_function("buffer_append_drain_512", |b| {
        let mut buf = Buffer::with_capacity(4096);
        b.iter(|| {
            buf.append(black_box(&payload));
            black_box(buf.drain_to_vec());
        })
    });

    c.bench_function("buffer_compaction_cycle", |b| {
        let mut buf = Buffer::with_capacity(1024);
        b.iter(|| {
            buf.append(black_box(&payload));
            buf.consume(512).unwrap();
            // Forces the compact path, never the grow path.
            buf.ensure_writable(768);
        })
    });
}

fn bench_timer(c: &mut Criterion) {
    c.bench_function("timer_schedule_cancel_1k", |b| {
        let mut timer = HeapTimer::with_capacity(1024);
        b.iter(|| {
            for id in 0..1000u64 {
                timer.schedule(id, Duration::from_secs(3600), || {});
            }
            for id in 0..1000u64 {
                timer.cancel(black_box(id));
            }
        })
    });

    c.bench_function("timer_reschedule", |b| {
        let mut timer = HeapTimer::with_capacity(1024);
        for id in 0..1000u64 {
            timer.schedule(id, Duration::from_secs(3600), || {});
        }
        let mut id = 0u64;
        b.iter(|| {
            id = (id + 1) % 1000;
            timer.reschedule(black_box(id), Duration::from_secs(1800)).unwrap();
        })
    });
}

criterion_group!(benches, bench_buffer, bench_timer);
criterion_main!(benches);
