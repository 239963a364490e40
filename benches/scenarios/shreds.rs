//! Benchmarks for draining the scheduler.
//!
//! Many shreds waking on the same ticks, and a metronome broadcasting to a
//! crowd of listeners.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tickshred::shred::{task, Event, Suspension};
use tickshred::{Server, ServerConfig};

use crate::BLOCK_SIZES;

fn config() -> ServerConfig {
    ServerConfig::new().sample_rate(48_000).channels(1)
}

pub fn bench_shreds(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/shreds");

    for &size in BLOCK_SIZES {
        let mut block = vec![0.0f32; size];

        // 256 shreds, each sleeping 16 ticks: 16 wake every tick
        let server = Server::new(config()).unwrap();
        for i in 0..256u64 {
            server.spork_at(i % 16, task::from_fn(|_, _| Ok(Suspension::Timed(16))));
        }
        group.bench_with_input(BenchmarkId::new("timed_256", size), &size, |b, _| {
            b.iter(|| server.process_interleaved(None, black_box(&mut block)))
        });

        // One metronome broadcasting every 32 ticks to 128 listeners
        let server = Server::new(config()).unwrap();
        let beat = Event::new();
        for _ in 0..128 {
            let beat = beat.clone();
            server.spork(task::from_fn(move |_, _| Ok(Suspension::Await(beat.clone()))));
        }
        let metronome = beat.clone();
        server.spork(task::from_fn(move |server, _| {
            metronome.broadcast(server, ());
            Ok(Suspension::Timed(32))
        }));
        group.bench_with_input(BenchmarkId::new("broadcast_128", size), &size, |b, _| {
            b.iter(|| server.process_interleaved(None, black_box(&mut block)))
        });
    }

    group.finish();
}
