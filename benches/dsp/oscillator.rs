//! Benchmarks for tick-rate oscillators.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tickshred::dsp::{Oscillator, Waveform};

use crate::BLOCK_SIZES;

pub fn bench_oscillator(c: &mut Criterion) {
    let mut group = c.benchmark_group("dsp/oscillator");

    for &size in BLOCK_SIZES {
        let mut buffer = vec![0.0f32; size];

        for (name, waveform) in [
            // Resonator: one multiply and one subtract per sample
            ("sine", Waveform::Sine),
            ("square", Waveform::Square),
            ("saw", Waveform::Saw),
            ("pulse", Waveform::Pulse),
            // Piecewise linear, two branches
            ("triangle", Waveform::Triangle),
        ] {
            let mut osc = Oscillator::new(waveform, 48_000);
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, _| {
                b.iter(|| osc.render(black_box(&mut buffer)))
            });
        }
    }

    group.finish();
}
