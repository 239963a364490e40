//! Benchmarks for the built-in kernels.

mod oscillator;

pub use oscillator::bench_oscillator;
