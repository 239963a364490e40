//! Per-sample DSP primitives used by the built-in node kernels.
//!
//! These components are allocation-free and realtime-safe. They only know
//! about sample math; wiring them into the clocked graph is the job of
//! `graph::node`.

/// Constant gain scaling.
pub mod gain;
/// Sine resonator and piecewise oscillator shapes.
pub mod oscillator;

pub use oscillator::{Oscillator, Waveform};
