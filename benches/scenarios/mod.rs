//! Scenario benchmarks.
//!
//! Whole ticks through a server: graph pulls with fan-in and feedback, and
//! drains with many shreds due at once.

mod graph;
mod shreds;

pub use graph::bench_graph;
pub use shreds::bench_shreds;
