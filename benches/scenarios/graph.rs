//! Benchmarks for pulling the signal graph through a server.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion};
use tickshred::dsp::Waveform;
use tickshred::{Node, NodeRef, Server, ServerConfig};

use crate::BLOCK_SIZES;

/// `voices` oscillators summed into a stereo dac through one gain node.
fn fan_in(server: &Server, voices: usize) -> Vec<NodeRef> {
    let waveforms = [
        Waveform::Sine,
        Waveform::Saw,
        Waveform::Square,
        Waveform::Triangle,
        Waveform::Pulse,
    ];
    let master = server.gain(1, 1.0 / voices as f32);
    let mut nodes: Vec<NodeRef> = (0..voices)
        .map(|i| server.oscillator(waveforms[i % waveforms.len()]))
        .collect();
    for node in &nodes {
        server.connect(node, &master).unwrap();
    }
    server.connect(&master, server.dac()).unwrap();
    nodes.push(master);
    nodes
}

pub fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("scenarios/graph");
    let config = ServerConfig::new().sample_rate(48_000).input_channels(0);

    for &size in BLOCK_SIZES {
        let mut block = vec![0.0f32; size * 2];

        for voices in [1, 8, 32] {
            let server = Server::new(config.clone()).unwrap();
            let _nodes = fan_in(&server, voices);
            group.bench_with_input(
                BenchmarkId::new(format!("{voices}_voices"), size),
                &size,
                |b, _| b.iter(|| server.process_interleaved(None, black_box(&mut block))),
            );
        }

        // One-pole smoother built from a feedback edge: y = 0.5x + 0.5y'
        let server = Server::new(config.clone()).unwrap();
        let saw = server.oscillator(Waveform::Saw);
        let smooth = Node::from_fn(1, 1, |input, out, _| out[0] = 0.5 * input[0]);
        server.connect(&saw, &smooth).unwrap();
        server.connect(&smooth, &smooth).unwrap();
        server.connect(&smooth, server.dac()).unwrap();
        group.bench_with_input(BenchmarkId::new("feedback", size), &size, |b, _| {
            b.iter(|| server.process_interleaved(None, black_box(&mut block)))
        });
    }

    group.finish();
}
