//! The audio entry points must not touch the heap once the graph is built.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use tickshred::dsp::Waveform;
use tickshred::io::{AudioInput, AudioOutput};
use tickshred::{Server, ServerConfig};

struct Counting;

thread_local! {
    static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
}

unsafe impl GlobalAlloc for Counting {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let _ = ALLOCATIONS.try_with(|n| n.set(n.get() + 1));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

/// Heap allocations made by `f` on this thread.
fn allocations(f: impl FnOnce()) -> usize {
    let before = ALLOCATIONS.with(Cell::get);
    f();
    ALLOCATIONS.with(Cell::get) - before
}

fn patched_server() -> (Server, Vec<tickshred::NodeRef>) {
    let server = Server::new(ServerConfig::new().sample_rate(48_000).channels(2)).unwrap();
    let osc = server.oscillator(Waveform::Saw);
    let level = server.gain(1, 0.5);
    server.connect(&osc, &level).unwrap();
    server.connect(&level, server.dac()).unwrap();
    (server, vec![osc, level])
}

#[test]
fn process_block_does_not_allocate() {
    let (server, _graph) = patched_server();
    let input = AudioInput::new(2, 256);
    let mut output = AudioOutput::new(2, 256);

    server.process_block(&input, &mut output);
    let count = allocations(|| server.process_block(&input, &mut output));
    assert_eq!(count, 0);
    assert_eq!(server.now(), 512);
}

#[test]
fn process_interleaved_does_not_allocate() {
    let (server, _graph) = patched_server();
    let input = vec![0.0f32; 512];
    let mut output = vec![0.0f32; 512];

    server.process_interleaved(Some(&input), &mut output);
    let count = allocations(|| {
        server.process_interleaved(Some(&input), &mut output);
    });
    assert_eq!(count, 0);
    assert!(output.iter().any(|&s| s != 0.0));
}
