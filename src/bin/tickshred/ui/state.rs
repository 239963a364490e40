//! Shared state types for UI communication
//!
//! Sent from the engine thread once per rendered block, so everything here
//! is `Copy` and allocation-free.

use tickshred::engine::ServerStats;
use tickshred::shred::TaskState;
use tickshred::Tick;

/// Snapshot of the server after a block
#[derive(Clone, Copy, Debug)]
pub struct UiState {
    /// Ticks processed so far
    pub now: Tick,
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Output channels
    pub channels: usize,
    /// Shreds that have not terminated
    pub live_tasks: usize,
    /// Entries in the run queue
    pub pending: usize,
    /// Shreds parked on the beat event
    pub beat_waiters: usize,
    /// Current lead oscillator frequency
    pub lead_frequency: f32,
    pub melody: TaskState,
    pub pulse: TaskState,
    pub stats: ServerStats,
}

impl UiState {
    pub fn new(sample_rate: u32, channels: usize) -> Self {
        Self {
            now: 0,
            sample_rate,
            channels,
            live_tasks: 0,
            pending: 0,
            beat_waiters: 0,
            lead_frequency: 0.0,
            melody: TaskState::Runnable,
            pulse: TaskState::Runnable,
            stats: ServerStats::default(),
        }
    }

    pub fn seconds(&self) -> f64 {
        tickshred::time::to_seconds(self.sample_rate, self.now)
    }
}
