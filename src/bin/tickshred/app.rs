//! Player - runs the server on an engine thread and plays it through cpal
//!
//! ```text
//! engine thread                         cpal callback
//!   Server::process_interleaved  --rtrb-->  pop samples (silence on underrun)
//!        ^    |
//!        |    '--rtrb--> scope + UiState --> UI thread
//!        '------------- Remote commands <------'
//! ```
//!
//! The server is `!Send`, so it is built on the engine thread and never
//! leaves it. The callback only pops from a ring buffer.

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Producer, RingBuffer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tickshred::engine::command::{self, Inbox};
use tickshred::{Server, ServerConfig};
use tracing::{error, info};

use super::patch::Patch;
use super::ui::{UiApp, UiState, VIS_BUFFER_SIZE};

/// Frames rendered per engine iteration
const BLOCK_FRAMES: usize = 256;
/// Output ring length
const LATENCY_SECONDS: f64 = 0.1;

/// Builder for a playback session
pub struct Player {
    seconds: Option<f64>,
    command_capacity: usize,
}

impl Player {
    pub fn new() -> Self {
        Self {
            seconds: None,
            command_capacity: ServerConfig::default().command_capacity,
        }
    }

    /// Stop after this long; `None` plays until the UI quits
    pub fn seconds(mut self, seconds: Option<f64>) -> Self {
        self.seconds = seconds;
        self
    }

    /// Slots in the UI -> engine command queue
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    /// Run the application (takes over the terminal, plays audio)
    pub fn run(self) -> EyreResult<()> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| eyre!("no default output device available"))?;
        let supported = device
            .default_output_config()
            .wrap_err("failed to fetch default output config")?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config = ServerConfig::new()
            .sample_rate(sample_rate)
            .input_channels(0)
            .output_channels(channels)
            .command_capacity(self.command_capacity);
        info!(device = ?device.name().ok(), sample_rate, channels, "output device");
        config.validate().wrap_err("invalid server configuration")?;

        let ring_len = (f64::from(sample_rate) * LATENCY_SECONDS) as usize * channels;
        let (audio_tx, mut audio_rx) = RingBuffer::<f32>::new(ring_len.max(BLOCK_FRAMES * channels));
        let (scope_tx, scope_rx) = RingBuffer::<f32>::new(VIS_BUFFER_SIZE * 4);
        let (state_tx, state_rx) = RingBuffer::<UiState>::new(64);
        let (remote, inbox) = command::channel(config.command_capacity);
        let running = Arc::new(AtomicBool::new(true));

        let engine = Engine {
            config,
            limit: self.seconds,
            audio_tx,
            scope_tx,
            state_tx,
            running: Arc::clone(&running),
        };
        let engine = thread::Builder::new()
            .name("tickshred-engine".into())
            .spawn(move || engine.run(inbox))
            .wrap_err("failed to spawn engine thread")?;

        let stream = device.build_output_stream(
            &supported.into(),
            move |data: &mut [f32], _| {
                for sample in data.iter_mut() {
                    *sample = audio_rx.pop().unwrap_or(0.0);
                }
            },
            |err| error!("audio stream error: {err}"),
            None,
        )?;
        stream.play()?;

        let mut ui = UiApp::new(
            scope_rx,
            state_rx,
            remote,
            Arc::clone(&running),
            UiState::new(sample_rate, channels),
        );
        let mut terminal = ratatui::init();
        let result = ui.run(&mut terminal);
        ratatui::restore();

        running.store(false, Ordering::Relaxed);
        drop(stream);
        engine
            .join()
            .map_err(|_| eyre!("engine thread panicked"))??;
        result
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything the engine thread needs, all of it `Send`
struct Engine {
    config: ServerConfig,
    limit: Option<f64>,
    audio_tx: Producer<f32>,
    scope_tx: Producer<f32>,
    state_tx: Producer<UiState>,
    running: Arc<AtomicBool>,
}

impl Engine {
    fn run(mut self, inbox: Inbox) -> EyreResult<()> {
        let result = self.play(inbox);
        self.running.store(false, Ordering::Relaxed);
        result
    }

    fn play(&mut self, inbox: Inbox) -> EyreResult<()> {
        let channels = self.config.output_channels;
        let server = Server::new(self.config.clone()).wrap_err("invalid server configuration")?;
        server.attach(inbox);
        let patch = Patch::build(&server)?;
        let end = self.limit.map(|seconds| server.seconds(seconds));

        let mut block = vec![0.0f32; BLOCK_FRAMES * channels];
        while self.running.load(Ordering::Relaxed) {
            if end.is_some_and(|end| server.now() >= end) {
                break;
            }
            if self.audio_tx.slots() < block.len() {
                thread::sleep(Duration::from_millis(1));
                continue;
            }

            server.process_interleaved(None, &mut block);
            for &sample in &block {
                // Cannot fail: slots were checked above.
                let _ = self.audio_tx.push(sample);
            }
            for frame in block.chunks_exact(channels) {
                let mono = frame.iter().sum::<f32>() / channels as f32;
                if self.scope_tx.push(mono).is_err() {
                    break;
                }
            }
            let _ = self.state_tx.push(snapshot(&server, &patch, channels));
        }

        info!(seconds = server.now() as f64 / f64::from(server.sample_rate()), "engine stopped");
        server.stop();
        Ok(())
    }
}

fn snapshot(server: &Server, patch: &Patch, channels: usize) -> UiState {
    UiState {
        now: server.now(),
        sample_rate: server.sample_rate(),
        channels,
        live_tasks: server.live_tasks().len(),
        pending: server.pending(),
        beat_waiters: patch.beat.len(),
        lead_frequency: patch.lead_frequency(),
        melody: patch.melody.state(),
        pulse: patch.pulse.state(),
        stats: server.stats(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_command_capacity() {
        let player = Player::new().seconds(Some(2.0)).command_capacity(64);
        assert_eq!(player.command_capacity, 64);
        assert_eq!(player.seconds, Some(2.0));
        assert_eq!(
            Player::default().command_capacity,
            ServerConfig::default().command_capacity
        );
    }
}
