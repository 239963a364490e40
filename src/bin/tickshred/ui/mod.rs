//! TUI module for tickshred
//!
//! Shows the clock, the demo shreds and the output signal while the engine
//! thread plays. Keys go back to the server as remote commands.

pub mod state;
mod shreds;
mod spectrum;
mod transport;
mod waveform;

use color_eyre::eyre::Result as EyreResult;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    DefaultTerminal, Frame,
};
use rtrb::Consumer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickshred::engine::command::Remote;

pub use state::UiState;

use shreds::render_shreds;
use spectrum::{render_spectrum, SpectrumAnalyzer};
use transport::{render_transport, AudioStats};
use waveform::render_waveform;

use super::patch;

/// Scope buffer size, also the FFT length
pub const VIS_BUFFER_SIZE: usize = 1024;

pub struct UiApp {
    /// Mono mixdown of the rendered output
    scope_rx: Consumer<f32>,
    /// Latest engine snapshots
    state_rx: Consumer<UiState>,
    /// Commands into the server
    remote: Remote,
    /// Cleared by either side to stop playback
    running: Arc<AtomicBool>,
    current_state: UiState,
    audio_buffer: Vec<f32>,
    analyzer: SpectrumAnalyzer,
    status: &'static str,
}

impl UiApp {
    pub fn new(
        scope_rx: Consumer<f32>,
        state_rx: Consumer<UiState>,
        remote: Remote,
        running: Arc<AtomicBool>,
        initial_state: UiState,
    ) -> Self {
        Self {
            scope_rx,
            state_rx,
            remote,
            running,
            analyzer: SpectrumAnalyzer::new(VIS_BUFFER_SIZE, initial_state.sample_rate),
            current_state: initial_state,
            audio_buffer: vec![0.0; VIS_BUFFER_SIZE],
            status: "",
        }
    }

    /// Run until [Q] or until the engine stops
    pub fn run(&mut self, terminal: &mut DefaultTerminal) -> EyreResult<()> {
        while self.running.load(Ordering::Relaxed) {
            self.poll_audio();
            self.poll_state();

            terminal.draw(|frame| self.render(frame))?;

            // ~60fps
            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }
        }
        Ok(())
    }

    fn poll_audio(&mut self) {
        let before = self.audio_buffer.len();
        while let Ok(sample) = self.scope_rx.pop() {
            self.audio_buffer.push(sample);
        }
        if self.audio_buffer.len() > before {
            let excess = self.audio_buffer.len().saturating_sub(VIS_BUFFER_SIZE);
            self.audio_buffer.drain(..excess);
            self.analyzer.update(&self.audio_buffer);
        }
    }

    fn poll_state(&mut self) {
        while let Ok(state) = self.state_rx.pop() {
            self.current_state = state;
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => {
                self.running.store(false, Ordering::Relaxed);
            }
            KeyCode::Char('b') | KeyCode::Char('B') => {
                let sent = self.remote.send(|server| {
                    patch::burst(server);
                });
                self.status = match sent {
                    Ok(()) => "burst",
                    Err(_) => "command queue full",
                };
            }
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),  // Transport bar
                Constraint::Length(4),  // Shreds
                Constraint::Min(8),     // Scope
                Constraint::Length(10), // Spectrum
                Constraint::Length(1),  // Help bar
            ])
            .split(frame.area());

        let stats = AudioStats::from_buffer(&self.audio_buffer);
        render_transport(frame, chunks[0], &self.current_state, &stats);
        render_shreds(frame, chunks[1], &self.current_state);
        render_waveform(frame, chunks[2], &self.audio_buffer, stats.peak);
        render_spectrum(frame, chunks[3], self.analyzer.data());

        let help = Paragraph::new(format!(" [Q] Quit  [B] Burst  {}", self.status))
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(help, chunks[4]);
    }
}
