//! Transport bar widget - shows clock position, shred counts and audio stats

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tickshred::io::converter;

use super::UiState;

/// Audio statistics for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    /// Compute audio stats from a buffer
    pub fn from_buffer(buffer: &[f32]) -> Self {
        Self {
            peak: converter::peak(buffer),
            rms: converter::rms(buffer),
        }
    }
}

/// Render the transport bar
pub fn render_transport(frame: &mut Frame, area: Rect, state: &UiState, audio_stats: &AudioStats) {
    let block = Block::default().title(" tickshred ").borders(Borders::ALL);

    // Format sample rate nicely (e.g., 48000 -> "48.0kHz")
    let sample_rate_khz = state.sample_rate as f32 / 1000.0;

    let line = Line::from(vec![
        Span::styled(
            format!(" {:>8.2}s  ", state.seconds()),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(
            format!("tick {}  ", state.now),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("shreds {} ({} queued)  ", state.live_tasks, state.pending),
            Style::default().fg(Color::Green),
        ),
        Span::styled(
            format!("lead {:.1}Hz  ", state.lead_frequency),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(
            format!("{:.1}kHz {}ch  ", sample_rate_khz, state.channels),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", audio_stats.peak, audio_stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    let paragraph = Paragraph::new(line).block(block);
    frame.render_widget(paragraph, area);
}
