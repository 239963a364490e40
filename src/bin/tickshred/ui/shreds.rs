//! Shred panel - scheduler state and counters

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use tickshred::shred::TaskState;

use super::UiState;

fn state_span(name: &str, state: TaskState) -> Span<'static> {
    let color = match state {
        TaskState::Running | TaskState::Runnable => Color::Green,
        TaskState::Sleeping => Color::Cyan,
        TaskState::Waiting => Color::Yellow,
        TaskState::Terminated => Color::Red,
    };
    Span::styled(format!(" {name}: {state:?}  "), Style::default().fg(color))
}

pub fn render_shreds(frame: &mut Frame, area: Rect, state: &UiState) {
    let block = Block::default().title(" Shreds ").borders(Borders::ALL);
    let stats = &state.stats;

    let lines = vec![
        Line::from(vec![
            state_span("melody", state.melody),
            state_span("pulse", state.pulse),
            Span::styled(
                format!(" waiting on beat: {}", state.beat_waiters),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(Span::styled(
            format!(
                " sporked {}  resumes {}  faults {}  deferred ticks {}",
                stats.sporked, stats.resumes, stats.faults, stats.deferred
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
