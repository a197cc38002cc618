//! Terminal rendering. Deliberately thin: every view draws from read-only
//! state owned by the app and the telemetry core.

mod config_view;
mod connections;
mod logs;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::{App, View};
use crate::session::SessionState;

pub const COLOR_ACCENT: Color = Color::Cyan;
pub const COLOR_DIM: Color = Color::DarkGray;
pub const COLOR_ERROR: Color = Color::Red;
pub const COLOR_WARN: Color = Color::Yellow;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_tabs(frame, chunks[0], app);
    match app.view {
        View::Logs => logs::render(frame, chunks[1], app),
        View::Connections => connections::render(frame, chunks[1], app),
        View::Config => config_view::render(frame, chunks[1], app),
    }
    render_status(frame, chunks[2], app);
}

fn render_tabs(frame: &mut Frame, area: Rect, app: &App) {
    let tab = |label: &str, view: View| {
        if app.view == view {
            Span::styled(
                format!(" {} ", label),
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(format!(" {} ", label), Style::default().fg(COLOR_DIM))
        }
    };
    let line = Line::from(vec![
        tab("[1] Logs", View::Logs),
        tab("[2] Connections", View::Connections),
        tab("[3] Config", View::Config),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let (state_text, state_style) = match app.stream_state() {
        SessionState::Idle => ("idle".to_string(), Style::default().fg(COLOR_DIM)),
        SessionState::Connecting => ("connecting…".to_string(), Style::default().fg(COLOR_WARN)),
        SessionState::Streaming => ("● streaming".to_string(), Style::default().fg(Color::Green)),
        SessionState::Paused => ("❚❚ paused".to_string(), Style::default().fg(COLOR_WARN)),
        SessionState::Stopped => ("stopped".to_string(), Style::default().fg(COLOR_DIM)),
        SessionState::Failed(detail) => (
            format!("✗ failed: {} (r to retry)", detail),
            Style::default().fg(COLOR_ERROR),
        ),
    };
    let mut spans = vec![Span::styled(state_text, state_style)];
    if let Some(notice) = &app.notice {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(notice.clone(), Style::default().fg(COLOR_ERROR)));
    }
    let version = format!(
        "{}{} @ {}",
        app.version.version,
        if app.version.premium { " premium" } else { "" },
        app.client.base_url,
    );
    let right = Span::styled(version, Style::default().fg(COLOR_DIM));

    let left_width = area.width.saturating_sub(right.width() as u16);
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(left_width), Constraint::Min(0)])
        .split(area);
    frame.render_widget(Paragraph::new(Line::from(spans)), halves[0]);
    frame.render_widget(Paragraph::new(Line::from(right)), halves[1]);
}
