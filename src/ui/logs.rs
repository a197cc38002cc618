//! Logs view: virtualized tail of the streamed log buffer.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::models::LogLevel;
use crate::viewport::{VirtualWindow, DEFAULT_OVERSCAN};

use super::{COLOR_ACCENT, COLOR_DIM};

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Debug => Color::Green,
        LogLevel::Info => Color::Blue,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Error | LogLevel::Silent => Color::Red,
    }
}

fn title(app: &App) -> String {
    if let Some(input) = &app.log_search_input {
        return format!(" Logs — search: {}▏ (↵ apply, esc cancel) ", input);
    }
    let search = match &app.log_search {
        Some(needle) => format!(" — /{}", needle),
        None => String::new(),
    };
    format!(
        " Logs — level {}{} — p pause, l level, / search, r retry ",
        app.prefs.log_level, search
    )
}

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_DIM))
        .title(Span::styled(title(app), Style::default().fg(COLOR_ACCENT)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = app.filtered_logs();
    let window = VirtualWindow::compute(
        inner.height as usize,
        1,
        app.log_scroll,
        rows.len(),
        DEFAULT_OVERSCAN,
    );

    let VirtualWindow::Rows { first, last } = window else {
        let hint = if app.log_search.is_some() && !app.logs_snapshot().is_empty() {
            "no matching logs (esc clears the search)"
        } else if app.prefs.log_streaming_paused {
            "no logs — streaming is paused (press p to resume)"
        } else {
            "no logs yet"
        };
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(hint, Style::default().fg(COLOR_DIM)))),
            inner,
        );
        return;
    };

    // Only the virtualized range is materialized into Lines, independent of
    // how large the buffer is.
    let visible_rows = inner.height as usize;
    let anchor = app.log_scroll.min(last);
    let start = anchor.saturating_sub(visible_rows.saturating_sub(1)).max(first);
    let lines: Vec<Line> = rows[start..=anchor]
        .iter()
        .map(|event| {
            let base = if event.even {
                Style::default()
            } else {
                Style::default().add_modifier(Modifier::DIM)
            };
            Line::from(vec![
                Span::styled(
                    event.time.format("%H:%M:%S ").to_string(),
                    base.fg(COLOR_DIM),
                ),
                Span::styled(
                    format!("{:<7} ", event.level),
                    base.fg(level_color(event.level)).add_modifier(Modifier::BOLD),
                ),
                Span::styled(event.payload.clone(), base),
            ])
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
