//! Connections view: sortable table over the latest snapshot.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::fmt::pretty_bytes;
use crate::table::SortDirection;
use crate::viewport::{VirtualWindow, DEFAULT_OVERSCAN};

use super::{COLOR_ACCENT, COLOR_DIM};

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let title = format!(
        " Connections ({}) — ↓ {} ↑ {} — ←/→ column, s sort ",
        app.connections.connections.len(),
        pretty_bytes(app.connections.download_total),
        pretty_bytes(app.connections.upload_total),
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_DIM))
        .title(Span::styled(title, Style::default().fg(COLOR_ACCENT)));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = app.table.rows(&app.connections.connections);
    let window = VirtualWindow::compute(
        inner.height.saturating_sub(1) as usize,
        1,
        0,
        rows.len(),
        DEFAULT_OVERSCAN,
    );
    let VirtualWindow::Rows { first, last } = window else {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "no open connections",
                Style::default().fg(COLOR_DIM),
            )),
            inner,
        );
        return;
    };

    let sort = app.table.sort();
    let header = Row::new(app.table.columns().iter().enumerate().map(|(i, column)| {
        let mut label = column.title().to_string();
        if *column == sort.column {
            label.push_str(match sort.direction {
                SortDirection::Asc => " ▲",
                SortDirection::Desc => " ▼",
            });
        }
        let mut style = Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD);
        if i == app.sort_cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        Cell::from(Span::styled(label, style))
    }));

    // Only the virtualized range is turned into widget rows.
    let body = rows[first..=last].iter().map(|rec| {
        Row::new(
            app.table
                .columns()
                .iter()
                .map(|column| Cell::from(column.render(rec))),
        )
    });

    let widths: Vec<Constraint> = app
        .table
        .columns()
        .iter()
        .map(|_| Constraint::Min(8))
        .collect();
    frame.render_widget(Table::new(body, widths).header(header), inner);
}
