//! Config view: daemon settings as an editable field list plus one-shot
//! actions.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::app::{App, ConfigItem};
use crate::models::ConfigSnapshot;
use crate::mutation::PortField;

use super::{COLOR_ACCENT, COLOR_DIM};

fn port_value(config: &ConfigSnapshot, field: PortField) -> Option<u16> {
    match field {
        PortField::Http => config.port,
        PortField::Socks => config.socks_port,
        PortField::Mixed => config.mixed_port,
        PortField::Redir => config.redir_port,
        PortField::Mitm => config.mitm_port,
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn item_text(item: ConfigItem, config: &ConfigSnapshot) -> (String, String) {
    match item {
        ConfigItem::Port(field) => (
            field.wire_name().to_string(),
            port_value(config, field)
                .map(|p| p.to_string())
                .unwrap_or_default(),
        ),
        ConfigItem::Mode => ("mode".to_string(), config.mode.clone()),
        ConfigItem::LogLevel => ("log-level".to_string(), config.log_level.to_string()),
        ConfigItem::AllowLan => ("allow-lan".to_string(), on_off(config.allow_lan).to_string()),
        ConfigItem::Sniffing => ("sniffing".to_string(), on_off(config.sniffing).to_string()),
        ConfigItem::TunEnable => ("tun".to_string(), on_off(config.tun.enable).to_string()),
        ConfigItem::TunStack => ("tun-stack".to_string(), config.tun.stack.clone()),
        ConfigItem::Action(action) => (action.label().to_string(), "↵ run".to_string()),
    }
}

pub fn render(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(COLOR_DIM))
        .title(Span::styled(
            " Config — ↑/↓ select, ↵ change ",
            Style::default().fg(COLOR_ACCENT),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(config) = &app.config else {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "config not loaded yet",
                Style::default().fg(COLOR_DIM),
            )),
            inner,
        );
        return;
    };

    let halves = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let items = app.config_items();
    let selected = app.config_cursor.selected.min(items.len().saturating_sub(1));
    let rows: Vec<ListItem> = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let (label, mut value) = item_text(*item, config);
            // A port being edited shows the input with a cursor instead of the
            // stored value.
            if i == selected {
                if let (ConfigItem::Port(_), Some(input)) = (item, &app.config_cursor.input) {
                    value = format!("{}▏", input);
                }
            }
            let mut style = Style::default();
            if i == selected {
                style = style.fg(COLOR_ACCENT).add_modifier(Modifier::BOLD);
            }
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:<24}", label), style),
                Span::styled(value, style),
            ]))
        })
        .collect();
    frame.render_widget(List::new(rows), halves[0]);

    let footer = format!(
        "daemon {}{}{}",
        app.version.version,
        if app.version.premium { " premium" } else { "" },
        if app.version.plus_pro { " plus-pro" } else { "" },
    );
    frame.render_widget(
        Paragraph::new(Span::styled(footer, Style::default().fg(COLOR_DIM))),
        halves[1],
    );
}
