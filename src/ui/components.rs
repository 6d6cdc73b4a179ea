//! Small widgets shared by the dashboard views

use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use super::{accent, header, inactive, text, text_dim, theme};
use crate::model::TxStatus;
use crate::notifications::NotificationKind;

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub fn spinner(frame: usize) -> &'static str {
    SPINNER_FRAMES[frame % SPINNER_FRAMES.len()]
}

/// Bordered panel; focused panels get the accent border
pub fn panel(title: &str, focused: bool) -> Block<'static> {
    let (border, title_style) = if focused {
        (accent(), Style::default().fg(accent()).add_modifier(Modifier::BOLD))
    } else {
        (inactive(), Style::default().fg(header()))
    };
    Block::default()
        .title(Span::styled(format!(" {} ", title), title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
}

/// Overview card: label, big value, one line of detail
pub fn stat_card<'a>(title: &'a str, value: &'a str, detail: Line<'a>) -> Paragraph<'a> {
    Paragraph::new(vec![
        Line::from(Span::styled(title, Style::default().fg(text_dim()))),
        Line::from(Span::styled(
            value,
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        )),
        detail,
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(inactive())),
    )
}

/// "+5.2%" in green, "-1.3%" in red
pub fn change_span(change: &str) -> Span<'_> {
    Span::styled(change, Style::default().fg(theme().change_color(change)))
}

pub fn tx_status_span(status: TxStatus) -> Span<'static> {
    let (icon, color) = match status {
        TxStatus::Completed => ("✓", theme().positive),
        TxStatus::Pending => ("◷", theme().pending),
        TxStatus::Failed => ("✗", theme().negative),
    };
    Span::styled(format!("{} {}", icon, status.label()), Style::default().fg(color))
}

pub fn strategy_status_span(status: &str) -> Span<'_> {
    let color = match status.to_ascii_lowercase().as_str() {
        "active" => theme().positive,
        "paused" => theme().pending,
        _ => text_dim(),
    };
    Span::styled(status, Style::default().fg(color))
}

pub fn notification_color(kind: NotificationKind) -> ratatui::style::Color {
    match kind {
        NotificationKind::Success => theme().positive,
        NotificationKind::Error => theme().negative,
        NotificationKind::Warning => theme().pending,
        NotificationKind::Info => theme().info,
    }
}

pub fn notification_icon(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Success => "✓",
        NotificationKind::Error => "✗",
        NotificationKind::Warning => "!",
        NotificationKind::Info => "i",
    }
}

/// Horizontal bar `width` cells wide, filled to `ratio`
pub fn bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
