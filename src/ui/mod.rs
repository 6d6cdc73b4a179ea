mod components;

use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};
use std::sync::OnceLock;

use crate::app::{App, Popup, Tab};
use crate::model::{time_ago, DashboardData};
use crate::theme::Theme;
use components::{
    bar, change_span, notification_color, notification_icon, panel, spinner, stat_card,
    strategy_status_span, tx_status_span,
};

/// Toasts drawn at once; the rest wait in the queue
const VISIBLE_TOASTS: usize = 3;

// Palette is fixed for the lifetime of the process
static THEME: OnceLock<Theme> = OnceLock::new();

/// Install the palette built from the config. Later calls are ignored.
pub fn set_theme(theme: Theme) {
    let _ = THEME.set(theme);
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn positive() -> Color { theme().positive }
fn negative() -> Color { theme().negative }
fn pending() -> Color { theme().pending }
fn info() -> Color { theme().info }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let sidebar_width = if *app.sidebar_collapsed.get() || area.width < 70 { 6 } else { 26 };
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(sidebar_width), Constraint::Min(20)])
        .split(area);

    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Top bar
            Constraint::Min(5),    // Active view
            Constraint::Length(1), // Footer
        ])
        .split(columns[1]);

    draw_sidebar(f, app, columns[0]);
    draw_top_bar(f, app, main[0]);
    draw_content(f, app, main[1]);
    draw_footer(f, app, main[2]);
    draw_toasts(f, app, columns[1]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::Help => draw_help_popup(f),
    }
}

fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let collapsed = area.width < 10;
    let block = Block::default()
        .title(Span::styled(
            if collapsed { " 󰒃 " } else { " 󰒃 Sentinel " },
            Style::default().fg(accent()).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(inner);

    let active = app.active_tab();
    let nav: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let selected = *tab == active;
            let style = if selected {
                Style::default().bg(bg_selected()).fg(accent()).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(text())
            };
            if collapsed {
                Line::from(Span::styled(format!(" {} ", tab.icon()), style))
            } else {
                Line::from(vec![
                    Span::styled(format!("{} ", i + 1), Style::default().fg(text_dim())),
                    Span::styled(format!("{} {:<14}", tab.icon(), tab.label()), style),
                ])
            }
        })
        .collect();
    f.render_widget(Paragraph::new(nav), chunks[0]);

    // Agent status footer
    let (chains, strategies) = app.agent_summary();
    let dot_color = if app.connected || app.offline { positive() } else { pending() };
    let footer = if collapsed {
        vec![Line::from(Span::styled(" ●", Style::default().fg(dot_color)))]
    } else {
        vec![
            Line::from(Span::styled("─".repeat(inner.width as usize), Style::default().fg(inactive()))),
            Line::from(vec![
                Span::styled("● ", Style::default().fg(dot_color)),
                Span::styled("Agent Active", Style::default().fg(text())),
            ]),
            Line::from(Span::styled(
                format!("{} chains • {} strategies", chains, strategies),
                Style::default().fg(text_dim()),
            )),
        ]
    };
    f.render_widget(Paragraph::new(footer), chunks[1]);
}

fn draw_top_bar(f: &mut Frame, app: &App, area: Rect) {
    let tab = app.active_tab();
    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(Style::default().fg(inactive()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    // Priority: status message > view description
    let subtitle = match &app.status_message {
        Some(status) => Span::styled(status.as_str(), Style::default().fg(pending())),
        None => Span::styled(tab.description(), Style::default().fg(text_dim())),
    };
    let title = Paragraph::new(vec![
        Line::from(Span::styled(
            tab.label(),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(subtitle),
    ]);
    f.render_widget(title, halves[0]);

    let (conn_icon, conn_text, conn_color) = if app.offline {
        ("○", "Offline mode", text_dim())
    } else if app.connected {
        ("●", "Live", positive())
    } else if app.connection_error.is_some() {
        ("○", "Reconnecting", negative())
    } else {
        ("○", "Connecting", pending())
    };

    let mut status = vec![
        Span::styled(format!("{} {}", conn_icon, conn_text), Style::default().fg(conn_color)),
    ];
    if app.refreshing {
        status.push(Span::styled(
            format!("  {}", spinner(app.spinner_frame)),
            Style::default().fg(accent()),
        ));
    }
    status.push(Span::styled(
        format!("  󰂚 {}", app.notifications.len()),
        Style::default().fg(if app.notifications.is_empty() { text_dim() } else { accent() }),
    ));

    let updated = match app.data() {
        Some(data) => format!("Updated {}", time_ago(data.last_updated, Utc::now())),
        None => "Waiting for data".to_string(),
    };

    let right = Paragraph::new(vec![
        Line::from(status),
        Line::from(Span::styled(updated, Style::default().fg(text_dim()))),
    ])
    .alignment(Alignment::Right);
    f.render_widget(right, halves[1]);
}

fn draw_content(f: &mut Frame, app: &App, area: Rect) {
    let tab = app.active_tab();
    if matches!(tab, Tab::Analytics | Tab::MultiChain | Tab::Settings) {
        draw_coming_soon(f, tab, area);
        return;
    }

    let Some(data) = app.data() else {
        draw_loading(f, app, area);
        return;
    };

    match tab {
        Tab::Overview => draw_overview(f, data, area),
        Tab::Portfolio => draw_portfolio(f, data, area),
        Tab::Strategies => draw_strategies(f, app, data, area),
        Tab::Transactions => draw_transactions(f, app, area),
        Tab::Analytics | Tab::MultiChain | Tab::Settings => {}
    }
}

fn draw_loading(f: &mut Frame, app: &App, area: Rect) {
    let mut lines = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled(spinner(app.spinner_frame), Style::default().fg(accent())),
            Span::styled(" Loading dashboard...", Style::default().fg(text())),
        ]),
    ];
    if let Some(error) = &app.connection_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(error.as_str(), Style::default().fg(negative()))));
    }
    let loading = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(loading, centered_rect(80, 40, area));
}

fn draw_coming_soon(f: &mut Frame, tab: Tab, area: Rect) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("{} {}", tab.icon(), tab.label()),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(tab.description(), Style::default().fg(text_dim()))),
        Line::from(""),
        Line::from(Span::styled("Coming Soon", Style::default().fg(accent()))),
    ];
    let block = panel(tab.label(), false);
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center).block(block), area);
}

fn draw_overview(f: &mut Frame, data: &DashboardData, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(4)])
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(rows[0]);

    let stats = &data.stats;
    let portfolio_value = if stats.total_portfolio.is_empty() {
        data.portfolio.total_value.as_str()
    } else {
        stats.total_portfolio.as_str()
    };
    let active = stats.active_strategies.to_string();

    f.render_widget(
        stat_card(
            "Total Portfolio",
            portfolio_value,
            Line::from(vec![change_span(&data.portfolio.total_change), Span::raw(" 24h")]),
        ),
        cards[0],
    );
    f.render_widget(
        stat_card(
            "Active Strategies",
            &active,
            Line::from(Span::styled(
                format!("{} total", data.strategies.len()),
                Style::default().fg(text_dim()),
            )),
        ),
        cards[1],
    );
    f.render_widget(
        stat_card(
            "24h Volume",
            &stats.volume_24h,
            Line::from(Span::styled(
                format!("{} transactions", stats.total_transactions),
                Style::default().fg(text_dim()),
            )),
        ),
        cards[2],
    );
    f.render_widget(
        stat_card(
            "Gas Optimized",
            &stats.gas_optimized,
            Line::from(Span::styled(
                format!("{} success", stats.success_rate),
                Style::default().fg(positive()),
            )),
        ),
        cards[3],
    );

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(rows[1]);

    // Recent activity
    let now = Utc::now();
    let recent: Vec<Row> = data
        .transactions
        .iter()
        .take(5)
        .map(|tx| {
            Row::new(vec![
                tx_status_span(tx.status),
                Span::styled(tx.kind.as_str(), Style::default().fg(text())),
                Span::styled(format!("{} {}", tx.amount, tx.token), Style::default().fg(text())),
                Span::styled(time_ago(tx.timestamp, now), Style::default().fg(text_dim())),
            ])
        })
        .collect();
    let recent = Table::new(
        recent,
        [
            Constraint::Length(12),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
            Constraint::Percentage(30),
        ],
    )
    .block(panel("Recent Activity", false));
    f.render_widget(recent, bottom[0]);

    // Strategy summary
    let strategies: Vec<Line> = data
        .strategies
        .iter()
        .map(|s| {
            let (dot, color) = if s.is_active() { ("●", positive()) } else { ("○", pending()) };
            Line::from(vec![
                Span::styled(dot, Style::default().fg(color)),
                Span::raw(" "),
                Span::styled(s.name.as_str(), Style::default().fg(text())),
                Span::raw("  "),
                change_span(&s.performance),
            ])
        })
        .collect();
    let strategies = if strategies.is_empty() {
        vec![Line::from(Span::styled("No strategies", Style::default().fg(text_dim())))]
    } else {
        strategies
    };
    f.render_widget(
        Paragraph::new(strategies).block(panel("Strategies", false)),
        bottom[1],
    );
}

fn draw_portfolio(f: &mut Frame, data: &DashboardData, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let header_row = Row::new(vec![
        Span::styled("Asset", Style::default().fg(header())),
        Span::styled("Amount", Style::default().fg(header())),
        Span::styled("Value", Style::default().fg(header())),
        Span::styled("24h", Style::default().fg(header())),
    ]);

    let rows: Vec<Row> = if data.portfolio.assets.is_empty() {
        vec![Row::new(vec![Span::styled("  No assets", Style::default().fg(text_dim()))])]
    } else {
        data.portfolio
            .assets
            .iter()
            .map(|asset| {
                Row::new(vec![
                    Span::styled(asset.symbol.as_str(), Style::default().fg(text()).add_modifier(Modifier::BOLD)),
                    Span::styled(asset.amount().unwrap_or("-"), Style::default().fg(text_dim())),
                    Span::styled(asset.value.as_str(), Style::default().fg(text())),
                    change_span(&asset.change),
                ])
            })
            .collect()
    };

    let title = format!("Assets ({})", data.portfolio.total_value);
    let assets = Table::new(
        rows,
        [
            Constraint::Percentage(20),
            Constraint::Percentage(25),
            Constraint::Percentage(35),
            Constraint::Percentage(20),
        ],
    )
    .header(header_row)
    .block(panel(&title, true));
    f.render_widget(assets, chunks[0]);

    // Chain distribution
    let bar_width = (chunks[1].width as usize).saturating_sub(40).clamp(5, 40);
    let lines: Vec<Line> = data
        .portfolio
        .distribution
        .iter()
        .map(|chain| {
            Line::from(vec![
                Span::styled(format!("{:<12}", chain.name), Style::default().fg(text())),
                Span::styled(bar(chain.ratio(), bar_width), Style::default().fg(accent())),
                Span::styled(format!(" {:>5.1}%", chain.percentage), Style::default().fg(text())),
                Span::styled(format!("  {}", chain.value), Style::default().fg(text_dim())),
            ])
        })
        .collect();
    f.render_widget(
        Paragraph::new(lines).block(panel("Chain Distribution", false)),
        chunks[1],
    );
}

fn draw_strategies(f: &mut Frame, app: &App, data: &DashboardData, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let header_row = Row::new(vec![
        Span::styled("Name", Style::default().fg(header())),
        Span::styled("Type", Style::default().fg(header())),
        Span::styled("Status", Style::default().fg(header())),
        Span::styled("Perf.", Style::default().fg(header())),
    ]);

    let rows: Vec<Row> = if data.strategies.is_empty() {
        vec![Row::new(vec![Span::styled("  No strategies", Style::default().fg(text_dim()))])]
    } else {
        data.strategies
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let row_style = if i == app.selected_strategy {
                    Style::default().bg(bg_selected()).fg(text())
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Span::styled(s.name.as_str(), Style::default().fg(text())),
                    Span::styled(s.kind.as_str(), Style::default().fg(text_dim())),
                    strategy_status_span(&s.status),
                    change_span(&s.performance),
                ])
                .style(row_style)
            })
            .collect()
    };

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(18),
            Constraint::Percentage(20),
            Constraint::Percentage(22),
        ],
    )
    .header(header_row)
    .block(panel("Strategies", true));
    f.render_widget(table, chunks[0]);

    let detail = match app.selected_strategy() {
        Some(s) => {
            let label = |name: &'static str| Span::styled(format!("{:<16}", name), Style::default().fg(text_dim()));
            let last = s
                .last_execution
                .map(|ts| time_ago(ts, Utc::now()))
                .unwrap_or_else(|| "-".to_string());
            let action = if s.is_paused() { "resume" } else { "pause" };
            vec![
                Line::from(Span::styled(
                    s.name.as_str(),
                    Style::default().fg(header()).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(vec![label("Status"), strategy_status_span(&s.status)]),
                Line::from(vec![label("Invested"), Span::styled(s.invested.as_str(), Style::default().fg(text()))]),
                Line::from(vec![label("Current value"), Span::styled(s.current_value.as_str(), Style::default().fg(text()))]),
                Line::from(vec![label("Performance"), change_span(&s.performance)]),
                Line::from(vec![label("Next execution"), Span::styled(s.next_execution.as_str(), Style::default().fg(info()))]),
                Line::from(vec![label("Last execution"), Span::styled(last, Style::default().fg(text()))]),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Space", Style::default().fg(accent())),
                    Span::styled(format!(" {}", action), Style::default().fg(text_dim())),
                ]),
            ]
        }
        None => vec![Line::from(Span::styled("Nothing selected", Style::default().fg(text_dim())))],
    };
    f.render_widget(
        Paragraph::new(detail).wrap(Wrap { trim: false }).block(panel("Details", false)),
        chunks[1],
    );
}

fn draw_transactions(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(3)])
        .split(area);

    // Filter line
    let chain = app.chain_filter.get().as_deref().unwrap_or("All Chains");
    let query = app.search.current();
    let mut filters = vec![
        Span::styled(" Chain: ", Style::default().fg(text_dim())),
        Span::styled(chain, Style::default().fg(accent())),
        Span::styled("  │  Search: ", Style::default().fg(text_dim())),
    ];
    if app.searching {
        filters.push(Span::styled(format!("{}█", query), Style::default().fg(text())));
    } else if query.is_empty() {
        filters.push(Span::styled("/ to search", Style::default().fg(inactive())));
    } else {
        filters.push(Span::styled(query.as_str(), Style::default().fg(text())));
    }
    f.render_widget(Paragraph::new(Line::from(filters)), chunks[0]);

    let transactions = app.filtered_transactions();
    let show_hash = chunks[1].width > 90;
    let now = Utc::now();

    let mut header_cells = vec![
        Span::styled("Status", Style::default().fg(header())),
        Span::styled("Type", Style::default().fg(header())),
        Span::styled("Amount", Style::default().fg(header())),
        Span::styled("Chain", Style::default().fg(header())),
        Span::styled("Time", Style::default().fg(header())),
    ];
    if show_hash {
        header_cells.push(Span::styled("Hash", Style::default().fg(header())));
    }

    let rows: Vec<Row> = transactions
        .iter()
        .map(|tx| {
            let mut cells = vec![
                tx_status_span(tx.status),
                Span::styled(tx.kind.as_str(), Style::default().fg(text())),
                Span::styled(format!("{} {}", tx.amount, tx.token), Style::default().fg(text())),
                Span::styled(tx.chain.as_str(), Style::default().fg(text_dim())),
                Span::styled(time_ago(tx.timestamp, now), Style::default().fg(text_dim())),
            ];
            if show_hash {
                cells.push(Span::styled(tx.short_hash(), Style::default().fg(inactive())));
            }
            Row::new(cells)
        })
        .collect();

    let widths = if show_hash {
        vec![
            Constraint::Length(12),
            Constraint::Percentage(18),
            Constraint::Percentage(16),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(24),
        ]
    } else {
        vec![
            Constraint::Length(12),
            Constraint::Percentage(28),
            Constraint::Percentage(24),
            Constraint::Percentage(20),
            Constraint::Percentage(28),
        ]
    };

    let title = format!("Transactions ({})", transactions.len());
    let empty = transactions.is_empty();
    let table = Table::new(rows, widths)
        .header(Row::new(header_cells))
        .row_highlight_style(Style::default().bg(bg_selected()).fg(text()))
        .block(panel(&title, true));

    let mut state = TableState::default();
    if !empty {
        state.select(Some(app.tx_scroll));
    }
    f.render_stateful_widget(table, chunks[1], &mut state);

    if empty {
        let inner = Rect {
            y: chunks[1].y + 2,
            height: 1,
            ..chunks[1]
        };
        f.render_widget(
            Paragraph::new(Span::styled("No transactions match", Style::default().fg(text_dim())))
                .alignment(Alignment::Center),
            inner.intersection(chunks[1]),
        );
    }
}

fn draw_toasts(f: &mut Frame, app: &App, area: Rect) {
    let width = 40.min(area.width);
    let mut y = area.y + 3;
    for notification in app.notifications.iter().take(VISIBLE_TOASTS) {
        if y + 4 > area.y + area.height {
            break;
        }
        let toast_area = Rect {
            x: area.x + area.width - width,
            y,
            width,
            height: 4,
        };
        let color = notification_color(notification.kind);
        let toast = Paragraph::new(Line::from(Span::styled(
            notification.message.as_str(),
            Style::default().fg(text()),
        )))
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(Span::styled(
                    format!(" {} {} ", notification_icon(notification.kind), notification.title),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        );
        f.render_widget(Clear, toast_area);
        f.render_widget(toast, toast_area);
        y += 4;
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = if app.searching {
        vec![("Enter", "Apply"), ("Esc", "Clear"), ("Bksp", "Delete")]
    } else {
        match app.active_tab() {
            Tab::Strategies => vec![
                ("↑↓", "Nav"),
                ("Space", "Pause/Resume"),
                ("Tab", "Next"),
                ("r", "Refresh"),
                ("h", "Help"),
                ("q", "Quit"),
            ],
            Tab::Transactions => vec![
                ("↑↓", "Scroll"),
                ("/", "Search"),
                ("f", "Chain"),
                ("e", "Export"),
                ("Tab", "Next"),
                ("h", "Help"),
                ("q", "Quit"),
            ],
            _ => vec![
                ("1-7", "View"),
                ("Tab", "Next"),
                ("[", "Sidebar"),
                ("r", "Refresh"),
                ("h", "Help"),
                ("q", "Quit"),
            ],
        }
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 60 { 4 } else if area.width < 80 { 5 } else { hints.len() };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 60 },
        if area.height < 30 { 95 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let section = |title: &'static str| {
        Line::from(Span::styled(
            format!("═══ {} ═══", title),
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ))
    };
    let binding = |keys: &'static str, action: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", keys), Style::default().fg(accent())),
            Span::raw(action),
        ])
    };

    let help_text = vec![
        section("Navigation"),
        binding("Tab", "Next view (Shift-Tab for previous)"),
        binding("1-7", "Jump to a view"),
        binding("↑/↓ j/k", "Move up/down in lists"),
        binding("[", "Collapse/expand the sidebar"),
        Line::from(""),
        section("Data"),
        binding("r", "Refresh from the server"),
        binding("Space/p", "Pause or resume the selected strategy"),
        binding("f", "Cycle the transaction chain filter"),
        binding("/", "Search transactions"),
        binding("e", "Export visible transactions as JSON"),
        Line::from(""),
        section("Notifications"),
        binding("x", "Dismiss the newest notification"),
        binding("c", "Clear all notifications"),
        Line::from(""),
        section("Scripting"),
        binding("--status", "Print server health and summary as JSON"),
        binding("--offline", "Run against built-in sample data"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 Sentinel Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::model::mock;
    use crate::notifications::NotificationKind;
    use crate::storage::LocalStore;
    use ratatui::{backend::TestBackend, Terminal};

    fn render(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer.content.iter().map(|cell| cell.symbol()).collect()
    }

    fn offline_app() -> App {
        App::new(AppConfig::default(), &LocalStore::in_memory(), Some(mock::dashboard()))
    }

    #[test]
    fn test_overview_shows_cards_and_agent_footer() {
        let app = offline_app();
        let screen = render(&app, 140, 40);
        assert!(screen.contains("Total Portfolio"));
        assert!(screen.contains("$25,420.50"));
        assert!(screen.contains("Agent Active"));
        assert!(screen.contains("3 chains • 2 strategies"));
        assert!(screen.contains("Offline mode"));
    }

    #[test]
    fn test_loading_state_before_snapshot() {
        let app = App::new(AppConfig::default(), &LocalStore::in_memory(), None);
        let screen = render(&app, 120, 30);
        assert!(screen.contains("Loading dashboard..."));
        assert!(screen.contains("Waiting for data"));
    }

    #[test]
    fn test_placeholder_views() {
        let mut app = offline_app();
        for tab in [Tab::Analytics, Tab::MultiChain, Tab::Settings] {
            app.select_tab(tab);
            assert!(render(&app, 120, 30).contains("Coming Soon"));
        }
    }

    #[test]
    fn test_strategy_and_transaction_views() {
        let mut app = offline_app();
        app.select_tab(Tab::Strategies);
        let screen = render(&app, 140, 30);
        assert!(screen.contains("Portfolio Rebalancer"));
        assert!(screen.contains("Next execution"));

        app.select_tab(Tab::Transactions);
        let screen = render(&app, 140, 30);
        assert!(screen.contains("Transactions (3)"));
        assert!(screen.contains("All Chains"));
        assert!(screen.contains("0x1a2b...ef12"));
    }

    #[test]
    fn test_toasts_and_collapsed_sidebar() {
        let mut app = offline_app();
        app.notifications.push(NotificationKind::Error, "Refresh failed", "HTTP error! status: 500");
        app.sidebar_collapsed.set(true);
        let screen = render(&app, 120, 30);
        assert!(screen.contains("Refresh failed"));
        assert!(!screen.contains("Agent Active"));
    }

    #[test]
    fn test_help_popup_renders() {
        let mut app = offline_app();
        app.popup = Popup::Help;
        assert!(render(&app, 100, 40).contains("Sentinel Help"));
    }
}
