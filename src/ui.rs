use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};

use lucid::render::column_widths;

use crate::app::{App, InputMode};

const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const MARKED: Color = Color::Rgb(55, 48, 163);
const STATUS_BG: Color = Color::Rgb(30, 64, 175);
const MODE_BG: Color = Color::Rgb(17, 94, 89);

const COLUMN_TITLES: [&str; 5] = ["BACKEND", "TYPE", "NAME", "STATUS", "CHANGED"];
const HIGHLIGHT_SYMBOL: &str = "> ";
const HELP_WIDTH: u16 = 78;

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_header(frame, root[0], app);
    render_body(frame, root[1], app);
    render_footer(frame, root[2], app);

    if app.show_help() {
        render_help_modal(frame, app);
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let query = if app.query().trim().is_empty() {
        "backend=all resource=all"
    } else {
        app.query()
    };
    let mut spans = vec![
        Span::styled(
            " lucid ",
            Style::default()
                .fg(Color::Black)
                .bg(ACCENT)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled("query ", Style::default().fg(MUTED)),
        Span::styled(
            ellipsize(query, area.width.saturating_sub(30) as usize),
            Style::default().fg(Color::White),
        ),
    ];
    if !app.failing_backends().is_empty() {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            format!("! {}", app.failing_backends().join(",")),
            Style::default().fg(ERROR).add_modifier(Modifier::BOLD),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_body(frame: &mut Frame, area: Rect, app: &mut App) {
    let (width, height) = list_viewport(area);
    app.set_list_viewport(width, height);

    if app.overlay_active() {
        let (_, overlay_height) = overlay_viewport(area);
        app.set_overlay_viewport(overlay_height);
        render_inspect_overlay(frame, area, app);
        return;
    }

    render_listing(frame, area, app);
}

fn render_listing(frame: &mut Frame, area: Rect, app: &App) {
    let widths = column_widths(app.list_width());
    let header = COLUMN_TITLES
        .iter()
        .zip(widths)
        .map(|(title, width)| format!("{:<width$}", ellipsize(title, width)))
        .collect::<String>();
    let header_row = Row::new([Cell::from(header)])
        .height(1)
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    let marked = app.marked_range();
    let rows = app.rows().iter().enumerate().map(|(index, row)| {
        let in_mark = marked.is_some_and(|(first, last)| (first..=last).contains(&index));
        let style = if in_mark {
            Style::default().fg(Color::White).bg(MARKED)
        } else {
            Style::default().fg(Color::White)
        };
        Row::new([Cell::from(row.clone())]).style(style)
    });

    let block = Block::default()
        .title(format!("Resources ({})", app.rows().len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));

    let table = Table::new(rows, [Constraint::Min(1)])
        .header(header_row)
        .block(block)
        .column_spacing(0)
        .row_highlight_style(
            Style::default()
                .bg(Color::Rgb(24, 36, 58))
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(HIGHLIGHT_SYMBOL);

    let mut state = TableState::default();
    state.select(app.selected_index());
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_inspect_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let title = app.overlay_title().unwrap_or("Inspect").to_string();
    let text = app.overlay_text().unwrap_or("");
    let paragraph = Paragraph::new(payload_text(text))
        .scroll((app.overlay_scroll(), 0))
        .block(
            Block::default()
                .title(format!("{title}  (Esc close)"))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let line = match app.mode() {
        InputMode::Query => Line::from(vec![
            Span::styled(
                " query ",
                Style::default()
                    .fg(Color::Black)
                    .bg(WARN)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" "),
            Span::styled(
                format!("{}_", app.input()),
                Style::default().fg(Color::White),
            ),
        ]),
        InputMode::Normal => {
            let pending = app.pending_confirmation_prompt();
            let status_text = pending
                .map(|prompt| format!("{prompt}? (y/n)"))
                .unwrap_or_else(|| app.status().to_string());
            let (status_fg, status_bg) = if pending.is_some() {
                (Color::Black, WARN)
            } else {
                (Color::White, STATUS_BG)
            };
            let mode_label = if app.marked_range().is_some() {
                " range "
            } else {
                " nrm "
            };
            Line::from(vec![
                Span::styled(
                    mode_label,
                    Style::default()
                        .fg(Color::White)
                        .bg(MODE_BG)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        " {} ",
                        ellipsize(&status_text, area.width.saturating_sub(20) as usize)
                    ),
                    Style::default().fg(status_fg).bg(status_bg),
                ),
                Span::styled("  ? help", Style::default().fg(MUTED)),
            ])
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_help_modal(frame: &mut Frame, app: &App) {
    let help = help_lines();
    let area = modal_area(frame.area(), HELP_WIDTH, help.len() as u16 + 4);
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "lucid help  mode:{}  rows:{}",
            help_mode_label(app.mode()),
            app.rows().len()
        )),
        Line::from(""),
    ];
    for line in help {
        lines.push(Line::from(line));
    }

    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Help")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(ACCENT))
                .style(Style::default().bg(PANEL)),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(modal, area);
}

fn help_lines() -> Vec<&'static str> {
    vec![
        "Move: j/k or arrows  gg/G top/bottom  PgUp/PgDn or Ctrl+u/d page",
        "Listing: r refresh  / edit query (backend=docker,podman resource=image)",
        "Delete: d row under cursor  v mark range then d  y/n confirm",
        "Inspect: Enter raw payload  j/k scroll  Esc close",
        "Other: ? toggle help  q quit",
        "",
        "Failing backends are listed in the header; details go to the log file.",
    ]
}

fn help_mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Normal => "normal",
        InputMode::Query => "query",
    }
}

fn list_viewport(area: Rect) -> (u16, u16) {
    let width = area
        .width
        .saturating_sub(2)
        .saturating_sub(HIGHLIGHT_SYMBOL.chars().count() as u16)
        .max(1);
    let height = area.height.saturating_sub(3).max(1);
    (width, height)
}

fn overlay_viewport(area: Rect) -> (u16, u16) {
    let width = area.width.saturating_sub(2).max(1);
    let height = area.height.saturating_sub(2).max(1);
    (width, height)
}

const KEY: Color = Color::Rgb(103, 232, 249);
const STRING: Color = Color::Rgb(125, 211, 252);
const NUMBER: Color = Color::Rgb(251, 146, 60);

/// Colors the payload line by line. The payload is already pretty-printed, so
/// every line is at most one `"key": value` pair.
fn payload_text(payload: &str) -> Text<'static> {
    Text::from(payload.lines().map(payload_line).collect::<Vec<_>>())
}

fn payload_line(line: &str) -> Line<'static> {
    let body = line.trim_start();
    let indent = &line[..line.len() - body.len()];
    let (body, comma) = match body.strip_suffix(',') {
        Some(body) => (body, true),
        None => (body, false),
    };

    let mut spans = vec![Span::raw(indent.to_string())];
    let value = match split_key(body) {
        Some((key, value)) => {
            spans.push(Span::styled(key.to_string(), Style::default().fg(KEY)));
            spans.push(Span::styled(": ", Style::default().fg(MUTED)));
            value
        }
        None => body,
    };
    if !value.is_empty() {
        spans.push(Span::styled(value.to_string(), value_style(value)));
    }
    if comma {
        spans.push(Span::styled(",", Style::default().fg(MUTED)));
    }
    Line::from(spans)
}

/// Splits `"key": value` into the quoted key and the value text.
fn split_key(body: &str) -> Option<(&str, &str)> {
    let end = closing_quote(body)?;
    let (key, rest) = body.split_at(end + 1);
    rest.strip_prefix(": ").map(|value| (key, value))
}

/// Byte offset of the quote closing the string that opens `text`.
fn closing_quote(text: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    if chars.next()?.1 != '"' {
        return None;
    }
    let mut escaped = false;
    for (offset, ch) in chars {
        match ch {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(offset),
            _ => {}
        }
    }
    None
}

fn value_style(value: &str) -> Style {
    let color = match value {
        "true" | "false" | "null" => WARN,
        _ if value.starts_with('"') => STRING,
        _ if value.starts_with(|ch: char| ch == '-' || ch.is_ascii_digit()) => NUMBER,
        _ if value.starts_with(['{', '}', '[', ']']) => MUTED,
        _ => Color::White,
    };
    Style::default().fg(color)
}

/// Cuts `value` to `max_chars` characters, ending in an ellipsis when cut.
fn ellipsize(value: &str, max_chars: usize) -> String {
    if value.chars().nth(max_chars).is_none() {
        return value.to_string();
    }
    let Some(keep) = max_chars.checked_sub(1) else {
        return String::new();
    };
    let mut cut = value.chars().take(keep).collect::<String>();
    cut.push('…');
    cut
}

/// Centers a box of at most `max_width` by `max_height` inside `area`.
fn modal_area(area: Rect, max_width: u16, max_height: u16) -> Rect {
    let width = area.width.min(max_width);
    let height = area.height.min(max_height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
