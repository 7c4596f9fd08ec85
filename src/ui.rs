use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Padding, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};
use crate::app::App;
use crate::state::ChatTurn;

const HEADER_BG: Color = Color::Rgb(0x3f, 0x51, 0xb5);
const USER_BG: Color = Color::Rgb(0x19, 0x76, 0xd2);
const BOT_BG: Color = Color::Rgb(0xe0, 0xe0, 0xe0);

const PLACEHOLDER: &str = "输入你的问题...";
const SEND_LABEL: &str = "发送";
const BUSY_LABEL: &str = "发送中";
const SEND_WIDTH: u16 = 12;
const TAB_WIDTH: usize = 4;

pub fn render(app: &mut App, frame: &mut Frame) {
    let card = card_area(frame.area());

    let outer = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = outer.inner(card);
    frame.render_widget(outer, card);

    let [header_area, chat_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(inner);

    render_header(app, frame, header_area);
    render_messages(app, frame, chat_area);
    render_input(app, frame, input_area);
}

/// The chat card takes 60% x 80% of large terminals and everything on small ones.
fn card_area(area: Rect) -> Rect {
    let width = if area.width >= 100 { percent_of(area.width, 60) } else { area.width };
    let height = if area.height >= 30 { percent_of(area.height, 80) } else { area.height };

    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn percent_of(value: u16, percent: u32) -> u16 {
    (value as u32 * percent / 100) as u16
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(app.title.as_str()).bold())
        .alignment(Alignment::Center)
        .style(Style::default().bg(HEADER_BG).fg(Color::White));
    frame.render_widget(header, area);
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default().padding(Padding::horizontal(1));
    let inner = block.inner(area);
    app.chat_area = Some(area);

    let turns = app.session.conversation();
    let text = if turns.is_empty() {
        Text::from(Line::from(Span::styled(
            "输入问题后按 Enter 发送",
            Style::default().fg(Color::DarkGray),
        )))
        .alignment(Alignment::Center)
    } else {
        Text::from(keep_scrollable_tail(transcript_lines(turns, inner.width)))
    };

    let total_lines = text.lines.len() as u16;
    app.sync_scroll(total_lines, inner.height);

    let messages = Paragraph::new(text)
        .block(block)
        .scroll((app.scroll, 0));
    frame.render_widget(messages, area);
}

/// Lay out every turn as a bubble at most 60% of `width` wide, user turns on
/// the right, bot turns on the left, one blank line between turns.
pub fn transcript_lines(turns: &[ChatTurn], width: u16) -> Vec<Line<'static>> {
    // One column of padding either side of the text
    let max_text_width = ((width as usize * 60) / 100).saturating_sub(2).max(1);
    let mut lines = Vec::new();

    for turn in turns {
        let (style, alignment) = if turn.is_user() {
            (Style::default().bg(USER_BG).fg(Color::White), Alignment::Right)
        } else {
            (Style::default().bg(BOT_BG).fg(Color::Black), Alignment::Left)
        };

        let wrapped = wrap_preserving(&turn.content, max_text_width);
        let bubble_width = wrapped.iter().map(|l| l.width()).max().unwrap_or(0);

        for row in wrapped {
            let pad = " ".repeat(bubble_width - row.width());
            lines.push(
                Line::from(Span::styled(format!(" {}{} ", row, pad), style)).alignment(alignment),
            );
        }
        lines.push(Line::default());
    }

    lines
}

/// Paragraph scroll offsets are `u16`, so drop the oldest lines beyond that
/// range to keep the newest turn reachable.
fn keep_scrollable_tail(mut lines: Vec<Line<'static>>) -> Vec<Line<'static>> {
    let excess = lines.len().saturating_sub(u16::MAX as usize);
    lines.drain(..excess);
    lines
}

/// Wrap text to `max_width` display columns, keeping every space and every
/// line break, including blank lines.
pub fn wrap_preserving(text: &str, max_width: usize) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut rows = Vec::new();

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let mut current = String::new();
        let mut current_width = 0;

        for c in line.chars() {
            let (piece, w) = if c == '\t' {
                (" ".repeat(TAB_WIDTH), TAB_WIDTH)
            } else {
                (c.to_string(), c.width().unwrap_or(0))
            };

            if current_width + w > max_width && !current.is_empty() {
                rows.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push_str(&piece);
            current_width += w;
        }

        rows.push(current);
    }

    rows
}

fn render_input(app: &mut App, frame: &mut Frame, area: Rect) {
    let [field_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SEND_WIDTH),
    ])
    .areas(area);

    let field_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    // Keep the cursor inside the visible part of the field
    let inner_width = field_area.width.saturating_sub(2) as usize;
    let draft: Vec<char> = app.session.draft().chars().collect();
    let cursor = app.session.cursor().min(draft.len());
    let (offset, cursor_x) = visible_window(&draft, cursor, inner_width);

    let field = if draft.is_empty() {
        Paragraph::new(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        let mut visible = String::new();
        let mut used = 0;
        for c in &draft[offset..] {
            let w = c.width().unwrap_or(0);
            if used + w > inner_width {
                break;
            }
            visible.push(*c);
            used += w;
        }
        Paragraph::new(visible)
    };
    frame.render_widget(field.block(field_block), field_area);

    frame.set_cursor_position((field_area.x + 1 + cursor_x as u16, field_area.y + 1));

    app.send_area = Some(send_area);
    let send = if app.session.is_pending() {
        Paragraph::new(format!("{} {}", app.spinner(), BUSY_LABEL))
            .style(Style::default().fg(Color::DarkGray))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray)),
            )
    } else {
        Paragraph::new(SEND_LABEL)
            .style(
                Style::default()
                    .bg(HEADER_BG)
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(HEADER_BG)),
            )
    };
    frame.render_widget(send.alignment(Alignment::Center), send_area);
}

/// First visible char and cursor column for a field `width` columns wide.
fn visible_window(chars: &[char], cursor: usize, width: usize) -> (usize, usize) {
    let col = |from: usize| -> usize {
        chars[from..cursor].iter().map(|c| c.width().unwrap_or(0)).sum()
    };

    let mut offset = 0;
    while offset < cursor && col(offset) >= width.max(1) {
        offset += 1;
    }
    (offset, col(offset))
}
