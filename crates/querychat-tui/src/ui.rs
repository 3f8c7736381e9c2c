use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use querychat_core::Sender;
use crate::app::{App, Feedback, InputMode, Palette};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut current_text)));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;
            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, Style::default().add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, keep it literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = app.theme.palette();

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.background).fg(palette.text)),
        area,
    );

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area, &palette);
    render_chat(app, frame, chat_area, &palette);
    render_input(app, frame, input_area, &palette);
    render_footer(app, frame, footer_area, &palette);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let in_flight = app.controller.in_flight();
    let pending_indicator = if in_flight > 0 {
        format!(" [{} pending]", in_flight)
    } else {
        String::new()
    };

    let title = Line::from(vec![
        Span::styled(" querychat ", Style::default().fg(palette.accent).bold()),
        Span::styled(app.endpoint.clone(), Style::default().fg(palette.muted)),
        Span::styled(pending_indicator, Style::default().fg(palette.bot)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.muted),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    // Inner size minus borders, for scroll calculations
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.muted))
        .title(" Chat ");

    let transcript = app.controller.transcript();
    let editing_index = app.controller.edit_slot().map(|slot| slot.index);

    let chat_text = if transcript.is_empty() && app.controller.in_flight() == 0 {
        Text::from(Span::styled(
            "Type a message and press Enter...",
            Style::default().fg(palette.muted),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for (i, msg) in transcript.iter().enumerate() {
            let (label, color) = match msg.sender {
                Sender::User => ("You:", palette.user),
                Sender::Bot => ("Bot:", palette.bot),
            };

            let mut header = vec![Span::styled(
                label,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )];
            match app.feedback.get(&i) {
                Some(Feedback::Liked) => {
                    header.push(Span::styled(" [+]", Style::default().fg(palette.accent)))
                }
                Some(Feedback::Disliked) => {
                    header.push(Span::styled(" [-]", Style::default().fg(palette.muted)))
                }
                None => {}
            }
            if editing_index == Some(i) {
                header.push(Span::styled(
                    " (editing)",
                    Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
                ));
            }

            let selected = app.selected == Some(i);
            let line_style = if selected {
                Style::default().bg(palette.selection)
            } else {
                Style::default()
            };

            lines.push(Line::from(header).style(line_style));
            for line in msg.text.lines() {
                let line = match msg.sender {
                    Sender::User => Line::from(line.to_string()),
                    Sender::Bot => parse_markdown_line(line),
                };
                lines.push(line.style(line_style));
            }
            lines.push(Line::default());
        }

        if app.controller.in_flight() > 0 {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(palette.bot).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { palette.bot } else { palette.muted };

    let title = match app.controller.edit_slot() {
        Some(slot) => format!(" Edit message {} (Enter to resend, Esc to cancel) ", slot.index + 1),
        None => " Message (/attach <file> to upload) ".to_string(),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input_text()
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(palette.user))
        .block(block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" NORMAL ", Style::default().bg(palette.accent).fg(palette.background)),
        InputMode::Editing => (" INSERT ", Style::default().bg(palette.bot).fg(palette.background)),
    };

    let key_style = Style::default().bg(palette.selection).fg(palette.text);
    let label_style = Style::default().fg(palette.text);

    let mut spans = vec![Span::styled(mode_text, mode_style)];

    if let Some(status) = &app.status {
        let style = if status.is_warning {
            Style::default().fg(ratatui::style::Color::Red).bold()
        } else {
            Style::default().fg(palette.accent)
        };
        spans.push(Span::styled(format!(" {} ", status.text), style));
    } else {
        let hints: &[(&str, &str)] = match app.input_mode {
            InputMode::Normal => &[
                (" i ", " type "),
                (" j/k ", " select "),
                (" e ", " edit "),
                (" c ", " copy "),
                (" +/- ", " rate "),
                (" t ", " theme "),
                (" q ", " quit "),
            ],
            InputMode::Editing => &[(" Enter ", " send "), (" Esc ", " back ")],
        };
        for (key, label) in hints {
            spans.push(Span::styled(*key, key_style));
            spans.push(Span::styled(*label, label_style));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
