use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use tertulia_core::{ChatRole, InputState};

use crate::app::App;

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
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
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

    // Input grows with the draft, up to MAX_VISIBLE_ROWS
    let input_height = app.session.composer().visible_rows() + 2;

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_height),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if let Some(notice) = app.session.blocking_notice() {
        render_blocking_notice(notice, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let model = app.session.selected_model().unwrap_or("no model");

    let title = Line::from(vec![
        Span::styled(" Tertulia ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("[{}]", model), Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area and inner size for scrolling and hit-testing
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Chat ");

    let transcript = app.session.transcript();
    let placeholder = match app.session.input_state() {
        InputState::Loading => Some("Loading models..."),
        _ if transcript.is_empty() && !app.is_waiting() => {
            Some("Type a message and press Enter to send.")
        }
        _ => None,
    };

    let text = if let Some(placeholder) = placeholder {
        Text::from(Span::styled(placeholder, Style::default().fg(Color::DarkGray)))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in transcript.messages() {
            match msg.role {
                ChatRole::User => {
                    lines.push(
                        Line::from(vec![
                            Span::styled("You", Style::default().fg(Color::Green).bold()),
                            Span::styled(
                                format!(" {}", msg.time_label()),
                                Style::default().fg(Color::DarkGray),
                            ),
                        ])
                        .alignment(Alignment::Right),
                    );
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()).alignment(Alignment::Right));
                    }
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(vec![
                        Span::styled("AI", Style::default().fg(Color::Yellow).bold()),
                        Span::styled(
                            format!(" {}", msg.time_label()),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ]));
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                }
            }
            lines.push(Line::default());
        }

        if app.is_waiting() {
            lines.push(Line::from(Span::styled(
                "AI",
                Style::default().fg(Color::Yellow).bold(),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.session.input_enabled();
    let (title, border_color) = match app.session.input_state() {
        InputState::Ready => (" Message (Enter send, Shift+Enter newline) ", Color::Yellow),
        InputState::Busy => (" Waiting for reply... ", Color::DarkGray),
        InputState::Loading => (" Loading... ", Color::DarkGray),
        InputState::Blocked(_) => (" Input disabled ", Color::Red),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let composer = app.session.composer();
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = composer.cursor_row_col();

    // Keep the cursor visible: scroll rows and columns independently
    let row_offset = row.saturating_sub(inner_height.saturating_sub(1));
    let col_offset = if inner_width == 0 {
        0
    } else {
        col.saturating_sub(inner_width - 1)
    };

    let visible: Vec<Line> = composer
        .text()
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| {
            Line::from(
                line.chars()
                    .skip(col_offset)
                    .take(inner_width)
                    .collect::<String>(),
            )
        })
        .collect();

    let text_style = if enabled {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let input = Paragraph::new(visible).style(text_style).block(block);
    frame.render_widget(input, area);

    if enabled && app.session.input_focused() && !app.show_model_picker {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.session.is_blocked() {
        vec![
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ]
    } else if app.show_model_picker {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Shift+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Ctrl+P ", key_style),
            Span::styled(" model ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Ctrl+C ", key_style),
            Span::styled(" quit ", label_style),
        ]
    };

    frame.render_widget(Paragraph::new(Line::from(hints)), area);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 40.min(area.width.saturating_sub(4));
    let popup_height = (app.session.models().len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model ");

    let selected = app.session.selected_model();
    let items: Vec<ListItem> = app
        .session
        .models()
        .iter()
        .map(|model| {
            let style = if Some(model.as_str()) == selected {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_blocking_notice(notice: &str, frame: &mut Frame, area: Rect) {
    let popup_width = 60.min(area.width.saturating_sub(4));
    let popup_height = 7.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Cannot start chat ");

    let text = Text::from(vec![
        Line::from(notice.to_string()),
        Line::default(),
        Line::from(Span::styled("Press q to quit", Style::default().fg(Color::DarkGray))),
    ]);

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });

    frame.render_widget(paragraph, popup_area);
}
