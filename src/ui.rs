use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph, Tabs, Wrap},
};
use healthai_core::metrics;
use healthai_core::ChatRole;
use crate::app::{App, Form, InputMode, Screen};

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let heading = text.trim_start().starts_with('#');
    let text = if heading {
        text.trim_start().trim_start_matches('#').trim_start()
    } else {
        text
    };

    let mut spans: Vec<Span<'static>> = Vec::new();
    for (i, part) in text.split("**").enumerate() {
        if part.is_empty() {
            continue;
        }
        // Odd segments sit between a pair of ** markers
        if i % 2 == 1 {
            spans.push(Span::styled(
                part.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::raw(part.to_string()));
        }
    }

    // An unclosed ** leaves an even number of segments; show the markers literally
    if text.matches("**").count() % 2 == 1 {
        spans = vec![Span::raw(text.to_string())];
    }

    let line = Line::from(spans);
    if heading {
        line.style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
    } else {
        line
    }
}

fn reply_text(text: &str) -> Text<'static> {
    Text::from(text.lines().map(parse_markdown_line).collect::<Vec<_>>())
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, tabs, body, footer
    let [header_area, tabs_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_tabs(app, frame, tabs_area);

    match app.screen {
        Screen::Dashboard => render_dashboard(app, frame, body_area),
        Screen::Diet | Screen::Workout | Screen::Yoga => render_planner(app, frame, body_area),
        Screen::Coach => render_coach(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" HealthAI Advisor ", Style::default().fg(Color::Green).bold()),
        Span::styled(
            format!("model: {} ", app.orchestrator.client().model()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("key: {} ", app.key_source_label()),
            Style::default().fg(Color::Gray),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_tabs(app: &App, frame: &mut Frame, area: Rect) {
    let titles: Vec<String> = Screen::ALL
        .iter()
        .enumerate()
        .map(|(i, s)| format!("{} {}", i + 1, s.title()))
        .collect();
    let selected = Screen::ALL.iter().position(|s| *s == app.screen).unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .highlight_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .divider("|");
    frame.render_widget(tabs, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match (app.screen, app.input_mode) {
        (Screen::Coach, InputMode::Editing) => &[(" Enter ", " send "), (" Esc ", " stop typing ")],
        (Screen::Coach, InputMode::Normal) => &[
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" Tab ", " screen "),
            (" K ", " API key "),
            (" M ", " model "),
            (" q ", " quit "),
        ],
        (Screen::Dashboard, _) => &[
            (" j/k ", " field "),
            (" h/l ", " adjust "),
            (" Enter ", " BMI "),
            (" Tab ", " screen "),
            (" q ", " quit "),
        ],
        _ => &[
            (" j/k ", " field "),
            (" h/l ", " change "),
            (" Space ", " toggle "),
            (" Enter ", " generate "),
            (" PgUp/PgDn ", " scroll "),
            (" K ", " API key "),
            (" M ", " model "),
            (" q ", " quit "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_form(form: &dyn Form, title: &str, frame: &mut Frame, area: Rect) {
    let items: Vec<ListItem> = form
        .rows()
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let focused = i == form.focus();
            let label_style = if focused {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            let marker = if focused { "> " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(format!("{}{:<16}", marker, row.label), label_style),
                Span::raw(row.value),
            ]))
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(format!(" {} ", title));

    frame.render_widget(List::new(items).block(block), area);
}

fn render_dashboard(app: &mut App, frame: &mut Frame, area: Rect) {
    let [form_area, result_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(0),
    ])
    .areas(area);

    render_form(&app.metrics_form, "Body Metrics", frame, form_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" BMI ");

    match app.metrics_form.bmi {
        Some(bmi) => {
            let inner = block.inner(result_area);
            frame.render_widget(block, result_area);

            let [value_area, gauge_area, _] = Layout::vertical([
                Constraint::Length(2),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .areas(inner);

            let value = Paragraph::new(Line::from(vec![
                Span::styled(format!("{:.1}", bmi), Style::default().fg(Color::Cyan).bold()),
                Span::raw("  "),
                Span::styled(metrics::bmi_category(bmi), Style::default().fg(Color::Gray)),
            ]));
            frame.render_widget(value, value_area);

            let gauge = Gauge::default()
                .gauge_style(Style::default().fg(Color::Green))
                .ratio(metrics::bmi_gauge(bmi))
                .label("15 <-> 40");
            frame.render_widget(gauge, gauge_area);
        }
        None => {
            let hint = Paragraph::new("Press Enter to calculate your BMI.")
                .style(Style::default().fg(Color::DarkGray))
                .block(block);
            frame.render_widget(hint, result_area);
        }
    }
}

fn render_planner(app: &mut App, frame: &mut Frame, area: Rect) {
    let screen = app.screen;
    let Some(form) = app.active_form() else {
        return;
    };
    let form_height = form.rows().len() as u16 + 2;

    let [form_area, output_area] = Layout::vertical([
        Constraint::Length(form_height),
        Constraint::Min(0),
    ])
    .areas(area);

    render_form(form, screen.title(), frame, form_area);

    let output_title = match screen {
        Screen::Diet => " Your Personalized Meal Plan ",
        Screen::Workout => " Your Custom Workout Plan ",
        _ => " Your Yoga Sequence ",
    };

    let (text, border) = if app.loading_screen() == Some(screen) {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        (
            Text::from(Span::styled(
                format!("Generating{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
            Color::Yellow,
        )
    } else {
        match app.replies.get(&screen) {
            Some(reply) if reply.is_error() => (
                Text::from(Span::styled(reply.text().to_string(), Style::default().fg(Color::Red))),
                Color::Red,
            ),
            Some(reply) => (reply_text(reply.text()), Color::Green),
            None => (
                Text::from(Span::styled(
                    "Press Enter to generate a plan.",
                    Style::default().fg(Color::DarkGray),
                )),
                Color::DarkGray,
            ),
        }
    };

    let output = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(output_title),
        )
        .wrap(Wrap { trim: false })
        .scroll((app.output_scroll, 0));
    frame.render_widget(output, output_area);
}

fn render_coach(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" AI Wellness Coach ");

    let loading = app.loading_screen() == Some(Screen::Coach);
    let chat_text = if app.session.is_empty() && !loading {
        Text::from(Span::styled(
            "Ask about health, nutrition, or fitness...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in app.session.all() {
            match msg.role() {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(msg.content().to_string()));
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "Coach:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(msg.content().lines().map(parse_markdown_line));
                }
            }
            lines.push(Line::default());
        }

        if loading {
            lines.push(Line::from(Span::styled(
                "Coach:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat(app.animation_frame as usize + 1);
            lines.push(Line::from(Span::styled(
                format!("Analyzing{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        } else if let Some(error) = &app.coach_error {
            lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    let editing = app.input_mode == InputMode::Editing;
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(" Message ");
    let input = Paragraph::new(app.chat_input.as_str()).block(input_block);
    frame.render_widget(input, input_area);

    if editing {
        let cursor_x = app.chat_cursor.min(input_area.width.saturating_sub(3) as usize) as u16;
        frame.set_cursor_position((input_area.x + 1 + cursor_x, input_area.y + 1));
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    let x = (area.width.saturating_sub(width)) / 2;
    let y = (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let popup_area = centered_popup(area, 44, app.available_models.len() as u16 + 2);
    frame.render_widget(Clear, popup_area);

    let current = app.orchestrator.client().model().to_string();
    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|m| {
            let marker = if *m == current { " *" } else { "" };
            ListItem::new(format!("{}{}", m, marker))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(" Select Model "),
        )
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered_popup(area, 60, 7);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Groq API Key (this session only) ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let instructions = Paragraph::new("Paste your key. Enter to use it, Esc to cancel. Empty clears it.")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);

    // Mask the key with asterisks (show last 4 chars)
    let char_count = app.api_key_input.chars().count();
    let display_text = if char_count <= 4 {
        "*".repeat(char_count)
    } else {
        let masked_len = char_count - 4;
        let last_four: String = app.api_key_input.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    };
    frame.render_widget(
        Paragraph::new(display_text).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let cursor_x = app.api_key_input_cursor.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", char_count))
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}
