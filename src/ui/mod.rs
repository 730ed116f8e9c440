use std::sync::OnceLock;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Section, FIELD_LABELS};
use crate::theme::Theme;

static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn accent_bright() -> Color { theme().accent_bright }
fn danger() -> Color { theme().danger }
fn success() -> Color { theme().success }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(1), // Info line
            Constraint::Length(6), // Measurements box (4 fields)
            Constraint::Length(3), // Model box (one-liner with border)
            Constraint::Min(8),    // Result box
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_title(f, chunks[0]);
    draw_info_line(f, app, chunks[1]);
    draw_measurements_box(f, app, chunks[2]);
    draw_model_box(f, app, chunks[3]);
    draw_result_box(f, app, chunks[4]);
    draw_footer(f, app, chunks[5]);

    if app.show_help {
        draw_help_popup(f);
    }
}

fn draw_title(f: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled("✿ ayame ", Style::default().fg(header()).add_modifier(Modifier::BOLD)),
        Span::styled("│ iris species prediction", Style::default().fg(text_dim())),
    ]);
    f.render_widget(Paragraph::new(title).alignment(Alignment::Center), area);
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: in-flight request > status message > ready
    let line = if app.loading {
        Line::from(vec![
            Span::styled("󰔟 ", Style::default().fg(accent())),
            Span::styled("Analyzing measurements...", Style::default().fg(accent())),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(vec![
            Span::styled(status.as_str(), Style::default().fg(danger())),
        ])
    } else {
        Line::from(vec![
            Span::styled("Ready", Style::default().fg(text_dim())),
        ])
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn draw_measurements_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Measurements;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Measurements (cm) ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let rows: Vec<Line> = FIELD_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let focused = is_active && i == app.selected_field;
            let cursor = if focused { "_" } else { "" };
            let row_style = if focused {
                Style::default().bg(bg_selected()).fg(text())
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(format!("  {:<14}", label), Style::default().fg(text_dim())),
                Span::styled(
                    format!("{}{}", app.features[i], cursor),
                    Style::default().fg(text()),
                ),
            ])
            .style(row_style)
        })
        .collect();

    let content = Paragraph::new(rows).block(block);
    f.render_widget(content, area);
}

fn draw_model_box(f: &mut Frame, app: &App, area: Rect) {
    let is_active = app.section == Section::Model;
    let border_color = if is_active { accent() } else { inactive() };
    let title_style = if is_active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };

    let block = Block::default()
        .title(Span::styled(" Model ", title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let option = |kind: crate::predict::ModelKind| -> Vec<Span<'static>> {
        let selected = app.model == kind;
        let (marker, style) = if selected {
            ("●", Style::default().fg(accent_bright()).add_modifier(Modifier::BOLD))
        } else {
            ("○", Style::default().fg(text_dim()))
        };
        vec![
            Span::styled(format!("{} ", marker), style),
            Span::styled(kind.display_name(), style),
        ]
    };

    let mut spans = vec![Span::raw("  ")];
    spans.extend(option(crate::predict::ModelKind::Logistic));
    spans.push(Span::styled("    ", Style::default()));
    spans.extend(option(crate::predict::ModelKind::DecisionTree));
    if is_active {
        spans.push(Span::styled("  │ ", Style::default().fg(inactive())));
        spans.push(Span::styled("←/→", Style::default().fg(accent())));
        spans.push(Span::styled(" toggle", Style::default().fg(text_dim())));
    }

    let content = Paragraph::new(Line::from(spans)).block(block);
    f.render_widget(content, area);
}

fn draw_result_box(f: &mut Frame, app: &App, area: Rect) {
    let (border_color, title_text) = match &app.result {
        Some(outcome) if outcome.is_fallback() => (danger(), " Result (offline fallback) "),
        Some(_) => (success(), " Result "),
        None => (inactive(), " Result "),
    };

    let block = Block::default()
        .title(Span::styled(title_text, Style::default().fg(border_color)))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(outcome) = &app.result else {
        let placeholder = if app.loading {
            "Waiting for the classifier..."
        } else {
            "No prediction yet. Press Enter to classify."
        };
        let content = Paragraph::new(Line::styled(placeholder, Style::default().fg(text_dim())))
            .alignment(Alignment::Center);
        f.render_widget(content, inner);
        return;
    };

    let prediction = outcome.prediction();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Species
            Constraint::Length(1), // Confidence
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Model used
            Constraint::Min(0),    // Fallback notice
        ])
        .split(inner);

    let species = Line::from(vec![
        Span::styled("  ✿ ", Style::default().fg(accent())),
        Span::styled(
            prediction.species.label(),
            Style::default().fg(accent_bright()).add_modifier(Modifier::BOLD),
        ),
    ]);
    f.render_widget(Paragraph::new(species), rows[0]);

    let confidence = Line::from(vec![
        Span::styled("  Confidence: ", Style::default().fg(text_dim())),
        Span::styled(prediction.confidence_percent(), Style::default().fg(text())),
    ]);
    f.render_widget(Paragraph::new(confidence), rows[1]);

    // Gauge panics outside 0..=1, so clamp; NaN can only come from a
    // fabricated probability vector and never does, but guard anyway.
    let ratio = prediction.confidence();
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let gauge_area = Rect {
        x: rows[2].x + 2,
        width: rows[2].width.saturating_sub(4),
        ..rows[2]
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(success()))
        .ratio(ratio)
        .label(prediction.confidence_percent());
    f.render_widget(gauge, gauge_area);

    let model_line = Line::from(vec![
        Span::styled("  Using ", Style::default().fg(text_dim())),
        Span::styled(app.model.display_name(), Style::default().fg(text())),
        Span::styled(" model", Style::default().fg(text_dim())),
    ]);
    f.render_widget(Paragraph::new(model_line), rows[3]);

    if let crate::predict::Outcome::Fallback { reason, .. } = outcome {
        let notice = vec![
            Line::from(""),
            Line::from(vec![
                Span::styled("  ⚠ ", Style::default().fg(danger())),
                Span::styled(
                    "Backend unreachable; this is a locally fabricated stand-in.",
                    Style::default().fg(danger()),
                ),
            ]),
            Line::from(Span::styled(
                format!("    {}", reason),
                Style::default().fg(text_dim()),
            )),
        ];
        f.render_widget(Paragraph::new(notice).wrap(Wrap { trim: false }), rows[4]);
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.section {
        Section::Measurements => vec![
            ("↑↓", "Field"),
            ("Tab", "Model"),
            ("Enter", "Predict"),
            ("F1", "Help"),
            ("Esc", "Quit"),
        ],
        Section::Model => vec![
            ("←→", "Toggle"),
            ("Tab", "Fields"),
            ("Enter", "Predict"),
            ("?", "Help"),
            ("q", "Quit"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 50 { 3 } else { hints.len() };

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
        if area.width < 70 { 90 } else { 60 },
        if area.height < 30 { 90 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "═══ Form ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  ↑/↓       ", Style::default().fg(accent())),
            Span::raw("Move between measurement fields"),
        ]),
        Line::from(vec![
            Span::styled("  typing    ", Style::default().fg(accent())),
            Span::raw("Edit the focused field (any text is accepted)"),
        ]),
        Line::from(vec![
            Span::styled("  Backspace ", Style::default().fg(accent())),
            Span::raw("Delete the last character"),
        ]),
        Line::from(vec![
            Span::styled("  Tab       ", Style::default().fg(accent())),
            Span::raw("Switch between measurements and model"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "═══ Prediction ═══",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        )),
        Line::from(vec![
            Span::styled("  Enter     ", Style::default().fg(accent())),
            Span::raw("Send the measurements to the classifier"),
        ]),
        Line::from(vec![
            Span::styled("  ←/→ Space ", Style::default().fg(accent())),
            Span::raw("Toggle model (in the model section)"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::raw("  The backend is expected at "),
            Span::styled(crate::predict::PREDICT_URL, Style::default().fg(text_dim())),
            Span::raw("."),
        ]),
        Line::from(vec![
            Span::raw("  When it cannot be reached, a fallback result is shown"),
        ]),
        Line::from(vec![
            Span::raw("  and marked as fabricated."),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" ✿ ayame Help ", Style::default().fg(accent())))
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
