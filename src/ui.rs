use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, AppState, Prompt},
    library::TextEntry,
    render::{CharClass, RenderModel},
};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match (self.state, self.render_model()) {
            (AppState::Typing, Some(model)) => render_typing(self, &model, area, buf),
            _ => render_home(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn class_style(class: CharClass) -> Style {
    match class {
        CharClass::Matched => bold().fg(Color::Green),
        CharClass::Mismatched => bold().fg(Color::Red),
        CharClass::Active => dim_bold().add_modifier(Modifier::UNDERLINED),
        CharClass::Pending => dim_bold(),
    }
}

/// Spans for the page text. A mistyped space would be invisible, so it
/// shows as a middle dot.
pub fn page_spans(model: &RenderModel) -> Vec<Span<'static>> {
    model
        .runs()
        .into_iter()
        .map(|(class, text)| {
            let text = if class == CharClass::Mismatched {
                text.replace(' ', "·")
            } else {
                text
            };
            Span::styled(text, class_style(class))
        })
        .collect()
}

fn footer_line(app: &App, legend: &str) -> Line<'static> {
    let italic = Style::default().add_modifier(Modifier::ITALIC);
    match (&app.prompt, &app.notice) {
        (Prompt::GoToPage(input), _) => Line::from(vec![
            Span::styled("Go to page: ", bold()),
            Span::raw(input.clone()),
            Span::styled("_", dim_bold()),
        ]),
        (Prompt::ConfirmReset, _) => Line::from(Span::styled(
            "Reset all progress for this text and start over? (y/n)",
            bold().fg(Color::Yellow),
        )),
        (Prompt::ConfirmDelete(name), _) => Line::from(Span::styled(
            format!("Delete \"{name}\" and its progress? (y/n)"),
            bold().fg(Color::Yellow),
        )),
        (Prompt::None, Some(notice)) => {
            Line::from(Span::styled(notice.clone(), bold().fg(Color::Yellow)))
        }
        (Prompt::None, None) => Line::from(Span::styled(legend.to_string(), italic)),
    }
}

fn render_typing(app: &App, model: &RenderModel, area: Rect, buf: &mut Buffer) {
    let show_illustration = model.illustration.is_some();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // padding
            Constraint::Min(1),    // page text
            Constraint::Length(1), // stats
            Constraint::Length(if show_illustration { 1 } else { 0 }),
            Constraint::Length(1), // footer
        ])
        .split(area);

    let title = Line::from(vec![
        Span::styled(model.key.clone(), bold()),
        Span::raw("  "),
        Span::styled(model.page_label(), dim_bold()),
    ]);
    Paragraph::new(title).render(chunks[0], buf);

    Paragraph::new(Line::from(page_spans(model)))
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    Paragraph::new(Span::styled(model.status_line(), bold()))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);

    if let Some(illustration) = &model.illustration {
        Paragraph::new(Span::styled(
            format!("Illustration: {}", illustration.url),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[4], buf);
    }

    let legend = if show_illustration {
        "(esc) home / (ctrl+g) go to page / (ctrl+r) reset / (ctrl+o) illustration"
    } else {
        "(esc) home / (ctrl+g) go to page / (ctrl+r) reset"
    };
    Paragraph::new(footer_line(app, legend)).render(chunks[5], buf);
}

fn entry_line(entry: &TextEntry, name_width: usize, selected: bool) -> Line<'static> {
    let marker = if selected { "> " } else { "  " };
    let padding = " ".repeat(name_width.saturating_sub(entry.name.width()) + 2);
    let updated = entry
        .updated_at
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();

    let name_style = if selected {
        bold().add_modifier(Modifier::REVERSED)
    } else {
        bold()
    };

    Line::from(vec![
        Span::raw(marker),
        Span::styled(entry.name.clone(), name_style),
        Span::raw(padding),
        Span::styled(format!("{:<14}", entry.progress_label()), dim_bold()),
        Span::styled(updated, Style::default().add_modifier(Modifier::DIM)),
    ])
}

fn render_home(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Length(1), // title
            Constraint::Length(1), // padding
            Constraint::Min(1),    // saved texts
            Constraint::Length(1), // footer
        ])
        .split(area);

    Paragraph::new(Span::styled("retype - saved texts", bold()))
        .render(chunks[0], buf);

    if app.entries.is_empty() {
        Paragraph::new(Span::styled(
            "Nothing saved yet. Run `retype <FILE>` to import a text.",
            dim_bold(),
        ))
        .wrap(Wrap { trim: true })
        .render(chunks[2], buf);
    } else {
        let rows = chunks[2].height.max(1) as usize;
        let offset = app.selected.saturating_sub(rows - 1);
        let name_width = app
            .entries
            .iter()
            .map(|e| e.name.width())
            .max()
            .unwrap_or(0);

        let lines: Vec<Line> = app
            .entries
            .iter()
            .enumerate()
            .skip(offset)
            .take(rows)
            .map(|(idx, entry)| entry_line(entry, name_width, idx == app.selected))
            .collect();
        Paragraph::new(lines).render(chunks[2], buf);
    }

    Paragraph::new(footer_line(
        app,
        "(enter) open / (up/down) select / (d)elete / (q)uit",
    ))
    .render(chunks[3], buf);
}
