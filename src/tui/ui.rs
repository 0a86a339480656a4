//! UI rendering for the TUI

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use super::app::App;
use super::help;
use crate::auth::AuthState;
use crate::models::IdentitySummary;
use crate::views::{self, Row, Section};

const TITLE: &str = " Secure Dashboard";

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Layout: header (1 line) + dashboard + status bar (1 line)
    let [header_area, body_area, status_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(header_area, frame.buffer_mut(), app);
    render_body(body_area, frame.buffer_mut(), app);
    render_status(status_area, frame.buffer_mut(), app);

    if app.show_help {
        help::render_help_popup(frame);
    }
}

/// Render the header bar
fn render_header(area: Rect, buf: &mut Buffer, app: &App) {
    let title = Span::styled(
        TITLE,
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::BOLD),
    );

    let help_indicator = Span::styled(" [?] Help ", Style::default().fg(Color::Gray));

    let (user, user_color) = match &app.auth {
        AuthState::Authenticated(account) => {
            (IdentitySummary::project(Some(account)).name, Color::Cyan)
        }
        AuthState::Authenticating { .. } => ("signing in...".to_string(), Color::Yellow),
        AuthState::Unauthenticated { .. } => ("not signed in".to_string(), Color::Gray),
    };
    let user_label = format!(" {} ", user);

    // Right-align the help hint and user name
    let right_width = " [?] Help ".width() + user_label.width();
    let padding_width = (area.width as usize).saturating_sub(TITLE.width() + right_width);
    let padding = Span::raw(" ".repeat(padding_width));

    let header_line = Line::from(vec![
        title,
        padding,
        help_indicator,
        Span::styled(user_label, Style::default().fg(user_color)),
    ]);

    Paragraph::new(header_line)
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}

/// Render the composed dashboard sections, scrolled by `app.scroll`.
fn render_body(area: Rect, buf: &mut Buffer, app: &App) {
    let sections = views::compose(&app.auth, &app.api);
    let lines = section_lines(&sections);

    let max_scroll = lines.len().saturating_sub(1) as u16;
    Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll.min(max_scroll), 0))
        .render(area, buf);
}

fn section_lines(sections: &[Section]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for section in sections {
        lines.push(Line::from(Span::styled(
            format!(" {}", section.title),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!(" {}", section.description),
            Style::default().fg(Color::Gray),
        )));

        for card in &section.cards {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("   \u{2502} {}", card.title),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.extend(card.rows.iter().map(row_line));
        }
        lines.push(Line::from(""));
    }

    lines
}

fn row_line(row: &Row) -> Line<'static> {
    const INDENT: &str = "   \u{2502}   ";
    let indent = Span::styled(INDENT, Style::default().fg(Color::DarkGray));

    let content = match row {
        Row::Field { label, value } => {
            return Line::from(vec![
                indent,
                Span::styled(format!("{}: ", label), Style::default().fg(Color::Gray)),
                Span::styled(value.clone(), Style::default().fg(Color::White)),
            ]);
        }
        Row::Text(text) => Span::styled(text.clone(), Style::default().fg(Color::White)),
        Row::Muted(text) => Span::styled(text.clone(), Style::default().fg(Color::Gray)),
        Row::Action(text) => Span::styled(
            text.clone(),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Row::Code(line) => Span::styled(line.clone(), Style::default().fg(Color::Green)),
        Row::Error(msg) => Span::styled(msg.clone(), Style::default().fg(Color::Red)),
    };

    Line::from(vec![indent, content])
}

/// Render the status bar
fn render_status(area: Rect, buf: &mut Buffer, app: &App) {
    // If there's a status message, show it prominently.
    if let Some(ref msg) = app.status_message {
        let style = if app.status_is_error {
            Style::default().fg(Color::Red).bg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green).bg(Color::DarkGray)
        };
        let line = Line::from(Span::styled(format!(" {} ", msg), style));
        Paragraph::new(line)
            .style(Style::default().bg(Color::DarkGray))
            .render(area, buf);
        return;
    }

    let sep_style = Style::default().fg(Color::Gray);
    let hint_style = Style::default().fg(Color::Yellow);

    let hints: &[&str] = match &app.auth {
        AuthState::Authenticated(_) => &["c: call API", "o: sign out"],
        AuthState::Authenticating { .. } => &[],
        AuthState::Unauthenticated { .. } => &["l: sign in"],
    };

    let mut spans = vec![Span::styled(
        format!(" {} ", app.endpoint),
        Style::default().fg(Color::Cyan),
    )];
    for hint in hints.iter().chain(["?: help", "q: quit"].iter()) {
        spans.push(Span::styled(" | ", sep_style));
        spans.push(Span::styled(*hint, hint_style));
    }

    Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray))
        .render(area, buf);
}
