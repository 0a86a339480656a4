//! Help popup listing the dashboard's key bindings.

use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const POPUP_WIDTH: u16 = 52;
const POPUP_HEIGHT: u16 = 20;

const KEY_WIDTH: usize = 14;

struct Shortcut {
    key: &'static str,
    desc: &'static str,
}

struct Category {
    title: &'static str,
    shortcuts: &'static [Shortcut],
}

const SESSION: Category = Category {
    title: "SESSION",
    shortcuts: &[
        Shortcut {
            key: "l",
            desc: "Sign in with Microsoft",
        },
        Shortcut {
            key: "o",
            desc: "Sign out",
        },
    ],
};

const DASHBOARD: Category = Category {
    title: "DASHBOARD",
    shortcuts: &[
        Shortcut {
            key: "c",
            desc: "Call protected API",
        },
        Shortcut {
            key: "Up/Down",
            desc: "Scroll one line",
        },
        Shortcut {
            key: "PgUp/PgDn",
            desc: "Scroll one page",
        },
        Shortcut {
            key: "Home",
            desc: "Back to top",
        },
    ],
};

const GENERAL: Category = Category {
    title: "GENERAL",
    shortcuts: &[
        Shortcut {
            key: "?",
            desc: "Toggle this help",
        },
        Shortcut {
            key: "q / Esc",
            desc: "Quit",
        },
    ],
};

/// Render the help popup centered over the dashboard.
pub fn render_help_popup(frame: &mut Frame) {
    let area = frame.area();
    let popup_area = centered_rect(
        POPUP_WIDTH.min(area.width.saturating_sub(2)),
        POPUP_HEIGHT.min(area.height.saturating_sub(2)),
        area,
    );

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            " HELP ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ))
        .title_bottom(Line::from(Span::styled(
            " Press any key to close ",
            Style::default().fg(Color::Gray),
        )));

    let lines = build_lines(&[&SESSION, &DASHBOARD, &GENERAL]);
    frame.render_widget(Paragraph::new(lines).block(block), popup_area);
}

fn build_lines(categories: &[&Category]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for (idx, cat) in categories.iter().enumerate() {
        if idx > 0 {
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            format!(" {}", cat.title),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )));
        for sc in cat.shortcuts {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("   {:<width$}", sc.key, width = KEY_WIDTH),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled(sc.desc, Style::default().fg(Color::Gray)),
            ]));
        }
    }

    lines
}

/// Return a centered sub-rect of the given size within `area`.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect::new(x, y, width, height)
}
