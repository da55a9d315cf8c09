use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, LoginFocus, Tab};

use super::styles;
use super::tabs::{certificates, courses, materials, quizzes};

const LOGO: [&str; 3] = [
    "     ╔═╗╔═╗╔═╗╔╦╗╔═╗╔╦╗╦ ╦",
    "     ╠═╣║  ╠═╣ ║║║╣ ║║║╚╦╝",
    "     ╩ ╩╚═╝╩ ╩═╩╝╚═╝╩ ╩ ╩ ",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Length(3), // Tabs
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_tabs(frame, app, chunks[1]);
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    match app.state {
        AppState::ShowingHelp => render_help_overlay(frame),
        AppState::LoggingIn => render_login_overlay(frame, app),
        AppState::ConfirmingQuit => render_quit_overlay(frame),
        AppState::Commenting => render_comment_overlay(frame, app),
        AppState::TakingTest | AppState::ShowingAlert => {
            if let Some(ref run) = app.test_run {
                frame.render_widget(Clear, chunks[2]);
                quizzes::render_runner(frame, run, app.messages, chunks[2]);
            }
            if matches!(app.state, AppState::ShowingAlert) {
                render_alert_overlay(frame, app);
            }
        }
        AppState::Normal | AppState::Searching | AppState::Quitting => {}
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Academy";
    let help_hint = "[?] Help";
    let host = app.api.base_url().host_str().unwrap_or_default().to_string();

    let used = title.len() + help_hint.len() + host.len() + 6;
    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::styled(format!("  {}", host), styles::muted_style()),
        Span::raw(" ".repeat((area.width as usize).saturating_sub(used))),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let tabs = [Tab::Courses, Tab::Materials, Tab::Tests, Tab::Certificates];

    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in tabs.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", styles::muted_style()));
        }
        let label = format!("[{}] {}", i + 1, tab.title());
        if *tab == app.current_tab {
            spans.push(Span::styled(label, styles::tab_style(true)));
        } else {
            spans.push(Span::styled(label, styles::muted_style()));
        }
    }

    // Course context on the right for the course-scoped tabs
    if matches!(app.current_tab, Tab::Materials | Tab::Tests) {
        if let Some(course) = app.selected_course() {
            let main_width: usize = spans.iter().map(|s| s.content.chars().count()).sum();
            let context = format!("course: {}", course.title);
            let padding = (area.width as usize)
                .saturating_sub(main_width + context.chars().count() + 2);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::styled(context, styles::highlight_style()));
        }
    }

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    match app.current_tab {
        Tab::Courses => courses::render(frame, app, area),
        Tab::Materials => materials::render(frame, app, area),
        Tab::Tests => quizzes::render(frame, app, area),
        Tab::Certificates => certificates::render(frame, app, area),
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let now = Instant::now();

    if matches!(app.state, AppState::Searching) {
        let invalid = app.is_search_invalid(now);
        let submit_style = if app.can_submit_search() {
            styles::help_key_style()
        } else {
            styles::muted_style()
        };
        let mut spans = vec![
            Span::styled(" Search: ", styles::muted_style()),
            Span::styled(format!("{}▌", app.search_input), styles::search_style(invalid)),
            Span::raw("  "),
            Span::styled("[Enter]", submit_style),
            Span::styled(" search  [Esc] clear", styles::muted_style()),
        ];
        if invalid {
            spans.push(Span::styled(
                format!("  {}", app.messages.search_empty),
                styles::error_style(),
            ));
        }
        let paragraph = Paragraph::new(Line::from(spans)).style(styles::status_bar_style());
        frame.render_widget(paragraph, area);
        return;
    }

    let shortcuts = "[/]search | [u]pdate | [L]ogout | [q]uit";
    let (left_text, left_style) = match app.status {
        Some(ref status) if status.is_error => (format!(" {} ", status.text), styles::error_style()),
        Some(ref status) => (format!(" {} ", status.text), styles::highlight_style()),
        None => match app.last_updated {
            Some(ref age) => (format!(" Updated {} ", age), styles::muted_style()),
            None => (" Not updated yet ".to_string(), styles::muted_style()),
        },
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|line| Line::from(Span::styled(*line, styles::title_style())))
        .collect()
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 31, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let mut help_text = logo_lines();
    help_text.extend([
        Line::from(Span::styled(
            format!("              version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        help_line("1-4", "Switch tabs"),
        help_line("←/→", "Prev/next tab"),
        help_line("Tab", "Switch focus (list ↔ detail)"),
        help_line("↑/↓", "Navigate list or scroll"),
        help_line("O/M/T", "Jump to course section"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("/", "Search courses"),
        help_line("u", "Update data"),
        help_line("e", "Enroll in course"),
        help_line("c", "Mark material completed"),
        help_line("n / r", "Comment / reply"),
        help_line("Enter", "Start test"),
        help_line("L", "Log out"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled(" Test runner", styles::highlight_style())),
        help_line("Space", "Select answer"),
        help_line("←/→", "Previous/next question"),
        help_line("s", "Submit answers"),
        Line::from(""),
        Line::from(vec![
            Span::styled("       Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 14 } else { 12 };
    let area = centered_rect_fixed(46, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));

    // Username field
    let username_focused = app.login_focus == LoginFocus::Username;
    let username_style = if username_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let username_display = format!("{:<16}", app.login_username);
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(format!("{}{}", username_display, cursor), username_style),
        Span::styled("]", styles::muted_style()),
    ]));

    // Password field
    let password_focused = app.login_focus == LoginFocus::Password;
    let password_style = if password_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let password_masked: String = "*".repeat(app.login_password.chars().count().min(16));
    let password_display = format!("{:<16}", password_masked);
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(format!("{}{}", password_display, cursor), password_style),
        Span::styled("]", styles::muted_style()),
    ]));

    // Login button
    let button_focused = app.login_focus == LoginFocus::Button;
    let button_style = if button_focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    };
    let button_label = if button_focused { " ▶ Login ◀ " } else { "   Login   " };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("            ["),
        Span::styled(button_label, button_style),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_comment_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(64, 12, frame.area());
    frame.render_widget(Clear, area);

    let title = match app.reply_to {
        Some(parent) => format!(" Reply to comment #{} ", parent),
        None => " New comment ".to_string(),
    };

    let lines = vec![
        Line::from(Span::styled(
            format!("{}▌", app.comment_draft),
            styles::list_item_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("[Enter]", styles::help_key_style()),
            Span::styled(" post  ", styles::muted_style()),
            Span::styled("[Esc]", styles::help_key_style()),
            Span::styled(" cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_alert_overlay(frame: &mut Frame, app: &App) {
    let area = centered_rect_fixed(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!(" {}", app.alert.as_deref().unwrap_or_default()),
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(Span::styled("   Press any key", styles::muted_style())),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::error_style())
        .style(Style::default());

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 10, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.extend([
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        assert_eq!(centered_rect_fixed(46, 10, outer), Rect::new(27, 15, 46, 10));

        let small = Rect::new(0, 0, 20, 5);
        assert_eq!(centered_rect_fixed(46, 10, small), Rect::new(0, 0, 20, 5));
    }
}
