use std::time::Instant;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};

use academy_core::models::Course;
use academy_core::utils::{format_date, format_optional, truncate_string};

use crate::app::{active_section, App, CourseSection, Focus};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_course_list(frame, app, chunks[0]);
    render_course_detail(frame, app, chunks[1]);
}

fn render_course_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);

    let header = Row::new(vec![
        Cell::from("Title"),
        Cell::from("Lang"),
        Cell::from("Items"),
        Cell::from("Done"),
    ])
    .style(styles::title_style())
    .height(1);

    let courses = app.filtered_courses();

    let rows: Vec<Row> = courses
        .iter()
        .enumerate()
        .map(|(i, course)| {
            let style = if i == app.course_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let done = app
                .course_percentage(course)
                .map(|p| format!("{}%", p))
                .unwrap_or_else(|| "-".to_string());

            Row::new(vec![
                Cell::from(course.title.as_str()),
                Cell::from(format_optional(course.language.as_deref(), "-")),
                Cell::from(course.total_items().to_string()),
                Cell::from(done),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(6),
    ];

    let title = if app.course_filter.is_empty() {
        format!(" Courses ({}) ", app.courses.len())
    } else {
        format!(
            " Courses ({}/{}) - \"{}\" ",
            courses.len(),
            app.courses.len(),
            app.course_filter
        )
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.course_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

/// Lines of the course detail panel and the line each section starts on.
pub fn detail_lines<'a>(app: &'a App, course: &'a Course) -> (Vec<Line<'a>>, Vec<(CourseSection, u16)>) {
    let mut lines: Vec<Line> = Vec::new();
    let mut tops = Vec::new();

    // Overview
    tops.push((CourseSection::Overview, lines.len() as u16));
    lines.push(Line::from(Span::styled(course.title.as_str(), styles::title_style())));
    lines.push(Line::from(""));
    if let Some(ref author) = course.author_name {
        lines.push(Line::from(vec![
            Span::styled("Author:   ", styles::muted_style()),
            Span::raw(author.as_str()),
        ]));
    }
    if let Some(language) = course.language_display.as_deref().or(course.language.as_deref()) {
        lines.push(Line::from(vec![
            Span::styled("Language: ", styles::muted_style()),
            Span::raw(language),
        ]));
    }
    if let Some(ref created) = course.created_at {
        lines.push(Line::from(vec![
            Span::styled("Created:  ", styles::muted_style()),
            Span::raw(format_date(created)),
        ]));
    }
    lines.push(Line::from(vec![
        Span::styled("Contents: ", styles::muted_style()),
        Span::raw(format!(
            "{} materials, {} tests",
            course.materials_count, course.tests_count
        )),
    ]));
    if !course.description.trim().is_empty() {
        lines.push(Line::from(""));
        for line in course.description.lines() {
            lines.push(Line::from(line));
        }
    }
    lines.push(Line::from(""));

    let progress = app.course_progress(course.id);

    // Materials
    tops.push((CourseSection::Materials, lines.len() as u16));
    lines.push(Line::from(Span::styled("Materials", styles::highlight_style())));
    match app.materials.get(&course.id) {
        Some(materials) if !materials.is_empty() => {
            for material in materials {
                let done = progress.is_some_and(|p| p.has_completed_material(material.id));
                lines.push(Line::from(vec![
                    completion_mark(done),
                    Span::styled(
                        format!("[{}] ", material.material_type.label()),
                        styles::muted_style(),
                    ),
                    Span::raw(truncate_string(&material.name, 60)),
                ]));
            }
        }
        Some(_) => lines.push(Line::from(Span::styled("  No materials", styles::muted_style()))),
        None => lines.push(Line::from(Span::styled("  Loading...", styles::muted_style()))),
    }
    lines.push(Line::from(""));

    // Tests
    tops.push((CourseSection::Tests, lines.len() as u16));
    lines.push(Line::from(Span::styled("Tests", styles::highlight_style())));
    match app.tests.get(&course.id) {
        Some(tests) if !tests.is_empty() => {
            for test in tests {
                let done = progress.is_some_and(|p| p.has_completed_test(test.id));
                lines.push(Line::from(vec![
                    completion_mark(done),
                    Span::raw(test.title.as_str()),
                    Span::styled(
                        format!("  (pass {}%)", test.passing_score),
                        styles::muted_style(),
                    ),
                ]));
            }
        }
        Some(_) => lines.push(Line::from(Span::styled("  No tests", styles::muted_style()))),
        None => lines.push(Line::from(Span::styled("  Loading...", styles::muted_style()))),
    }

    (lines, tops)
}

fn completion_mark(done: bool) -> Span<'static> {
    if done {
        Span::styled("  ✓ ", styles::success_style())
    } else {
        Span::styled("  · ", styles::muted_style())
    }
}

fn render_course_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);

    let Some(course) = app.selected_course() else {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(styles::border_style(focused));
        let text = if app.courses.is_empty() {
            "No courses loaded. Press [u] to update."
        } else {
            "No courses match the search."
        };
        let paragraph = Paragraph::new(Span::styled(text, styles::muted_style())).block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    // Progress gauge
    let gauge_block = Block::default()
        .title(" Progress ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));
    match app.displayed_percentage(course, Instant::now()) {
        Some(percent) => {
            let gauge = Gauge::default()
                .block(gauge_block)
                .gauge_style(styles::gauge_style())
                .percent(percent.min(100))
                .label(format!("{}%", percent));
            frame.render_widget(gauge, chunks[0]);
        }
        None => {
            let paragraph =
                Paragraph::new(Span::styled("no progress yet", styles::muted_style())).block(gauge_block);
            frame.render_widget(paragraph, chunks[0]);
        }
    }

    // Sections
    let (lines, tops) = detail_lines(app, course);
    let section_hints: Vec<Span> = tops
        .iter()
        .map(|(section, _)| {
            let label = format!(" {} ", section.title());
            if Some(*section) == active_section(&tops, app.course_scroll) {
                Span::styled(label, styles::tab_style(true))
            } else {
                Span::styled(label, styles::muted_style())
            }
        })
        .collect();

    let block = Block::default()
        .title(Line::from(section_hints))
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let paragraph = Paragraph::new(lines)
        .block(block)
        .scroll((app.course_scroll, 0));
    frame.render_widget(paragraph, chunks[1]);
}
