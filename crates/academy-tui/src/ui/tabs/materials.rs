use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use academy_core::utils::{format_datetime, single_line};

use crate::app::{App, Focus};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_material_list(frame, app, chunks[0]);
    render_material_detail(frame, app, chunks[1]);
}

fn render_material_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);
    let progress = app.selected_course().and_then(|c| app.course_progress(c.id));

    let header = Row::new(vec![
        Cell::from(""),
        Cell::from("Type"),
        Cell::from("Name"),
        Cell::from("Comments"),
    ])
    .style(styles::title_style())
    .height(1);

    let materials = app.selected_materials();
    let rows: Vec<Row> = materials
        .iter()
        .enumerate()
        .map(|(i, material)| {
            let style = if i == app.material_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let done = progress.is_some_and(|p| p.has_completed_material(material.id));
            let type_cell = if material.is_video() {
                Cell::from(Span::styled("[video]", styles::highlight_style()))
            } else {
                Cell::from(material.material_type.label())
            };

            Row::new(vec![
                Cell::from(if done { "✓" } else { "" }).style(styles::success_style()),
                type_cell,
                Cell::from(material.name.as_str()),
                Cell::from(material.comments_count.to_string()),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Length(10),
        Constraint::Fill(1),
        Constraint::Length(9),
    ];

    let title = match app.selected_course() {
        Some(course) => format!(" {} - materials ({}) ", course.title, materials.len()),
        None => " Materials ".to_string(),
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
    state.select(Some(app.material_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_material_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);
    let block = Block::default()
        .title(" [c] complete  [n] comment  [r] reply ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let Some(material) = app.selected_material() else {
        let text = if app.selected_course().is_none() {
            "Select a course on the Courses tab."
        } else {
            "No materials."
        };
        frame.render_widget(
            Paragraph::new(Span::styled(text, styles::muted_style())).block(block),
            area,
        );
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(material.name.as_str(), styles::title_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Type:     ", styles::muted_style()),
            Span::raw(
                material
                    .material_type_display
                    .clone()
                    .unwrap_or_else(|| material.material_type.label().to_string()),
            ),
        ]),
    ];
    if let Some(ref author) = material.author_name {
        lines.push(Line::from(vec![
            Span::styled("Author:   ", styles::muted_style()),
            Span::raw(author.as_str()),
        ]));
    }
    if let Some(ref file) = material.file {
        lines.push(Line::from(vec![
            Span::styled("File:     ", styles::muted_style()),
            Span::raw(file.as_str()),
        ]));
    }
    if !material.description.trim().is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(material.description.as_str()));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Comments", styles::highlight_style())));

    let comments = app.selected_comments();
    if comments.is_empty() {
        let text = if app.comments.contains_key(&material.id) {
            "  No comments yet"
        } else {
            "  Loading..."
        };
        lines.push(Line::from(Span::styled(text, styles::muted_style())));
    }
    for (i, (depth, comment)) in comments.iter().enumerate() {
        let indent = "  ".repeat(depth + 1);
        let header_style = if focused && i == app.comment_selection {
            styles::selected_style()
        } else {
            styles::muted_style()
        };
        let when = comment
            .created_at
            .as_ref()
            .map(format_datetime)
            .unwrap_or_default();
        lines.push(Line::from(vec![
            Span::raw(indent.clone()),
            Span::styled(
                format!(
                    "{} {}",
                    comment.author_name.as_deref().unwrap_or("anonymous"),
                    when
                ),
                header_style,
            ),
        ]));
        lines.push(Line::from(vec![
            Span::raw(indent),
            Span::raw(single_line(&comment.content)),
        ]));
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
