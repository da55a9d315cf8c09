use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use academy_core::quiz::format_score;
use academy_core::utils::{format_date, format_optional};

use crate::app::{App, Focus};
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    render_certificate_list(frame, app, chunks[0]);
    render_certificate_detail(frame, app, chunks[1]);
}

fn render_certificate_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);

    let header = Row::new(vec![
        Cell::from("Course"),
        Cell::from("Score"),
        Cell::from("Issued"),
    ])
    .style(styles::title_style())
    .height(1);

    let rows: Vec<Row> = app
        .certificates
        .iter()
        .enumerate()
        .map(|(i, certificate)| {
            let style = if i == app.certificate_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            Row::new(vec![
                Cell::from(certificate.course_display()),
                Cell::from(format_score(certificate.score)),
                Cell::from(
                    certificate
                        .issued_at
                        .as_ref()
                        .map(format_date)
                        .unwrap_or_default(),
                ),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Fill(1),
        Constraint::Length(8),
        Constraint::Length(14),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(" Certificates ({}) ", app.certificates.len()))
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(focused)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.certificate_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_certificate_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let lines = match app.selected_certificate() {
        Some(certificate) => vec![
            Line::from(Span::styled(certificate.course_display(), styles::title_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("Certificate: ", styles::muted_style()),
                Span::raw(certificate.certificate_id.as_str()),
            ]),
            Line::from(vec![
                Span::styled("Holder:      ", styles::muted_style()),
                Span::raw(format_optional(certificate.user_name.as_deref(), "-")),
            ]),
            Line::from(vec![
                Span::styled("Score:       ", styles::muted_style()),
                Span::raw(format_score(certificate.score)),
            ]),
            Line::from(""),
            Line::from(Span::styled("Page", styles::highlight_style())),
            Line::from(app.certificate_url(&certificate.certificate_id)),
        ],
        None => vec![Line::from(Span::styled(
            "No certificates yet. Pass a test to earn one.",
            styles::muted_style(),
        ))],
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
