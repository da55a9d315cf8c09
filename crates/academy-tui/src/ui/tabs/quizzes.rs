use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use academy_core::quiz::{format_score, TestOutcome};
use academy_core::utils::format_minutes;

use crate::app::{App, Focus, TestRun};
use crate::messages::Messages;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    render_test_list(frame, app, chunks[0]);
    render_test_detail(frame, app, chunks[1]);
}

fn render_test_list(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::List);
    let progress = app.selected_course().and_then(|c| app.course_progress(c.id));

    let header = Row::new(vec![Cell::from(""), Cell::from("Title"), Cell::from("Pass")])
        .style(styles::title_style())
        .height(1);

    let tests = app.selected_tests();
    let rows: Vec<Row> = tests
        .iter()
        .enumerate()
        .map(|(i, test)| {
            let style = if i == app.test_selection {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            let done = progress.is_some_and(|p| p.has_completed_test(test.id));
            Row::new(vec![
                Cell::from(if done { "✓" } else { "" }).style(styles::success_style()),
                Cell::from(test.title.as_str()),
                Cell::from(format!("{}%", test.passing_score)),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(2),
        Constraint::Fill(1),
        Constraint::Length(6),
    ];

    let title = match app.selected_course() {
        Some(course) => format!(" {} - tests ({}) ", course.title, tests.len()),
        None => " Tests ".to_string(),
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
    state.select(Some(app.test_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_test_detail(frame: &mut Frame, app: &App, area: Rect) {
    let focused = matches!(app.focus, Focus::Detail);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(focused));

    let lines = match app.selected_test() {
        Some(test) => {
            let mut lines = vec![
                Line::from(Span::styled(test.title.as_str(), styles::title_style())),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Passing score: ", styles::muted_style()),
                    Span::raw(format!("{}%", test.passing_score)),
                ]),
            ];
            if let Some(minutes) = test.time_limit {
                lines.push(Line::from(vec![
                    Span::styled("Time limit:    ", styles::muted_style()),
                    Span::raw(format_minutes(minutes)),
                ]));
            }
            if !test.description.trim().is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(test.description.as_str()));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(vec![
                Span::styled("[Enter]", styles::help_key_style()),
                Span::styled(" start the test", styles::muted_style()),
            ]));
            lines
        }
        None => vec![Line::from(Span::styled("No tests.", styles::muted_style()))],
    };

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Full-screen test runner: one question at a time with single-choice answers.
pub fn render_runner(frame: &mut Frame, run: &TestRun, messages: &Messages, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(run.test.title.as_str(), styles::title_style())),
        Line::from(Span::styled(
            format!(
                "Question {}/{}  -  answered {}/{}",
                run.question + 1,
                run.test.questions.len(),
                run.sheet.answered(),
                run.sheet.total()
            ),
            styles::muted_style(),
        )),
        Line::from(""),
    ];

    if let Some(question) = run.current_question() {
        lines.push(Line::from(Span::styled(
            question.text.as_str(),
            styles::highlight_style(),
        )));
        lines.push(Line::from(""));
        let selected = run.sheet.selected(question.id);
        for (i, answer) in question.answers.iter().enumerate() {
            let marker = if selected == Some(answer.id) { "(•) " } else { "( ) " };
            let style = if i == run.cursor {
                styles::selected_style()
            } else {
                styles::list_item_style()
            };
            lines.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(format!("{}{}", marker, answer.text), style),
            ]));
        }
    }

    if let Some(TestOutcome::Summary { passed, score }) = run.outcome {
        let (title, body) = if passed {
            (messages.passed_title, messages.passed_body)
        } else {
            (messages.failed_title, messages.failed_body)
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(title, styles::result_style(passed))));
        lines.push(Line::from(format!(
            "{}: {}",
            messages.your_score,
            format_score(score)
        )));
        lines.push(Line::from(body));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("↑/↓", styles::help_key_style()),
        Span::styled(" choose  ", styles::muted_style()),
        Span::styled("Space", styles::help_key_style()),
        Span::styled(" select  ", styles::muted_style()),
        Span::styled("←/→", styles::help_key_style()),
        Span::styled(" question  ", styles::muted_style()),
        Span::styled("s", styles::help_key_style()),
        Span::styled(" submit  ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" close", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}
