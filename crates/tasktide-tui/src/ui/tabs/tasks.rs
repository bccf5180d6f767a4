use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use tasktide_core::models::{Task, TaskStatus};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);

    render_task_list(frame, app, chunks[0]);
    render_task_detail(frame, app, chunks[1]);
}

fn sort_indicator(app: &App, column: tasktide_core::models::TaskSortColumn) -> &'static str {
    if app.task_sort_column != column {
        ""
    } else if app.task_sort_ascending {
        " ▲"
    } else {
        " ▼"
    }
}

fn status_marker(task: &Task) -> &'static str {
    match task.status {
        TaskStatus::Completed => "[x]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Todo => "[ ]",
    }
}

fn render_task_list(frame: &mut Frame, app: &App, area: Rect) {
    use tasktide_core::models::TaskSortColumn as Col;

    let header = Row::new([
        Cell::from(""),
        Cell::from(format!("Title{}", sort_indicator(app, Col::Title))),
        Cell::from(format!("Due{}", sort_indicator(app, Col::DueDate))),
        Cell::from(format!("Priority{}", sort_indicator(app, Col::Priority))),
        Cell::from("Subject"),
    ])
    .style(styles::title_style())
    .height(1);

    let now = Utc::now();
    let sorted_tasks = app.get_sorted_tasks();

    let rows: Vec<Row> = sorted_tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let style = if i == app.task_selection {
                styles::selected_style()
            } else if task.is_completed() {
                styles::muted_style()
            } else {
                styles::list_item_style()
            };

            let due = match task.due_date {
                Some(due) => {
                    let text = due.format("%b %d").to_string();
                    if task.is_overdue(now) {
                        Cell::from(Span::styled(text, styles::error_style()))
                    } else {
                        Cell::from(text)
                    }
                }
                None => Cell::from("-"),
            };

            Row::new(vec![
                Cell::from(status_marker(task)),
                Cell::from(task.title.as_str()),
                due,
                Cell::from(Span::styled(
                    task.priority.to_string(),
                    styles::priority_style(task.priority),
                )),
                Cell::from(task.subject.as_deref().unwrap_or("-")),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Length(10),
        Constraint::Length(11),
        Constraint::Length(14),
    ];

    let hidden = if app.task_filter.hide_completed { ", done hidden" } else { "" };
    let sort_help = "[D]ue [p]riority [t]itle [c]reated";
    let title = format!(
        " Tasks ({}{}) - {} ",
        sorted_tasks.len(),
        hidden,
        sort_help
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .title_style(styles::muted_style())
                .borders(Borders::ALL)
                .border_style(styles::border_style(true)),
        )
        .row_highlight_style(styles::selected_style());

    let mut state = TableState::default();
    state.select(Some(app.task_selection));

    frame.render_stateful_widget(table, area, &mut state);
}

fn render_task_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Details ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let sorted_tasks = app.get_sorted_tasks();
    let Some(task) = sorted_tasks.get(app.task_selection).copied() else {
        let empty = Paragraph::new(vec![
            Line::from(Span::styled("No tasks", styles::muted_style())),
            Line::from(""),
            Line::from(vec![
                Span::styled("[a]", styles::help_key_style()),
                Span::styled(" add a task", styles::muted_style()),
            ]),
        ])
        .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = vec![
        Line::from(Span::styled(task.title.as_str(), styles::title_style())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Status:    ", styles::muted_style()),
            Span::raw(task.status.to_string()),
        ]),
        Line::from(vec![
            Span::styled("Priority:  ", styles::muted_style()),
            Span::styled(task.priority.to_string(), styles::priority_style(task.priority)),
        ]),
        Line::from(vec![
            Span::styled("Created:   ", styles::muted_style()),
            Span::raw(task.created_at.format("%b %d, %Y").to_string()),
        ]),
    ];
    if let Some(due) = task.due_date {
        lines.push(Line::from(vec![
            Span::styled("Due:       ", styles::muted_style()),
            Span::raw(due.format("%b %d, %Y %H:%M").to_string()),
        ]));
    }
    if let Some(done) = task.completed_at {
        lines.push(Line::from(vec![
            Span::styled("Completed: ", styles::muted_style()),
            Span::raw(done.format("%b %d, %Y").to_string()),
        ]));
    }
    if let Some(ref description) = task.description {
        lines.push(Line::from(""));
        lines.push(Line::from(description.as_str()));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("[Space]", styles::help_key_style()),
        Span::styled(" done  ", styles::muted_style()),
        Span::styled("[P]", styles::help_key_style()),
        Span::styled(" priority  ", styles::muted_style()),
        Span::styled("[f]", styles::help_key_style()),
        Span::styled(" focus", styles::muted_style()),
    ]));

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}
