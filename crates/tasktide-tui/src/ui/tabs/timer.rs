use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use tasktide_core::pomodoro::SessionType;
use tasktide_core::utils::format_minutes;

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_countdown(frame, app, chunks[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(6)])
        .split(chunks[1]);
    render_settings(frame, app, right[0]);
    render_summary(frame, app, right[1]);
}

fn render_countdown(frame: &mut Frame, app: &App, area: Rect) {
    let state = &app.timer_state;
    let settings = app.timer_settings();

    let block = Block::default()
        .title(format!(" {} ", state.session_type.label()))
        .title_style(styles::session_style(state.session_type))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(1), // Countdown
            Constraint::Length(1),
            Constraint::Length(1), // Progress
            Constraint::Length(1),
            Constraint::Length(1), // Status
            Constraint::Length(1), // Keys
            Constraint::Min(1),
        ])
        .split(inner);

    let countdown = Paragraph::new(Line::from(Span::styled(
        state.countdown(),
        styles::session_style(state.session_type),
    )))
    .centered();
    frame.render_widget(countdown, chunks[1]);

    let total = settings.duration_seconds(state.session_type);
    let gauge = Gauge::default()
        .gauge_style(styles::session_style(state.session_type))
        .ratio(state.progress(total))
        .label("");
    frame.render_widget(gauge, chunks[3]);

    let status = if state.is_paused {
        Span::styled("Paused", styles::highlight_style())
    } else if state.is_active {
        Span::styled("Running", styles::success_style())
    } else {
        Span::styled("Ready", styles::muted_style())
    };
    let status_line = Line::from(vec![
        status,
        Span::styled(
            format!(
                "   Session {} of {}",
                state.session_count % settings.sessions_until_long_break.max(1) + 1,
                settings.sessions_until_long_break
            ),
            styles::muted_style(),
        ),
    ]);
    frame.render_widget(Paragraph::new(status_line).centered(), chunks[5]);

    let keys = if state.is_running() {
        "[p]ause  [x] stop  [n] skip"
    } else if state.is_paused {
        "[s] resume  [x] stop  [n] skip"
    } else {
        "[s]tart  [n] skip"
    };
    frame.render_widget(
        Paragraph::new(Span::styled(keys, styles::muted_style())).centered(),
        chunks[6],
    );
}

fn on_off(value: bool) -> Span<'static> {
    if value {
        Span::styled("on", styles::success_style())
    } else {
        Span::styled("off", styles::muted_style())
    }
}

fn render_settings(frame: &mut Frame, app: &App, area: Rect) {
    let settings = app.timer_settings();

    let lines = vec![
        Line::from(vec![
            Span::styled("Focus:        ", styles::muted_style()),
            Span::raw(format_minutes(settings.work_duration)),
            Span::styled("  [ / ]", styles::help_key_style()),
        ]),
        Line::from(vec![
            Span::styled("Short break:  ", styles::muted_style()),
            Span::raw(format_minutes(settings.short_break_duration)),
        ]),
        Line::from(vec![
            Span::styled("Long break:   ", styles::muted_style()),
            Span::raw(format_minutes(settings.long_break_duration)),
            Span::styled(
                format!(" every {}", settings.sessions_until_long_break),
                styles::muted_style(),
            ),
        ]),
        Line::from(vec![
            Span::styled("Auto breaks:  ", styles::muted_style()),
            on_off(settings.auto_start_breaks),
            Span::styled("  [b]", styles::help_key_style()),
        ]),
        Line::from(vec![
            Span::styled("Auto focus:   ", styles::muted_style()),
            on_off(settings.auto_start_work),
            Span::styled("  [w]", styles::help_key_style()),
        ]),
        Line::from(vec![
            Span::styled("Sound:        ", styles::muted_style()),
            on_off(settings.sound_enabled),
            Span::styled("  [m]", styles::help_key_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Settings ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_summary(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Productivity ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(ref summary) = app.summary else {
        let loading = Paragraph::new(Span::styled("Loading...", styles::muted_style())).block(block);
        frame.render_widget(loading, area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Focus time:   ", styles::muted_style()),
            Span::raw(format_minutes(summary.total_focus_minutes)),
        ]),
        Line::from(vec![
            Span::styled("Sessions:     ", styles::muted_style()),
            Span::raw(format!(
                "{} done, {} skipped, {} stopped",
                summary.completed_work_sessions, summary.skipped_sessions, summary.stopped_sessions
            )),
        ]),
        Line::from(vec![
            Span::styled("Tasks done:   ", styles::muted_style()),
            Span::raw(format!("{:.0}%", summary.task_completion_rate * 100.0)),
        ]),
        Line::from(vec![
            Span::styled("Streak:       ", styles::muted_style()),
            Span::raw(format!("{} days", summary.current_streak_days)),
        ]),
        Line::from(""),
    ];

    // One bar per day, scaled to the busiest day
    let max = summary
        .last_seven_days
        .iter()
        .map(|d| d.minutes)
        .max()
        .unwrap_or(0)
        .max(1);
    for day in &summary.last_seven_days {
        let width = (day.minutes * 20 / max) as usize;
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", day.date.format("%a")), styles::muted_style()),
            Span::styled("█".repeat(width), styles::session_style(SessionType::Work)),
            Span::styled(format!(" {}", format_minutes(day.minutes)), styles::muted_style()),
        ]));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
