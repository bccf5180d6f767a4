use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use tasktide_core::cache::CacheCategory;

use crate::app::App;
use crate::ui::styles;

fn ttl_label(category: CacheCategory) -> String {
    let ttl = category.default_ttl();
    if ttl.num_hours() >= 1 {
        format!("{}h", ttl.num_hours())
    } else {
        format!("{}m", ttl.num_minutes())
    }
}

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let stats = &app.cache_stats;

    let mut lines = vec![
        Line::from(Span::styled("Entries", styles::highlight_style())),
        Line::from(vec![
            Span::styled("  Memory:      ", styles::muted_style()),
            Span::raw(stats.memory_entries.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  Persistent:  ", styles::muted_style()),
            Span::raw(stats.persistent_entries.to_string()),
        ]),
        Line::from(vec![
            Span::styled("  In flight:   ", styles::muted_style()),
            Span::raw(stats.in_flight.to_string()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Sweep every ", styles::highlight_style()),
            Span::raw(format!("{}s", app.config.sweep_interval().as_secs())),
        ]),
    ];

    match app.last_sweep {
        Some(report) => lines.push(Line::from(vec![
            Span::styled("  Last manual sweep: ", styles::muted_style()),
            Span::raw(format!(
                "{} memory, {} persistent, {} corrupted",
                report.memory_removed, report.persistent_removed, report.corrupted_removed
            )),
        ])),
        None => lines.push(Line::from(Span::styled(
            "  No manual sweep yet",
            styles::muted_style(),
        ))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Time to live", styles::highlight_style())));
    for category in CacheCategory::ALL {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<14}", category.prefix()), styles::muted_style()),
            Span::raw(ttl_label(category)),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("[e]", styles::help_key_style()),
        Span::styled(" sweep expired  ", styles::muted_style()),
        Span::styled("[C]", styles::help_key_style()),
        Span::styled(" clear everything", styles::muted_style()),
    ]));

    let block = Block::default()
        .title(" Cache ")
        .title_style(styles::muted_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
