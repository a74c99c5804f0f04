use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::app::App;
use crate::record::{SessionRecord, SessionType};

pub const EMPTY_HISTORY: &str = "No study sessions have been logged yet.";

/// Pure presenter for a single log row
pub fn present_row(record: &SessionRecord) -> Row<'static> {
    let type_style = match record.session_type {
        SessionType::Work => Style::default().fg(Color::Red),
        SessionType::Rest => Style::default().fg(Color::Green),
    };

    Row::new(vec![
        Cell::from(record.timestamp.clone()),
        Cell::from(record.module.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(record.session_type.to_string()).style(type_style),
        Cell::from(record.actual_minutes.to_string()),
        Cell::from(record.session_count.to_string()),
    ])
}

/// Render the study schedule: every logged record, oldest first.
pub fn render_history(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Records table
            Constraint::Length(2), // Instructions
        ])
        .split(area);

    let last = app
        .summary
        .last_logged
        .map(|d| format!(", last {}", d.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();
    let title = Paragraph::new(format!(
        "Study Schedule ({} records, {} work / {} rest{last})",
        app.history.len(),
        app.summary.work_sessions,
        app.summary.rest_sessions
    ))
    .block(Block::default().borders(Borders::ALL).title("History"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if app.history.is_empty() {
        app.history_state.scroll_offset = 0;
        let no_data = Paragraph::new(EMPTY_HISTORY)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let table_height = chunks[1].height.saturating_sub(3) as usize; // borders + header
        let max_scroll = app.history.len().saturating_sub(table_height);
        if app.history_state.scroll_offset > max_scroll {
            app.history_state.scroll_offset = max_scroll;
        }

        let header = Row::new(vec![
            Cell::from("Date"),
            Cell::from("Module"),
            Cell::from("Session Type"),
            Cell::from("Minutes"),
            Cell::from("Sessions"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible_rows: Vec<Row> = app
            .history
            .iter()
            .skip(app.history_state.scroll_offset)
            .take(table_height)
            .map(present_row)
            .collect();

        let widths = [
            Constraint::Length(19), // Date
            Constraint::Min(12),    // Module
            Constraint::Length(12), // Session Type
            Constraint::Length(8),  // Minutes
            Constraint::Length(8),  // Sessions
        ];

        let table = Table::new(visible_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Sessions"))
            .column_spacing(2);

        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home/End) jump  (v/b/esc) back  (q) quit",
    )
    .alignment(Alignment::Center)
    .wrap(ratatui::widgets::Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}
