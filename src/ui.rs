pub mod charting;
pub mod dashboard;
pub mod history;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};

use crate::app::{App, Field, Mode, NEW_MODULE_LABEL};
use crate::record::SessionType;
use crate::timer::{Notice, TimerStatus};
use crate::ui::charting::format_clock;
use crate::ui::dashboard::StudyChart;

const HORIZONTAL_MARGIN: u16 = 2;
const VERTICAL_MARGIN: u16 = 1;

fn phase_color(phase: SessionType) -> Color {
    match phase {
        SessionType::Work => Color::Red,
        SessionType::Rest => Color::Green,
    }
}

fn notice_style(notice: &Notice) -> Style {
    let color = match notice {
        Notice::Info(_) => Color::Cyan,
        Notice::Success(_) => Color::Green,
        Notice::Warning(_) => Color::Yellow,
        Notice::Error(_) => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // header
                Constraint::Length(6), // form + clock
                Constraint::Length(1), // notices
                Constraint::Min(3),    // chart
                Constraint::Length(1), // legend
            ])
            .split(area);

        self.render_header(chunks[0], buf);

        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);
        self.render_form(top[0], buf);
        self.render_clock(top[1], buf);

        let notices: Vec<Span> = self
            .notices
            .iter()
            .flat_map(|n| [Span::styled(n.text().to_string(), notice_style(n)), Span::raw("  ")])
            .collect();
        Paragraph::new(Line::from(notices))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        StudyChart::new(&self.summary).render(chunks[3], buf);

        let legend = match self.mode {
            Mode::EditingModule => "type a module name  (enter) confirm  (esc) cancel",
            Mode::Normal => {
                "(s)tart  (p)ause/resume  (x) stop  (r)eset  (a)dd module  (v)iew schedule  (C)lear history  (q)uit"
            }
        };
        Paragraph::new(Span::styled(
            legend,
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .wrap(Wrap { trim: true })
        .render(chunks[4], buf);
    }
}

impl App {
    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let status_color = match self.timer.status() {
            TimerStatus::Idle => Color::Gray,
            TimerStatus::Running => phase_color(self.timer.phase()),
            TimerStatus::Paused => Color::Yellow,
        };
        Paragraph::new(Line::from(vec![
            Span::styled(
                "tomatick",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                self.timer.status().to_string(),
                Style::default().fg(status_color),
            ),
        ]))
        .render(area, buf);
    }

    fn render_form(&self, area: Rect, buf: &mut Buffer) {
        let settings = self.timer.settings();
        let module = if self.is_new_module_selected() {
            match self.mode {
                Mode::EditingModule => format!("{}▏", self.new_module),
                Mode::Normal if self.new_module.is_empty() => NEW_MODULE_LABEL.to_string(),
                Mode::Normal => format!("{} (new)", self.new_module),
            }
        } else {
            self.selected_module()
        };

        let rows = [
            (Field::Module, "Module", module),
            (
                Field::Work,
                "Work",
                format!("{} min", settings.work_minutes),
            ),
            (
                Field::Rest,
                "Rest",
                format!("{} min", settings.rest_minutes),
            ),
            (
                Field::Sessions,
                "Sessions",
                settings.target_sessions.to_string(),
            ),
        ];

        let locked = !self.timer.is_idle();
        let lines: Vec<Line> = rows
            .into_iter()
            .map(|(field, label, value)| {
                let focused = field == self.focus;
                let value_style = if locked {
                    Style::default().add_modifier(Modifier::DIM)
                } else if focused {
                    Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(if focused { "> " } else { "  " }),
                    Span::styled(format!("{label:<9}"), Style::default().fg(Color::Gray)),
                    Span::styled(format!("‹ {value} ›"), value_style),
                ])
            })
            .collect();

        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Settings"))
            .render(area, buf);
    }

    fn render_clock(&self, area: Rect, buf: &mut Buffer) {
        let phase = self.timer.phase();
        let color = phase_color(phase);
        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("{phase} session"))
            .border_style(Style::default().fg(color));
        let inner = block.inner(area);
        block.render(area, buf);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ])
            .split(inner);

        Paragraph::new(Span::styled(
            format_clock(self.timer.display_seconds()),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center)
        .render(rows[0], buf);

        Paragraph::new(format!(
            "Completed {}/{} work sessions",
            self.timer.completed_work_sessions(),
            self.timer.settings().target_sessions
        ))
        .alignment(Alignment::Center)
        .render(rows[1], buf);

        let progress = self.timer.progress();
        Gauge::default()
            .gauge_style(Style::default().fg(color).bg(Color::Black))
            .ratio(progress)
            .label(format!("{:.0}%", progress * 100.0))
            .render(rows[2], buf);
    }
}
