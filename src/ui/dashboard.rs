use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Direction, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph, Widget, Wrap},
};

use crate::summary::StudySummary;
use crate::ui::charting::{bar_value, chart_max, format_hours, truncate_label};

const MAX_LABEL_WIDTH: usize = 20;

pub const CHART_TITLE: &str = "Study Time by Module";
pub const AXIS_TITLE: &str = "Total Study Time (hours)";
pub const NO_DATA: &str = "No study sessions have been logged yet.";

/// Horizontal bar chart of work hours per module.
pub struct StudyChart<'a> {
    summary: &'a StudySummary,
}

impl<'a> StudyChart<'a> {
    pub fn new(summary: &'a StudySummary) -> Self {
        Self { summary }
    }
}

impl Widget for StudyChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(CHART_TITLE)
            .title_bottom(Line::from(format!(
                "{AXIS_TITLE}  total {}",
                format_hours(self.summary.total_hours)
            )));

        if self.summary.is_empty() {
            Paragraph::new(NO_DATA)
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block)
                .render(area, buf);
            return;
        }

        let highest = self
            .summary
            .modules
            .iter()
            .map(|m| m.hours)
            .fold(0.0, f64::max);

        // Summary is ascending; drawing it reversed puts the longest bar on top.
        let bars: Vec<Bar> = self
            .summary
            .modules
            .iter()
            .rev()
            .map(|m| {
                Bar::default()
                    .value(bar_value(m.hours))
                    .label(Line::from(truncate_label(&m.module, MAX_LABEL_WIDTH)))
                    .text_value(format_hours(m.hours))
                    .style(Style::default().fg(Color::Red))
                    .value_style(
                        Style::default()
                            .fg(Color::White)
                            .bg(Color::Red)
                            .add_modifier(Modifier::BOLD),
                    )
            })
            .collect();

        BarChart::default()
            .block(block)
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .max(chart_max(highest))
            .data(BarGroup::default().bars(&bars))
            .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SessionRecord, SessionType};
    use chrono::{Local, TimeZone};

    fn rendered(summary: &StudySummary, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        StudyChart::new(summary).render(area, &mut buffer);
        buffer
            .content()
            .chunks(width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn empty_summary_shows_message() {
        let text = rendered(&StudySummary::default(), 60, 6);
        assert!(text.contains(NO_DATA));
        assert!(text.contains(CHART_TITLE));
    }

    #[test]
    fn largest_module_is_drawn_first() {
        let at = Local.with_ymd_and_hms(2024, 3, 3, 10, 0, 0).unwrap();
        let summary = StudySummary::from_records(&[
            SessionRecord::new("Maths", SessionType::Work, 30, 1, at),
            SessionRecord::new("Physics", SessionType::Work, 120, 1, at),
        ]);

        let text = rendered(&summary, 60, 8);

        let physics = text.find("Physics").expect("physics bar");
        let maths = text.find("Maths").expect("maths bar");
        assert!(physics < maths);
        assert!(text.contains(AXIS_TITLE));
    }
}
