use ratatui::Frame;

use crate::app::{App, View};
use crate::ui::history::render_history;

/// A UI Screen boundary; key handling stays in `App`.
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Settings form, countdown and study chart
pub struct TimerScreen;

impl Screen for TimerScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Scrollable table of every logged session
pub struct HistoryScreen;

impl Screen for HistoryScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_history(app, f);
    }
}

pub fn current_screen(view: View) -> Box<dyn Screen> {
    match view {
        View::Timer => Box::new(TimerScreen),
        View::History => Box::new(HistoryScreen),
    }
}
