use chrono::{DateTime, Local};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{error, info};

use crate::config::{self, Config};
use crate::log_store::SessionLog;
use crate::notify::Notifier;
use crate::record::SessionRecord;
use crate::summary::StudySummary;
use crate::timer::{Notice, Timer, TimerEvent, TimerSettings};

/// Last entry of the module picker; selecting it lets the user type a name.
pub const NEW_MODULE_LABEL: &str = "Add new module";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Timer,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    EditingModule,
}

/// Settings form fields, in focus order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Module,
    Work,
    Rest,
    Sessions,
}

impl Field {
    const ALL: [Field; 4] = [Field::Module, Field::Work, Field::Rest, Field::Sessions];

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[derive(Debug, Default)]
pub struct HistoryState {
    pub scroll_offset: usize,
}

pub struct App {
    pub timer: Timer,
    pub view: View,
    pub mode: Mode,
    pub focus: Field,
    /// Distinct modules seen in the log, sorted.
    pub modules: Vec<String>,
    /// Index into `modules`; `modules.len()` selects the new-module entry.
    pub module_index: usize,
    pub new_module: String,
    pub notices: Vec<Notice>,
    pub history: Vec<SessionRecord>,
    pub history_state: HistoryState,
    pub summary: StudySummary,
    pub should_quit: bool,
    store: Box<dyn SessionLog>,
    notifier: Box<dyn Notifier>,
    /// Malformed rows reported so far; the warning repeats only when this changes.
    skipped_rows: usize,
}

impl App {
    pub fn new(
        settings: TimerSettings,
        store: Box<dyn SessionLog>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let preferred = settings.module.clone();
        let mut app = Self {
            timer: Timer::new(settings),
            view: View::default(),
            mode: Mode::default(),
            focus: Field::default(),
            modules: vec![],
            module_index: 0,
            new_module: String::new(),
            notices: vec![],
            history: vec![],
            history_state: HistoryState::default(),
            summary: StudySummary::default(),
            should_quit: false,
            store,
            notifier,
            skipped_rows: 0,
        };
        app.refresh_log();
        app.module_index = match app.modules.iter().position(|m| *m == preferred) {
            Some(i) => i,
            None if preferred.is_empty() => 0,
            None => {
                app.new_module = preferred;
                app.modules.len()
            }
        };
        app.sync_module();
        app
    }

    pub fn store(&self) -> &dyn SessionLog {
        self.store.as_ref()
    }

    pub fn is_new_module_selected(&self) -> bool {
        self.module_index >= self.modules.len()
    }

    /// The module name a Start would use.
    pub fn selected_module(&self) -> String {
        self.modules
            .get(self.module_index)
            .cloned()
            .unwrap_or_else(|| self.new_module.trim().to_string())
    }

    /// Entries of the module picker, including the new-module entry.
    pub fn module_options(&self) -> Vec<&str> {
        self.modules
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(NEW_MODULE_LABEL))
            .collect()
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: DateTime<Local>) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match (self.mode, self.view) {
            (Mode::EditingModule, _) => self.handle_module_input(key),
            (Mode::Normal, View::History) => self.handle_history_key(key),
            (Mode::Normal, View::Timer) => self.handle_timer_key(key, now),
        }
    }

    pub fn on_tick(&mut self, now: DateTime<Local>) {
        self.dispatch(TimerEvent::Tick, now);
    }

    pub fn dispatch(&mut self, event: TimerEvent, now: DateTime<Local>) {
        if event == TimerEvent::Start {
            self.sync_module();
        }
        let transition = self.timer.handle_event(event, now);
        if !transition.notices.is_empty() {
            self.notices = transition.notices;
        }
        if let Some(record) = &transition.record {
            match self.store.append(record) {
                Ok(()) => self.refresh_log(),
                Err(e) => {
                    error!(error = %e, "failed to append session record");
                    self.notices
                        .push(Notice::Error(format!("Could not save session: {e}")));
                }
            }
        }
        if let Some(completion) = &transition.completed {
            self.notifier
                .phase_completed(&completion.record.module, completion);
        }
    }

    pub fn clear_history(&mut self) {
        self.notices = vec![match self.store.clear() {
            Ok(true) => Notice::Success("Study history cleared!".into()),
            Ok(false) => Notice::Warning("No history found to clear!".into()),
            Err(e) => {
                error!(error = %e, "failed to clear session log");
                Notice::Error(format!("Could not clear history: {e}"))
            }
        }];
        self.history_state.scroll_offset = 0;
        self.refresh_log();
    }

    /// Re-read the log and rebuild everything derived from it.
    pub fn refresh_log(&mut self) {
        match self.store.snapshot() {
            Ok(snapshot) => {
                if snapshot.skipped > 0 && snapshot.skipped != self.skipped_rows {
                    self.notices.push(Notice::Warning(format!(
                        "Skipped {} malformed row(s) in the session log.",
                        snapshot.skipped
                    )));
                }
                self.skipped_rows = snapshot.skipped;
                self.summary = StudySummary::from_records(&snapshot.records);
                let modules = snapshot
                    .records
                    .iter()
                    .map(|r| r.module.clone())
                    .collect::<std::collections::BTreeSet<_>>()
                    .into_iter()
                    .collect();
                self.history = snapshot.records;
                self.replace_modules(modules);
            }
            Err(e) => {
                error!(error = %e, "failed to read session log");
                self.notices
                    .push(Notice::Error(format!("Could not read session log: {e}")));
            }
        }
    }

    /// Current form values merged into `base`, for saving on exit.
    pub fn to_config(&self, base: &Config) -> Config {
        let settings = self.timer.settings();
        let module = self.selected_module();
        Config {
            work_minutes: settings.work_minutes,
            rest_minutes: settings.rest_minutes,
            target_sessions: settings.target_sessions,
            last_module: (!module.is_empty()).then_some(module),
            ..base.clone()
        }
    }

    fn replace_modules(&mut self, modules: Vec<String>) {
        let current = self.selected_module();
        self.modules = modules;
        match self.modules.iter().position(|m| *m == current) {
            Some(i) => {
                self.module_index = i;
                if self.new_module.trim() == current {
                    self.new_module.clear();
                }
            }
            None => {
                self.module_index = self.modules.len();
                self.new_module = current;
            }
        }
    }

    fn sync_module(&mut self) {
        let module = self.selected_module();
        if let Some(settings) = self.timer.settings_mut() {
            settings.module = module;
        }
    }

    fn handle_timer_key(&mut self, key: KeyEvent, now: DateTime<Local>) {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('s') => self.dispatch(TimerEvent::Start, now),
            KeyCode::Char('p') | KeyCode::Char(' ') => self.dispatch(TimerEvent::TogglePause, now),
            KeyCode::Char('x') => self.dispatch(TimerEvent::Stop, now),
            KeyCode::Char('r') => self.dispatch(TimerEvent::Reset, now),
            KeyCode::Char('C') => self.clear_history(),
            KeyCode::Char('v') => {
                self.view = View::History;
                self.history_state.scroll_offset = 0;
            }
            KeyCode::Char('a') => {
                if self.ensure_idle() {
                    self.focus = Field::Module;
                    self.module_index = self.modules.len();
                    self.mode = Mode::EditingModule;
                }
            }
            KeyCode::Tab | KeyCode::Down | KeyCode::Char('j') => self.focus = self.focus.next(),
            KeyCode::BackTab | KeyCode::Up | KeyCode::Char('k') => self.focus = self.focus.prev(),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => self.adjust_focused(-1),
            KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') => self.adjust_focused(1),
            KeyCode::Enter => {
                if self.focus == Field::Module && self.is_new_module_selected() {
                    if self.ensure_idle() {
                        self.mode = Mode::EditingModule;
                    }
                } else {
                    self.dispatch(TimerEvent::Start, now);
                }
            }
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyEvent) {
        let offset = &mut self.history_state.scroll_offset;
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('v') | KeyCode::Char('b') | KeyCode::Backspace | KeyCode::Esc => {
                self.view = View::Timer
            }
            KeyCode::Up | KeyCode::Char('k') => *offset = offset.saturating_sub(1),
            // Clamped against the visible height when rendering.
            KeyCode::Down | KeyCode::Char('j') => *offset += 1,
            KeyCode::PageUp => *offset = offset.saturating_sub(10),
            KeyCode::PageDown => *offset += 10,
            KeyCode::Home => *offset = 0,
            KeyCode::End => *offset = self.history.len(),
            _ => {}
        }
    }

    fn handle_module_input(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                self.sync_module();
            }
            KeyCode::Esc => {
                self.new_module.clear();
                self.mode = Mode::Normal;
                self.sync_module();
            }
            KeyCode::Backspace => {
                self.new_module.pop();
            }
            KeyCode::Char(c) => self.new_module.push(c),
            _ => {}
        }
    }

    fn ensure_idle(&mut self) -> bool {
        if self.timer.is_idle() {
            true
        } else {
            self.notices = vec![Notice::Warning(
                "Settings are locked while a session is in progress.".into(),
            )];
            false
        }
    }

    fn adjust_focused(&mut self, delta: i64) {
        if !self.ensure_idle() {
            return;
        }
        if self.focus == Field::Module {
            let options = self.modules.len() as i64 + 1;
            self.module_index = (self.module_index as i64 + delta).rem_euclid(options) as usize;
            self.sync_module();
            return;
        }
        let focus = self.focus;
        let Some(settings) = self.timer.settings_mut() else {
            return;
        };
        let (value, range) = match focus {
            Field::Work => (&mut settings.work_minutes, config::WORK_MINUTES),
            Field::Rest => (&mut settings.rest_minutes, config::REST_MINUTES),
            Field::Sessions => (&mut settings.target_sessions, config::TARGET_SESSIONS),
            Field::Module => return,
        };
        let adjusted = (*value as i64 + delta).clamp(*range.start() as i64, *range.end() as i64);
        *value = adjusted as u32;
        info!(field = ?focus, value = *value, "setting changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_store::{LogSnapshot, MemoryLogStore};
    use crate::notify::Silent;
    use crate::record::SessionType;
    use crate::timer::{Completion, TimerStatus};
    use crate::AppResult;
    use chrono::{Duration, TimeZone};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default, Clone)]
    struct Recorder(Rc<RefCell<Vec<SessionType>>>);

    impl Notifier for Recorder {
        fn phase_completed(&self, _module: &str, completion: &Completion) {
            self.0.borrow_mut().push(completion.phase);
        }
    }

    fn t0() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app_with(records: Vec<SessionRecord>, settings: TimerSettings) -> (App, Recorder) {
        let recorder = Recorder::default();
        let store = if records.is_empty() {
            MemoryLogStore::new()
        } else {
            MemoryLogStore::with_records(records)
        };
        let app = App::new(settings, Box::new(store), Box::new(recorder.clone()));
        (app, recorder)
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)), t0());
        }
    }

    fn logged(module: &str) -> SessionRecord {
        SessionRecord::new(module, SessionType::Work, 25, 1, t0())
    }

    /// In-memory log that also reports a configurable number of unreadable rows.
    struct DirtyLog {
        inner: MemoryLogStore,
        skipped: Rc<Cell<usize>>,
    }

    impl SessionLog for DirtyLog {
        fn append(&mut self, record: &SessionRecord) -> AppResult<()> {
            self.inner.append(record)
        }

        fn snapshot(&self) -> AppResult<LogSnapshot> {
            Ok(LogSnapshot {
                skipped: self.skipped.get(),
                ..self.inner.snapshot()?
            })
        }

        fn clear(&mut self) -> AppResult<bool> {
            self.inner.clear()
        }
    }

    fn skip_warnings(app: &App) -> usize {
        app.notices
            .iter()
            .filter(|n| matches!(n, Notice::Warning(text) if text.starts_with("Skipped")))
            .count()
    }

    #[test]
    fn skipped_rows_warning_shows_once_per_count() {
        let skipped = Rc::new(Cell::new(2));
        let store = DirtyLog {
            inner: MemoryLogStore::with_records(vec![logged("Maths")]),
            skipped: skipped.clone(),
        };
        let settings = TimerSettings {
            module: "Maths".into(),
            ..TimerSettings::default()
        };
        let mut app = App::new(settings, Box::new(store), Box::new(Silent));
        assert_eq!(skip_warnings(&app), 1);

        app.dispatch(TimerEvent::Start, t0());
        app.dispatch(TimerEvent::Stop, t0());
        assert_eq!(app.history.len(), 2);
        assert_eq!(skip_warnings(&app), 0);

        skipped.set(3);
        app.dispatch(TimerEvent::Start, t0());
        app.dispatch(TimerEvent::Stop, t0());
        assert_eq!(skip_warnings(&app), 1);
    }

    #[test]
    fn start_without_module_shows_validation() {
        let (mut app, _) = app_with(vec![], TimerSettings::default());
        assert!(app.is_new_module_selected());

        app.handle_key(key(KeyCode::Char('s')), t0());

        assert_eq!(app.timer.status(), TimerStatus::Idle);
        assert_eq!(
            app.notices,
            vec![Notice::Error("Please enter or select a module.".into())]
        );
        assert!(app.store().load().unwrap().is_empty());
    }

    #[test]
    fn new_module_then_start_and_stop() {
        let (mut app, recorder) = app_with(vec![], TimerSettings::default());

        app.handle_key(key(KeyCode::Char('a')), t0());
        assert_eq!(app.mode, Mode::EditingModule);
        type_str(&mut app, "Mathz");
        app.handle_key(key(KeyCode::Backspace), t0());
        type_str(&mut app, "s");
        app.handle_key(key(KeyCode::Enter), t0());
        assert_eq!(app.selected_module(), "Maths");

        app.handle_key(key(KeyCode::Char('s')), t0());
        assert!(app.timer.is_running());
        app.handle_key(key(KeyCode::Char('x')), t0() + Duration::seconds(5));

        let records = app.store().load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].module, "Maths");
        assert_eq!(records[0].actual_minutes, 0);
        assert_eq!(app.modules, vec!["Maths"]);
        assert_eq!(app.module_index, 0);
        assert!(app.new_module.is_empty());
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn existing_modules_are_offered_first() {
        let (app, _) = app_with(vec![logged("Physics"), logged("Art")], TimerSettings::default());
        assert_eq!(app.module_options(), vec!["Art", "Physics", NEW_MODULE_LABEL]);
        assert_eq!(app.selected_module(), "Art");
        assert_eq!(app.timer.settings().module, "Art");
    }

    #[test]
    fn preferred_module_is_restored() {
        let settings = TimerSettings {
            module: "Physics".into(),
            ..TimerSettings::default()
        };
        let (app, _) = app_with(vec![logged("Physics"), logged("Art")], settings);
        assert_eq!(app.selected_module(), "Physics");

        let settings = TimerSettings {
            module: "Chemistry".into(),
            ..TimerSettings::default()
        };
        let (app, _) = app_with(vec![logged("Art")], settings);
        assert!(app.is_new_module_selected());
        assert_eq!(app.selected_module(), "Chemistry");
    }

    #[test]
    fn module_picker_wraps_around() {
        let (mut app, _) = app_with(vec![logged("Art"), logged("Physics")], TimerSettings::default());
        app.handle_key(key(KeyCode::Left), t0());
        assert!(app.is_new_module_selected());
        app.handle_key(key(KeyCode::Right), t0());
        assert_eq!(app.selected_module(), "Art");
        app.handle_key(key(KeyCode::Right), t0());
        assert_eq!(app.timer.settings().module, "Physics");
    }

    #[test]
    fn durations_are_bounded() {
        let (mut app, _) = app_with(vec![], TimerSettings::default());
        app.handle_key(key(KeyCode::Tab), t0());
        assert_eq!(app.focus, Field::Work);
        for _ in 0..100 {
            app.handle_key(key(KeyCode::Right), t0());
        }
        assert_eq!(app.timer.settings().work_minutes, 90);

        app.handle_key(key(KeyCode::Down), t0());
        for _ in 0..100 {
            app.handle_key(key(KeyCode::Left), t0());
        }
        assert_eq!(app.timer.settings().rest_minutes, 1);

        app.handle_key(key(KeyCode::Down), t0());
        for _ in 0..20 {
            app.handle_key(key(KeyCode::Char('+')), t0());
        }
        assert_eq!(app.timer.settings().target_sessions, 10);

        app.handle_key(key(KeyCode::Down), t0());
        assert_eq!(app.focus, Field::Module);
    }

    #[test]
    fn settings_locked_while_running() {
        let (mut app, _) = app_with(vec![logged("Art")], TimerSettings::default());
        app.handle_key(key(KeyCode::Char('s')), t0());
        app.handle_key(key(KeyCode::Tab), t0());
        app.handle_key(key(KeyCode::Right), t0());

        assert_eq!(app.timer.settings().work_minutes, 25);
        assert!(matches!(app.notices.as_slice(), [Notice::Warning(_)]));
    }

    #[test]
    fn full_run_logs_and_notifies_each_phase() {
        let settings = TimerSettings {
            module: "Art".into(),
            work_minutes: 1,
            rest_minutes: 1,
            target_sessions: 2,
        };
        let (mut app, recorder) = app_with(vec![], settings);
        let mut now = t0();
        app.handle_key(key(KeyCode::Char('s')), now);
        assert!(app.timer.is_running());

        for _ in 0..180 {
            now += Duration::seconds(1);
            app.on_tick(now);
        }

        let kinds: Vec<_> = app
            .store()
            .load()
            .unwrap()
            .iter()
            .map(|r| (r.session_type, r.session_count))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (SessionType::Work, 1),
                (SessionType::Rest, 1),
                (SessionType::Work, 2)
            ]
        );
        assert_eq!(
            *recorder.0.borrow(),
            vec![SessionType::Work, SessionType::Rest, SessionType::Work]
        );
        assert!(app.timer.is_idle());
        assert_eq!(app.summary.work_sessions, 2);
        assert_eq!(app.history.len(), 3);
    }

    #[test]
    fn pause_key_toggles() {
        let (mut app, _) = app_with(vec![logged("Art")], TimerSettings::default());
        app.handle_key(key(KeyCode::Char('s')), t0());
        app.handle_key(key(KeyCode::Char(' ')), t0());
        assert!(app.timer.is_paused());
        let frozen = app.timer.remaining_seconds();
        app.on_tick(t0() + Duration::seconds(1));
        assert_eq!(app.timer.remaining_seconds(), frozen);
        app.handle_key(key(KeyCode::Char('p')), t0());
        assert!(app.timer.is_running());
    }

    #[test]
    fn clear_history_reports_presence() {
        let (mut app, _) = app_with(vec![], TimerSettings::default());
        app.handle_key(key(KeyCode::Char('C')), t0());
        assert_eq!(
            app.notices,
            vec![Notice::Warning("No history found to clear!".into())]
        );

        let (mut app, _) = app_with(vec![logged("Art")], TimerSettings::default());
        app.clear_history();
        assert_eq!(
            app.notices,
            vec![Notice::Success("Study history cleared!".into())]
        );
        assert!(app.history.is_empty());
        assert!(app.summary.is_empty());
        // The module stays selected even though it is no longer logged.
        assert!(app.is_new_module_selected());
        assert_eq!(app.selected_module(), "Art");
    }

    #[test]
    fn history_view_navigation() {
        let (mut app, _) = app_with(vec![logged("Art")], TimerSettings::default());
        app.handle_key(key(KeyCode::Char('v')), t0());
        assert_eq!(app.view, View::History);
        app.handle_key(key(KeyCode::Down), t0());
        app.handle_key(key(KeyCode::PageDown), t0());
        assert_eq!(app.history_state.scroll_offset, 11);
        app.handle_key(key(KeyCode::Home), t0());
        assert_eq!(app.history_state.scroll_offset, 0);
        app.handle_key(key(KeyCode::Esc), t0());
        assert_eq!(app.view, View::Timer);
        assert!(!app.should_quit);
    }

    #[test]
    fn quit_keys() {
        let (mut app, _) = app_with(vec![], TimerSettings::default());
        app.handle_key(key(KeyCode::Char('q')), t0());
        assert!(app.should_quit);

        let (mut app, _) = app_with(vec![], TimerSettings::default());
        app.handle_key(key(KeyCode::Char('a')), t0());
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), t0());
        assert!(app.should_quit);
    }

    #[test]
    fn to_config_keeps_base_preferences() {
        let settings = TimerSettings {
            module: "Art".into(),
            work_minutes: 40,
            rest_minutes: 10,
            target_sessions: 3,
        };
        let (app, _) = app_with(vec![logged("Art")], settings);
        let base = Config {
            sound: false,
            ..Config::default()
        };

        let cfg = app.to_config(&base);

        assert_eq!(cfg.work_minutes, 40);
        assert_eq!(cfg.rest_minutes, 10);
        assert_eq!(cfg.target_sessions, 3);
        assert_eq!(cfg.last_module.as_deref(), Some("Art"));
        assert!(!cfg.sound);
    }
}
