use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::{info, level_filters::LevelFilter, warn};

use tomatick::{
    app::App,
    app_dirs::AppDirs,
    config::{self, Config, ConfigStore, FileConfigStore},
    log_store::CsvLogStore,
    notify::Chime,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    timer::TimerSettings,
    ui::screen::current_screen,
    AppResult,
};

/// pomodoro study timer that logs every session to csv and charts time per module
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal pomodoro timer for studying: alternate work and rest phases, log each one to a CSV file, and see cumulative study hours per module."
)]
pub struct Cli {
    /// csv file sessions are logged to
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// minutes per work phase (1-90)
    #[clap(short = 'w', long)]
    work: Option<u32>,

    /// minutes per rest phase (1-30)
    #[clap(short = 'r', long)]
    rest: Option<u32>,

    /// number of work phases per run (1-10)
    #[clap(short = 's', long)]
    sessions: Option<u32>,

    /// module to preselect
    #[clap(short = 'm', long)]
    module: Option<String>,

    /// do not ring the terminal bell when a phase ends
    #[clap(long)]
    no_sound: bool,

    /// do not send desktop notifications when a phase ends
    #[clap(long)]
    no_desktop_notify: bool,

    /// more tracing output in the log file (-v info, -vv debug, -vvv trace)
    #[clap(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn level_filter(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// Command-line values win over the saved config for this run.
    fn merge_into(&self, mut cfg: Config) -> AppResult<Config> {
        if let Some(work) = self.work {
            cfg.work_minutes = config::validate("--work", work, &config::WORK_MINUTES)?;
        }
        if let Some(rest) = self.rest {
            cfg.rest_minutes = config::validate("--rest", rest, &config::REST_MINUTES)?;
        }
        if let Some(sessions) = self.sessions {
            cfg.target_sessions =
                config::validate("--sessions", sessions, &config::TARGET_SESSIONS)?;
        }
        if let Some(module) = &self.module {
            cfg.last_module = Some(module.trim().to_string());
        }
        if let Some(path) = &self.log_file {
            cfg.log_file = Some(path.clone());
        }
        cfg.sound &= !self.no_sound;
        cfg.desktop_notifications &= !self.no_desktop_notify;
        Ok(cfg)
    }
}

fn settings_from(cfg: &Config) -> TimerSettings {
    TimerSettings {
        module: cfg.last_module.clone().unwrap_or_default(),
        work_minutes: cfg.work_minutes,
        rest_minutes: cfg.rest_minutes,
        target_sessions: cfg.target_sessions,
    }
}

/// Send tracing output to a file; the terminal belongs to the UI.
fn init_tracing(path: &Path, level: LevelFilter) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_max_level(level)
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Err(e) = init_tracing(&AppDirs::trace_log_path(), cli.level_filter()) {
        eprintln!("tomatick: tracing disabled: {e}");
    }

    let config_store = FileConfigStore::new();
    let saved = config_store.load();
    info!(config = %config_store.path().display(), "config loaded");
    let cfg = match cli.merge_into(saved.clone()) {
        Ok(cfg) => cfg,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, e.to_string()).exit();
        }
    };

    let log_path = cfg
        .log_file
        .clone()
        .unwrap_or_else(AppDirs::session_log_path);
    let store = CsvLogStore::new(log_path);
    info!(log = %store.path().display(), "starting");

    let mut app = App::new(
        settings_from(&cfg),
        Box::new(store),
        Box::new(Chime::new(cfg.sound, cfg.desktop_notifications)),
    );

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    // --log-file and the notification flags are not persisted.
    if let Err(e) = config_store.save(&app.to_config(&saved)) {
        warn!(error = %e, "failed to save config");
    }

    result
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::default());

    terminal.draw(|f| ui(app, f))?;

    while !app.should_quit {
        match runner.step() {
            AppEvent::Tick => app.on_tick(chrono::Local::now()),
            AppEvent::Key(key) => app.handle_key(key, chrono::Local::now()),
            AppEvent::Resize => {}
        }
        terminal.draw(|f| ui(app, f))?;
    }

    if !app.timer.is_idle() {
        info!("quit with a session in progress; nothing logged");
    }
    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    current_screen(app.view).render(app, f);
}
