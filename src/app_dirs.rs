use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "tomatick";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join(APP_NAME),
            )
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|pd| pd.data_local_dir().to_path_buf())
        }
    }

    /// Default location of the CSV session log.
    pub fn session_log_path() -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join("study_sessions.csv"))
            .unwrap_or_else(|| PathBuf::from("study_sessions.csv"))
    }

    /// Where tracing output goes; the terminal belongs to the UI.
    pub fn trace_log_path() -> PathBuf {
        Self::state_dir()
            .map(|dir| dir.join("tomatick.log"))
            .unwrap_or_else(|| PathBuf::from("tomatick.log"))
    }
}
