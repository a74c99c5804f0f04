use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::errors::{AppError, AppResult};

pub const WORK_MINUTES: RangeInclusive<u32> = 1..=90;
pub const REST_MINUTES: RangeInclusive<u32> = 1..=30;
pub const TARGET_SESSIONS: RangeInclusive<u32> = 1..=10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub work_minutes: u32,
    pub rest_minutes: u32,
    pub target_sessions: u32,
    pub last_module: Option<String>,
    pub sound: bool,
    pub desktop_notifications: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            rest_minutes: 5,
            target_sessions: 1,
            last_module: None,
            sound: true,
            desktop_notifications: true,
            log_file: None,
        }
    }
}

impl Config {
    /// Pull every duration back inside the range the form allows.
    pub fn clamped(mut self) -> Self {
        self.work_minutes = clamp(self.work_minutes, &WORK_MINUTES);
        self.rest_minutes = clamp(self.rest_minutes, &REST_MINUTES);
        self.target_sessions = clamp(self.target_sessions, &TARGET_SESSIONS);
        self
    }
}

pub fn clamp(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

/// Reject values the settings form could never produce.
pub fn validate(name: &str, value: u32, range: &RangeInclusive<u32>) -> AppResult<u32> {
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(AppError::Validation(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "tomatick") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("tomatick_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice::<Config>(&bytes) {
                Ok(cfg) => cfg.clamped(),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable config");
                    Config::default()
                }
            },
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested").join("config.json"));
        let cfg = Config {
            work_minutes: 50,
            rest_minutes: 10,
            target_sessions: 4,
            last_module: Some("Linear Algebra".into()),
            sound: false,
            desktop_notifications: false,
            log_file: Some(PathBuf::from("/tmp/sessions.csv")),
        };
        store.save(&cfg).unwrap();
        assert_eq!(cfg, store.load());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("absent.json"));
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn corrupt_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(FileConfigStore::with_path(&path).load(), Config::default());
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            br#"{"work_minutes": 500, "rest_minutes": 0, "target_sessions": 99}"#,
        )
        .unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.work_minutes, 90);
        assert_eq!(cfg.rest_minutes, 1);
        assert_eq!(cfg.target_sessions, 10);
        assert!(cfg.sound);
    }

    #[test]
    fn validate_reports_bounds() {
        assert_eq!(validate("work", 90, &WORK_MINUTES).unwrap(), 90);
        let err = validate("rest", 31, &REST_MINUTES).unwrap_err();
        assert_matches::assert_matches!(err, AppError::Validation(_));
        assert_eq!(err.to_string(), "Invalid value: rest must be between 1 and 30, got 31");
        assert!(validate("sessions", 0, &TARGET_SESSIONS).is_err());
    }
}
