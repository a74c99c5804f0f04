use chrono::{DateTime, Local, NaiveDateTime};
use csv::StringRecord;
use serde::{de, Deserialize, Deserializer, Serialize};

/// Timestamp layout used in the `Date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MODULE_COLUMN: &str = "Module";
pub const SESSION_TYPE_COLUMN: &str = "Session Type";
pub const MINUTES_COLUMN: &str = "Actual Time Spent (minutes)";
pub const SESSIONS_COLUMN: &str = "Number of Sessions";
pub const DATE_COLUMN: &str = "Date";

/// Column names of the persisted table, in the order new files are written.
pub const COLUMNS: [&str; 5] = [
    MODULE_COLUMN,
    SESSION_TYPE_COLUMN,
    MINUTES_COLUMN,
    SESSIONS_COLUMN,
    DATE_COLUMN,
];

/// Which half of a pomodoro cycle a record (or the running timer) belongs to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum_macros::Display,
)]
pub enum SessionType {
    #[default]
    Work,
    Rest,
}

impl SessionType {
    pub fn is_work(self) -> bool {
        self == SessionType::Work
    }
}

/// One logged phase. Immutable once written; identity is append order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    #[serde(rename = "Module")]
    pub module: String,
    // Older logs have no such column, or an empty cell where one was added later.
    #[serde(
        rename = "Session Type",
        default,
        deserialize_with = "session_type_or_work"
    )]
    pub session_type: SessionType,
    #[serde(
        rename = "Actual Time Spent (minutes)",
        deserialize_with = "whole_number"
    )]
    pub actual_minutes: u32,
    #[serde(rename = "Number of Sessions", deserialize_with = "whole_number")]
    pub session_count: u32,
    #[serde(rename = "Date")]
    pub timestamp: String,
}

impl SessionRecord {
    pub fn new(
        module: impl Into<String>,
        session_type: SessionType,
        actual_minutes: u32,
        session_count: u32,
        at: DateTime<Local>,
    ) -> Self {
        Self {
            module: module.into(),
            session_type,
            actual_minutes,
            session_count,
            timestamp: at.format(DATE_FORMAT).to_string(),
        }
    }

    pub fn logged_at(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.timestamp, DATE_FORMAT).ok()
    }

    /// Cell value for a named column, `None` for columns this record does not carry.
    pub fn field(&self, column: &str) -> Option<String> {
        match column {
            MODULE_COLUMN => Some(self.module.clone()),
            SESSION_TYPE_COLUMN => Some(self.session_type.to_string()),
            MINUTES_COLUMN => Some(self.actual_minutes.to_string()),
            SESSIONS_COLUMN => Some(self.session_count.to_string()),
            DATE_COLUMN => Some(self.timestamp.clone()),
            _ => None,
        }
    }

    /// Lay the record out under an existing header. Unknown columns stay empty.
    pub fn to_row(&self, headers: &StringRecord) -> StringRecord {
        headers
            .iter()
            .map(|h| self.field(h.trim()).unwrap_or_default())
            .collect()
    }
}

fn session_type_or_work<'de, D>(deserializer: D) -> Result<SessionType, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.trim() {
        "" | "Work" => Ok(SessionType::Work),
        "Rest" => Ok(SessionType::Rest),
        other => Err(de::Error::custom(format!("unknown session type {other:?}"))),
    }
}

/// Counts may have been written as floats (`25.0`) by other tools.
fn whole_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if let Ok(n) = raw.parse::<u32>() {
        return Ok(n);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && (0.0..=u32::MAX as f64).contains(&f) => Ok(f as u32),
        _ => Err(de::Error::custom(format!("expected a whole number, got {raw:?}"))),
    }
}
