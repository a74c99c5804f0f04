use std::collections::HashMap;

use chrono::NaiveDateTime;
use itertools::Itertools;

use crate::record::SessionRecord;

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleHours {
    pub module: String,
    pub hours: f64,
}

/// Cumulative study time per module, ready for the dashboard chart.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StudySummary {
    /// Ascending by hours, so the biggest bar ends up last.
    pub modules: Vec<ModuleHours>,
    pub total_hours: f64,
    pub work_sessions: usize,
    pub rest_sessions: usize,
    /// Latest parseable `Date` in the log.
    pub last_logged: Option<NaiveDateTime>,
}

impl StudySummary {
    pub fn from_records(records: &[SessionRecord]) -> Self {
        let work_sessions = records
            .iter()
            .filter(|r| r.session_type.is_work())
            .count();
        let modules = module_hours(records);
        Self {
            total_hours: modules.iter().map(|m| m.hours).sum(),
            modules,
            work_sessions,
            rest_sessions: records.len() - work_sessions,
            last_logged: records.iter().filter_map(SessionRecord::logged_at).max(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Work time only, grouped by module and converted to hours.
pub fn module_hours(records: &[SessionRecord]) -> Vec<ModuleHours> {
    records
        .iter()
        .filter(|r| r.session_type.is_work())
        .fold(HashMap::<&str, u64>::new(), |mut acc, r| {
            *acc.entry(r.module.as_str()).or_insert(0) += r.actual_minutes as u64;
            acc
        })
        .into_iter()
        .map(|(module, minutes)| ModuleHours {
            module: module.to_string(),
            hours: minutes as f64 / 60.0,
        })
        .sorted_by(|a, b| {
            a.hours
                .partial_cmp(&b.hours)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.module.cmp(&b.module))
        })
        .collect()
}
