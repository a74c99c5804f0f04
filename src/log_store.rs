use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::{debug, info, warn};

use crate::errors::{AppError, AppResult};
use crate::record::{SessionRecord, COLUMNS, SESSION_TYPE_COLUMN};

/// Result of reading the whole log, including how many rows had to be dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LogSnapshot {
    pub records: Vec<SessionRecord>,
    pub skipped: usize,
}

/// Append-only storage for session records.
pub trait SessionLog {
    fn append(&mut self, record: &SessionRecord) -> AppResult<()>;

    /// Read every record. Rows that cannot be parsed are skipped and counted.
    fn snapshot(&self) -> AppResult<LogSnapshot>;

    /// Delete the whole log. Returns whether there was anything to delete.
    fn clear(&mut self) -> AppResult<bool>;

    fn load(&self) -> AppResult<Vec<SessionRecord>> {
        self.snapshot().map(|s| s.records)
    }

    fn list_modules(&self) -> AppResult<Vec<String>> {
        let modules: BTreeSet<String> = self.load()?.into_iter().map(|r| r.module).collect();
        Ok(modules.into_iter().collect())
    }
}

/// The log as a comma separated file with a header row.
#[derive(Debug, Clone)]
pub struct CsvLogStore {
    path: PathBuf,
}

impl CsvLogStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn headers(&self) -> AppResult<StringRecord> {
        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::Headers)
            .from_path(&self.path)?;
        Ok(rdr.headers()?.clone())
    }

    /// Write `rows` under `headers` to a temporary file, then move it into place.
    fn write_table<I>(&self, headers: &StringRecord, rows: I) -> AppResult<()>
    where
        I: IntoIterator<Item = StringRecord>,
    {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut wtr = WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(&tmp)?;
            wtr.write_record(headers)?;
            for row in rows {
                wtr.write_record(&row)?;
            }
            wtr.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Append in whatever column order the file's header already uses.
    fn append_row(&self, headers: &StringRecord, record: &SessionRecord) -> AppResult<()> {
        let mut file = OpenOptions::new().read(true).append(true).open(&self.path)?;
        if !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }
        let mut wtr = WriterBuilder::new().has_headers(false).from_writer(file);
        wtr.write_record(&record.to_row(headers))?;
        wtr.flush()?;
        Ok(())
    }

    /// Rewrite a log that predates the session type column. Every existing
    /// row is carried over field by field, including ones that do not parse.
    fn upgrade(&self, headers: &StringRecord, record: &SessionRecord) -> AppResult<()> {
        let mut layout: StringRecord = COLUMNS.iter().collect();
        for extra in headers.iter().filter(|h| !COLUMNS.iter().any(|c| c == h)) {
            layout.push_field(extra);
        }
        let source: Vec<Option<usize>> = layout
            .iter()
            .map(|column| headers.iter().position(|h| h == column))
            .collect();

        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::Headers)
            .from_path(&self.path)?;
        let mut rows = Vec::new();
        for row in rdr.records() {
            let row = row?;
            let mut upgraded: StringRecord = layout
                .iter()
                .zip(&source)
                .map(|(column, idx)| match idx {
                    Some(i) => row.get(*i).unwrap_or_default(),
                    None if column == SESSION_TYPE_COLUMN => "Work",
                    None => "",
                })
                .collect();
            // Stray fields past the header are kept at the end of the row.
            for extra in row.iter().skip(headers.len()) {
                upgraded.push_field(extra);
            }
            rows.push(upgraded);
        }
        info!(
            path = %self.path.display(),
            rows = rows.len(),
            "upgrading session log to include session types"
        );
        rows.push(record.to_row(&layout));
        self.write_table(&layout, rows)
    }
}

fn check_columns(headers: &StringRecord) -> AppResult<()> {
    match COLUMNS
        .iter()
        .filter(|c| **c != SESSION_TYPE_COLUMN)
        .find(|c| !headers.iter().any(|h| h == **c))
    {
        Some(missing) => Err(AppError::MissingColumn(missing)),
        None => Ok(()),
    }
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

impl SessionLog for CsvLogStore {
    fn append(&mut self, record: &SessionRecord) -> AppResult<()> {
        let is_empty = fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);
        let headers = if is_empty {
            StringRecord::new()
        } else {
            self.headers()?
        };
        if headers.is_empty() {
            info!(path = %self.path.display(), "creating session log");
            let layout: StringRecord = COLUMNS.iter().collect();
            self.write_table(&layout, [record.to_row(&layout)])?;
        } else {
            check_columns(&headers)?;
            if headers.iter().any(|h| h == SESSION_TYPE_COLUMN) {
                self.append_row(&headers, record)?;
            } else {
                self.upgrade(&headers, record)?;
            }
        }
        debug!(
            module = %record.module,
            session_type = %record.session_type,
            minutes = record.actual_minutes,
            "session recorded"
        );
        Ok(())
    }

    fn snapshot(&self) -> AppResult<LogSnapshot> {
        if !self.path.exists() {
            return Ok(LogSnapshot::default());
        }

        let mut rdr = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_path(&self.path)?;
        let headers = rdr.headers()?.clone();
        if headers.is_empty() {
            return Ok(LogSnapshot::default());
        }
        check_columns(&headers)?;

        let mut snapshot = LogSnapshot::default();
        for (idx, row) in rdr.deserialize::<SessionRecord>().enumerate() {
            match row {
                Ok(record) => snapshot.records.push(record),
                Err(e) => {
                    // +2: one for the header, one for 1-based line numbers
                    warn!(line = idx + 2, error = %e, "skipping malformed session row");
                    snapshot.skipped += 1;
                }
            }
        }
        Ok(snapshot)
    }

    fn clear(&mut self) -> AppResult<bool> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "session log cleared");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Keeps the log in memory; used for headless runs and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryLogStore {
    records: Option<Vec<SessionRecord>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<SessionRecord>) -> Self {
        Self {
            records: Some(records),
        }
    }
}

impl SessionLog for MemoryLogStore {
    fn append(&mut self, record: &SessionRecord) -> AppResult<()> {
        self.records.get_or_insert_with(Vec::new).push(record.clone());
        Ok(())
    }

    fn snapshot(&self) -> AppResult<LogSnapshot> {
        Ok(LogSnapshot {
            records: self.records.clone().unwrap_or_default(),
            skipped: 0,
        })
    }

    fn clear(&mut self) -> AppResult<bool> {
        Ok(self.records.take().is_some())
    }
}
