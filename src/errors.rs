//! Application error type shared by the log store, config and shell.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("Session log is missing the {0:?} column")]
    MissingColumn(&'static str),

    #[error("Invalid value: {0}")]
    Validation(String),
}

pub type AppResult<T> = Result<T, AppError>;
