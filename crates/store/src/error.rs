use std::fmt;
use std::path::PathBuf;

/// Failure while building or inspecting the store.
#[derive(Debug)]
pub enum StoreError {
    /// Input CSV does not exist.
    CsvNotFound(PathBuf),
    /// Database file does not exist.
    DatabaseNotFound(PathBuf),
    /// Header row lacks a required column.
    MissingHeader(String),
    Csv(String),
    Sqlite(String),
    Io(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CsvNotFound(path) => write!(f, "CSV file not found: {}", path.display()),
            Self::DatabaseNotFound(path) => write!(f, "database not found: {}", path.display()),
            Self::MissingHeader(name) => write!(f, "CSV is missing required column '{name}'"),
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::Sqlite(msg) => write!(f, "SQLite error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Sqlite(e.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}
