use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeJsonError;

use crate::calendar::Holiday;
use crate::row::Row;
use crate::state::ScheduleState;
use crate::task::Task;

#[derive(Debug)]
pub enum PersistenceError {
    Serialization(SerdeJsonError),
    Io(io::Error),
    Csv(csv::Error),
    #[cfg(feature = "sqlite")]
    Sqlite(rusqlite::Error),
    InvalidData(String),
    NotFound,
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Serialization(err) => write!(f, "serialization error: {err}"),
            PersistenceError::Io(err) => write!(f, "io error: {err}"),
            PersistenceError::Csv(err) => write!(f, "csv error: {err}"),
            #[cfg(feature = "sqlite")]
            PersistenceError::Sqlite(err) => write!(f, "sqlite error: {err}"),
            PersistenceError::InvalidData(message) => write!(f, "invalid data: {message}"),
            PersistenceError::NotFound => write!(f, "no schedule stored"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<SerdeJsonError> for PersistenceError {
    fn from(value: SerdeJsonError) -> Self {
        Self::Serialization(value)
    }
}

impl From<io::Error> for PersistenceError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<csv::Error> for PersistenceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// The unit the persistence collaborator exchanges with the engine:
/// everything on the surface, saved and loaded all-or-nothing.
/// Dependency edges travel inside each task's `depends_on` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub holidays: Vec<Holiday>,
}

/// Persistence collaborator boundary. The engine treats both operations
/// as atomic; `load_snapshot` returns `None` when nothing was ever
/// saved.
pub trait SnapshotStore {
    fn save_snapshot(&self, snapshot: &ScheduleSnapshot) -> PersistenceResult<()>;
    fn load_snapshot(&self) -> PersistenceResult<Option<ScheduleSnapshot>>;
}

/// Structural check applied before every save and after every load, so
/// a corrupt snapshot is refused instead of partially honored.
pub fn validate_snapshot(snapshot: &ScheduleSnapshot) -> PersistenceResult<()> {
    ScheduleState::from_snapshot(snapshot)
        .map(|_| ())
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))
}

pub mod file;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use file::{
    CsvFileStore, JsonFileStore, load_snapshot_from_csv, load_snapshot_from_json,
    save_snapshot_to_csv, save_snapshot_to_json,
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSnapshotStore;
