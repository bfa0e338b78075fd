use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};

use super::{PersistenceResult, ScheduleSnapshot, SnapshotStore, validate_snapshot};
use crate::calendar::Holiday;
use crate::row::Row;
use crate::task::Task;

const FORMAT_VERSION: i64 = 1;

/// Snapshot store over a SQLite database. Records are serialized as
/// JSON columns; a save replaces everything inside one transaction, so
/// the collaborator stays all-or-nothing.
pub struct SqliteSnapshotStore {
    connection: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> PersistenceResult<Self> {
        let connection = Connection::open(path)?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> PersistenceResult<Self> {
        let connection = Connection::open_in_memory()?;
        Self::initialize_schema(&connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn initialize_schema(connection: &Connection) -> PersistenceResult<()> {
        let ddl = r#"
            CREATE TABLE IF NOT EXISTS snapshot_meta (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                format_version INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS rows (
                id TEXT PRIMARY KEY,
                row_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS tasks (
                id INTEGER PRIMARY KEY,
                task_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS holidays (
                id INTEGER PRIMARY KEY,
                holiday_json TEXT NOT NULL
            );
        "#;
        connection.execute_batch(ddl)?;
        Ok(())
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn save_snapshot(&self, snapshot: &ScheduleSnapshot) -> PersistenceResult<()> {
        validate_snapshot(snapshot)?;
        let mut connection = self.connection.lock().expect("sqlite mutex poisoned");
        let tx = connection.transaction()?;

        tx.execute("DELETE FROM snapshot_meta", [])?;
        tx.execute("DELETE FROM rows", [])?;
        tx.execute("DELETE FROM tasks", [])?;
        tx.execute("DELETE FROM holidays", [])?;

        tx.execute(
            "INSERT INTO snapshot_meta (id, format_version) VALUES (1, ?1)",
            params![FORMAT_VERSION],
        )?;
        {
            let mut stmt = tx.prepare("INSERT INTO rows (id, row_json) VALUES (?1, ?2)")?;
            for row in &snapshot.rows {
                stmt.execute(params![row.id.to_string(), serde_json::to_string(row)?])?;
            }
            let mut stmt = tx.prepare("INSERT INTO tasks (id, task_json) VALUES (?1, ?2)")?;
            for task in &snapshot.tasks {
                stmt.execute(params![task.id, serde_json::to_string(task)?])?;
            }
            let mut stmt =
                tx.prepare("INSERT INTO holidays (id, holiday_json) VALUES (?1, ?2)")?;
            for holiday in &snapshot.holidays {
                stmt.execute(params![holiday.id, serde_json::to_string(holiday)?])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_snapshot(&self) -> PersistenceResult<Option<ScheduleSnapshot>> {
        let connection = self.connection.lock().expect("sqlite mutex poisoned");

        let mut stmt = connection.prepare("SELECT format_version FROM snapshot_meta WHERE id = 1")?;
        let version: Option<i64> = stmt.query_row([], |row| row.get(0)).optional()?;
        if version.is_none() {
            return Ok(None);
        }

        let mut stmt = connection.prepare("SELECT row_json FROM rows ORDER BY id ASC")?;
        let mut rows = Vec::new();
        for json in stmt.query_map([], |row| row.get::<_, String>(0))? {
            let row: Row = serde_json::from_str(&json?)?;
            rows.push(row);
        }

        let mut stmt = connection.prepare("SELECT task_json FROM tasks ORDER BY id ASC")?;
        let mut tasks = Vec::new();
        for json in stmt.query_map([], |row| row.get::<_, String>(0))? {
            let task: Task = serde_json::from_str(&json?)?;
            tasks.push(task);
        }

        let mut stmt =
            connection.prepare("SELECT holiday_json FROM holidays ORDER BY id ASC")?;
        let mut holidays = Vec::new();
        for json in stmt.query_map([], |row| row.get::<_, String>(0))? {
            let holiday: Holiday = serde_json::from_str(&json?)?;
            holidays.push(holiday);
        }

        let snapshot = ScheduleSnapshot {
            rows,
            tasks,
            holidays,
        };
        validate_snapshot(&snapshot)?;
        Ok(Some(snapshot))
    }
}
