use std::fs::File;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    PersistenceError, PersistenceResult, ScheduleSnapshot, SnapshotStore, validate_snapshot,
};
use crate::calendar::Holiday;
use crate::row::{Row, RowId, RowKind};
use crate::task::{Task, TaskCategory, TaskId, TaskStatus};

pub fn save_snapshot_to_json<P: AsRef<Path>>(
    snapshot: &ScheduleSnapshot,
    path: P,
) -> PersistenceResult<()> {
    validate_snapshot(snapshot)?;
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, snapshot)?;
    Ok(())
}

pub fn load_snapshot_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<ScheduleSnapshot> {
    let file = File::open(path)?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(file)?;
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

/// Flat union record: one CSV line per row, task or holiday, with the
/// `record` column naming which. Unused columns stay empty.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SnapshotCsvRecord {
    record: String,
    id: String,
    label: String,
    row_kind: String,
    name: String,
    category: String,
    row_id: String,
    start_date: String,
    end_date: String,
    status: String,
    depends_on: String,
    protocol: String,
    manufacturer: String,
    observations: String,
}

fn join_ids(ids: &[TaskId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn split_ids(raw: &str) -> PersistenceResult<Vec<TaskId>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    raw.split(';')
        .map(|part| {
            part.trim()
                .parse::<TaskId>()
                .map_err(|_| PersistenceError::InvalidData(format!("bad task id list '{raw}'")))
        })
        .collect()
}

fn parse_date(raw: &str) -> PersistenceResult<NaiveDate> {
    raw.parse::<NaiveDate>()
        .map_err(|_| PersistenceError::InvalidData(format!("bad date '{raw}'")))
}

fn optional(raw: &str) -> Option<String> {
    if raw.is_empty() {
        None
    } else {
        Some(raw.to_string())
    }
}

impl From<&Row> for SnapshotCsvRecord {
    fn from(row: &Row) -> Self {
        Self {
            record: "row".to_string(),
            id: row.id.to_string(),
            label: row.label.clone(),
            row_kind: row.kind.as_str().to_string(),
            ..Self::default()
        }
    }
}

impl From<&Task> for SnapshotCsvRecord {
    fn from(task: &Task) -> Self {
        Self {
            record: "task".to_string(),
            id: task.id.to_string(),
            name: task.name.clone(),
            category: task.category.as_str().to_string(),
            row_id: task.row_id.to_string(),
            start_date: task.start_date.to_string(),
            end_date: task.end_date.to_string(),
            status: task.status.as_str().to_string(),
            depends_on: join_ids(&task.depends_on),
            protocol: task.protocol.clone().unwrap_or_default(),
            manufacturer: task.manufacturer.clone().unwrap_or_default(),
            observations: task.observations.clone().unwrap_or_default(),
            ..Self::default()
        }
    }
}

impl From<&Holiday> for SnapshotCsvRecord {
    fn from(holiday: &Holiday) -> Self {
        Self {
            record: "holiday".to_string(),
            id: holiday.id.to_string(),
            name: holiday.name.clone(),
            start_date: holiday.start_date.to_string(),
            end_date: holiday.end_date.to_string(),
            ..Self::default()
        }
    }
}

impl SnapshotCsvRecord {
    fn into_row(self) -> PersistenceResult<Row> {
        let id: RowId = self
            .id
            .parse()
            .map_err(|err: crate::row::RowIdParseError| {
                PersistenceError::InvalidData(err.to_string())
            })?;
        let kind = RowKind::parse(&self.row_kind).ok_or_else(|| {
            PersistenceError::InvalidData(format!("bad row kind '{}'", self.row_kind))
        })?;
        Ok(Row {
            id,
            label: self.label,
            kind,
        })
    }

    fn into_task(self) -> PersistenceResult<Task> {
        let id = self
            .id
            .parse::<TaskId>()
            .map_err(|_| PersistenceError::InvalidData(format!("bad task id '{}'", self.id)))?;
        let category = TaskCategory::parse(&self.category).ok_or_else(|| {
            PersistenceError::InvalidData(format!("bad task category '{}'", self.category))
        })?;
        let row_id: RowId = self
            .row_id
            .parse()
            .map_err(|err: crate::row::RowIdParseError| {
                PersistenceError::InvalidData(err.to_string())
            })?;
        let status = TaskStatus::parse(&self.status).ok_or_else(|| {
            PersistenceError::InvalidData(format!("bad task status '{}'", self.status))
        })?;
        Ok(Task {
            id,
            name: self.name,
            category,
            row_id,
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
            status,
            depends_on: split_ids(&self.depends_on)?,
            protocol: optional(&self.protocol),
            manufacturer: optional(&self.manufacturer),
            observations: optional(&self.observations),
        })
    }

    fn into_holiday(self) -> PersistenceResult<Holiday> {
        let id = self
            .id
            .parse()
            .map_err(|_| PersistenceError::InvalidData(format!("bad holiday id '{}'", self.id)))?;
        Ok(Holiday {
            id,
            name: self.name,
            start_date: parse_date(&self.start_date)?,
            end_date: parse_date(&self.end_date)?,
        })
    }
}

pub fn save_snapshot_to_csv<P: AsRef<Path>>(
    snapshot: &ScheduleSnapshot,
    path: P,
) -> PersistenceResult<()> {
    validate_snapshot(snapshot)?;
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for row in &snapshot.rows {
        writer.serialize(SnapshotCsvRecord::from(row))?;
    }
    for task in &snapshot.tasks {
        writer.serialize(SnapshotCsvRecord::from(task))?;
    }
    for holiday in &snapshot.holidays {
        writer.serialize(SnapshotCsvRecord::from(holiday))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_snapshot_from_csv<P: AsRef<Path>>(path: P) -> PersistenceResult<ScheduleSnapshot> {
    let file = File::open(path)?;
    let mut reader = csv::Reader::from_reader(file);
    let mut snapshot = ScheduleSnapshot {
        rows: Vec::new(),
        tasks: Vec::new(),
        holidays: Vec::new(),
    };
    for result in reader.deserialize::<SnapshotCsvRecord>() {
        let record = result?;
        match record.record.as_str() {
            "row" => snapshot.rows.push(record.into_row()?),
            "task" => snapshot.tasks.push(record.into_task()?),
            "holiday" => snapshot.holidays.push(record.into_holiday()?),
            other => {
                return Err(PersistenceError::InvalidData(format!(
                    "unknown record type '{other}'"
                )));
            }
        }
    }
    validate_snapshot(&snapshot)?;
    Ok(snapshot)
}

/// Path-bound JSON store for the persistence collaborator seam.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn save_snapshot(&self, snapshot: &ScheduleSnapshot) -> PersistenceResult<()> {
        save_snapshot_to_json(snapshot, &self.path)
    }

    fn load_snapshot(&self) -> PersistenceResult<Option<ScheduleSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_snapshot_from_json(&self.path).map(Some)
    }
}

pub struct CsvFileStore {
    path: PathBuf,
}

impl CsvFileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotStore for CsvFileStore {
    fn save_snapshot(&self, snapshot: &ScheduleSnapshot) -> PersistenceResult<()> {
        save_snapshot_to_csv(snapshot, &self.path)
    }

    fn load_snapshot(&self) -> PersistenceResult<Option<ScheduleSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_snapshot_from_csv(&self.path).map(Some)
    }
}
