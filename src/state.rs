use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;

use crate::calendar::{self, Holiday, HolidayId, WorkCalendar};
use crate::graph::DependencyDag;
use crate::persistence::ScheduleSnapshot;
use crate::row::{Row, RowId, RowKind, letter_code, letter_ordinal};
use crate::task::{Task, TaskId};

#[derive(Debug, Clone)]
pub struct SnapshotValidationError {
    message: String,
}

impl SnapshotValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for SnapshotValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SnapshotValidationError {}

/// The complete scheduling surface at one point in time: every row, task
/// and holiday, plus the id allocation counters. The session keeps two
/// of these (staged overlay and last-committed snapshot); equality
/// between them is the clean/dirty test.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleState {
    pub(crate) tasks: BTreeMap<TaskId, Task>,
    pub(crate) rows: BTreeMap<RowId, Row>,
    pub(crate) holidays: BTreeMap<HolidayId, Holiday>,
    pub(crate) next_task_id: TaskId,
    pub(crate) efficiency_rows_allocated: u32,
    pub(crate) safety_rows_allocated: u32,
    pub(crate) next_holiday_id: HolidayId,
}

impl Default for ScheduleState {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleState {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            rows: BTreeMap::new(),
            holidays: BTreeMap::new(),
            next_task_id: 1,
            efficiency_rows_allocated: 0,
            safety_rows_allocated: 0,
            next_holiday_id: 1,
        }
    }

    /// Fresh surface with the built-in lanes: two terminal rows for the
    /// efficiency bench and one technician row.
    pub fn with_default_rows() -> Self {
        let mut state = Self::new();
        for (index, label) in [(1, "Terminal 1"), (2, "Terminal 2")] {
            let row = Row::with_label(RowId::Index(index), RowKind::Efficiency, label);
            state.rows.insert(row.id.clone(), row);
        }
        let safety = Row::new(RowId::Letter("A".to_string()), RowKind::Safety);
        state.rows.insert(safety.id.clone(), safety);
        state.efficiency_rows_allocated = 2;
        state.safety_rows_allocated = 1;
        state
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn row(&self, id: &RowId) -> Option<&Row> {
        self.rows.get(id)
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.rows.values()
    }

    pub fn holiday(&self, id: HolidayId) -> Option<&Holiday> {
        self.holidays.get(&id)
    }

    pub fn holidays(&self) -> impl Iterator<Item = &Holiday> {
        self.holidays.values()
    }

    /// Ids of tasks hosted on `row`, ascending.
    pub fn tasks_on_row(&self, row: &RowId) -> Vec<TaskId> {
        self.tasks
            .values()
            .filter(|task| &task.row_id == row)
            .map(|task| task.id)
            .collect()
    }

    /// The id the next `add_row` call of this kind will receive. Counters
    /// only ever grow on allocation, so deletion never frees an id.
    pub fn next_row_id(&self, kind: RowKind) -> RowId {
        match kind {
            RowKind::Efficiency => RowId::Index(self.efficiency_rows_allocated + 1),
            RowKind::Safety => RowId::Letter(letter_code(self.safety_rows_allocated)),
        }
    }

    pub fn calendar(&self) -> WorkCalendar {
        WorkCalendar::from_holidays(self.holidays.values())
    }

    pub fn upcoming_holidays(&self, from: NaiveDate, horizon_days: i64) -> Vec<&Holiday> {
        calendar::upcoming_holidays(self.holidays.values(), from, horizon_days)
    }

    pub fn to_snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            rows: self.rows.values().cloned().collect(),
            tasks: self.tasks.values().cloned().collect(),
            holidays: self.holidays.values().cloned().collect(),
        }
    }

    /// Rebuilds a state from a loaded snapshot, deriving the allocation
    /// counters and refusing anything structurally inconsistent.
    pub fn from_snapshot(snapshot: &ScheduleSnapshot) -> Result<Self, SnapshotValidationError> {
        let mut state = Self::new();

        for row in &snapshot.rows {
            if state.rows.insert(row.id.clone(), row.clone()).is_some() {
                return Err(SnapshotValidationError::new(format!(
                    "duplicate row id {}",
                    row.id
                )));
            }
        }
        for task in &snapshot.tasks {
            if state.tasks.insert(task.id, task.clone()).is_some() {
                return Err(SnapshotValidationError::new(format!(
                    "duplicate task id {}",
                    task.id
                )));
            }
        }
        for holiday in &snapshot.holidays {
            if state
                .holidays
                .insert(holiday.id, holiday.clone())
                .is_some()
            {
                return Err(SnapshotValidationError::new(format!(
                    "duplicate holiday id {}",
                    holiday.id
                )));
            }
        }

        state.next_task_id = state.tasks.keys().max().map_or(1, |max| max + 1);
        state.next_holiday_id = state.holidays.keys().max().map_or(1, |max| max + 1);
        for row in state.rows.values() {
            match &row.id {
                RowId::Index(index) => {
                    state.efficiency_rows_allocated = state.efficiency_rows_allocated.max(*index);
                }
                RowId::Letter(code) => {
                    let Some(ordinal) = letter_ordinal(code) else {
                        return Err(SnapshotValidationError::new(format!(
                            "row id {} is not a valid letter code",
                            row.id
                        )));
                    };
                    state.safety_rows_allocated = state.safety_rows_allocated.max(ordinal + 1);
                }
            }
        }

        state.validate()?;
        Ok(state)
    }

    /// Structural integrity of the whole surface: interval order, row
    /// references, hosting rules, dependency references and acyclicity.
    pub fn validate(&self) -> Result<(), SnapshotValidationError> {
        for task in self.tasks.values() {
            if task.end_date < task.start_date {
                return Err(SnapshotValidationError::new(format!(
                    "task {} ends {} before it starts {}",
                    task.id, task.end_date, task.start_date
                )));
            }
            let Some(row) = self.rows.get(&task.row_id) else {
                return Err(SnapshotValidationError::new(format!(
                    "task {} references missing row {}",
                    task.id, task.row_id
                )));
            };
            if !row.kind.hosts(task.category) {
                return Err(SnapshotValidationError::new(format!(
                    "task {} ({}) cannot sit on {} row {}",
                    task.id, task.category, row.kind, row.id
                )));
            }
            for prerequisite in &task.depends_on {
                if *prerequisite == task.id {
                    return Err(SnapshotValidationError::new(format!(
                        "task {} depends on itself",
                        task.id
                    )));
                }
                if !self.tasks.contains_key(prerequisite) {
                    return Err(SnapshotValidationError::new(format!(
                        "task {} depends on missing task {}",
                        task.id, prerequisite
                    )));
                }
            }
        }

        for holiday in self.holidays.values() {
            if holiday.end_date < holiday.start_date {
                return Err(SnapshotValidationError::new(format!(
                    "holiday {} ends before it starts",
                    holiday.id
                )));
            }
        }

        DependencyDag::build(&self.tasks)
            .ensure_acyclic()
            .map_err(SnapshotValidationError::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rows_reserve_their_ids() {
        let state = ScheduleState::with_default_rows();
        assert_eq!(state.next_row_id(RowKind::Efficiency), RowId::Index(3));
        assert_eq!(
            state.next_row_id(RowKind::Safety),
            RowId::Letter("B".to_string())
        );
    }

    #[test]
    fn snapshot_round_trip_preserves_counters() {
        let state = ScheduleState::with_default_rows();
        let snapshot = state.to_snapshot();
        let rebuilt = ScheduleState::from_snapshot(&snapshot).unwrap();
        assert_eq!(rebuilt, state);
    }

    #[test]
    fn duplicate_task_ids_are_rejected() {
        let mut snapshot = ScheduleState::with_default_rows().to_snapshot();
        let task = Task::new(
            1,
            "Dup",
            crate::task::TaskCategory::Calibration,
            RowId::Index(1),
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 7).unwrap(),
        );
        snapshot.tasks.push(task.clone());
        snapshot.tasks.push(task);
        let err = ScheduleState::from_snapshot(&snapshot).unwrap_err();
        assert!(err.to_string().contains("duplicate task id"));
    }
}
