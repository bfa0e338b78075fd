use std::io::Write;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::row::{RowId, RowKind};
use crate::state::ScheduleState;
use crate::task::{TaskCategory, TaskId, TaskStatus};

/// One task as the rendering collaborator sees it: row label resolved,
/// duration computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub name: String,
    pub category: TaskCategory,
    pub row_id: RowId,
    pub row_label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub status: TaskStatus,
    pub depends_on: Vec<TaskId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowView {
    pub id: RowId,
    pub label: String,
    pub kind: RowKind,
    pub task_count: usize,
}

/// Read-only projection of the staged overlay, rebuilt after every
/// successful mutation or undo/redo step. Row labels are always resolved
/// from the registry, so a rename reaches every surface that lists rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleProjection {
    pub rows: Vec<RowView>,
    pub tasks: Vec<TaskView>,
}

impl ScheduleProjection {
    pub fn from_state(state: &ScheduleState) -> Self {
        let rows = state
            .rows()
            .map(|row| RowView {
                id: row.id.clone(),
                label: row.label.clone(),
                kind: row.kind,
                task_count: state.tasks_on_row(&row.id).len(),
            })
            .collect();

        let mut tasks: Vec<TaskView> = state
            .tasks()
            .map(|task| {
                let row_label = state
                    .row(&task.row_id)
                    .map(|row| row.label.clone())
                    .unwrap_or_default();
                TaskView {
                    id: task.id,
                    name: task.name.clone(),
                    category: task.category,
                    row_id: task.row_id.clone(),
                    row_label,
                    start_date: task.start_date,
                    end_date: task.end_date,
                    duration_days: task.duration_days(),
                    status: task.status,
                    depends_on: task.depends_on.clone(),
                }
            })
            .collect();
        tasks.sort_by(|a, b| {
            (&a.row_id, a.start_date, a.id).cmp(&(&b.row_id, b.start_date, b.id))
        });

        Self { rows, tasks }
    }

    pub fn task(&self, id: TaskId) -> Option<&TaskView> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Flat CSV export for report tooling.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        for task in &self.tasks {
            out.serialize(TaskExportRecord::from(task))?;
        }
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct TaskExportRecord {
    id: TaskId,
    name: String,
    category: String,
    row: String,
    row_label: String,
    start_date: String,
    end_date: String,
    duration_days: i64,
    status: String,
    depends_on: String,
}

impl From<&TaskView> for TaskExportRecord {
    fn from(view: &TaskView) -> Self {
        Self {
            id: view.id,
            name: view.name.clone(),
            category: view.category.as_str().to_string(),
            row: view.row_id.to_string(),
            row_label: view.row_label.clone(),
            start_date: view.start_date.to_string(),
            end_date: view.end_date.to_string(),
            duration_days: view.duration_days,
            status: view.status.as_str().to_string(),
            depends_on: view
                .depends_on
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn projection_resolves_row_labels() {
        let mut state = ScheduleState::with_default_rows();
        let task = Task::new(
            1,
            "Ensaio",
            TaskCategory::EfficiencyAssay,
            RowId::Index(2),
            d(2025, 4, 1),
            d(2025, 4, 3),
        );
        state.tasks.insert(1, task);
        state.next_task_id = 2;

        let projection = ScheduleProjection::from_state(&state);
        let view = projection.task(1).unwrap();
        assert_eq!(view.row_label, "Terminal 2");
        assert_eq!(view.duration_days, 2);
    }

    #[test]
    fn csv_export_flattens_dependencies() {
        let mut state = ScheduleState::with_default_rows();
        let mut task = Task::new(
            1,
            "Ensaio",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 4, 1),
            d(2025, 4, 3),
        );
        task.depends_on = vec![7, 9];
        state.tasks.insert(1, task);

        let projection = ScheduleProjection::from_state(&state);
        let mut buffer = Vec::new();
        projection.write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.contains("7;9"));
        assert!(text.contains("Terminal 1"));
    }
}
