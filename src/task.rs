use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::row::RowId;

pub type TaskId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskCategory {
    EfficiencyAssay,
    SafetyAssay,
    Calibration,
    Vacation,
}

impl TaskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskCategory::EfficiencyAssay => "efficiency_assay",
            TaskCategory::SafetyAssay => "safety_assay",
            TaskCategory::Calibration => "calibration",
            TaskCategory::Vacation => "vacation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "efficiency_assay" => Some(TaskCategory::EfficiencyAssay),
            "safety_assay" => Some(TaskCategory::SafetyAssay),
            "calibration" => Some(TaskCategory::Calibration),
            "vacation" => Some(TaskCategory::Vacation),
            _ => None,
        }
    }

    pub fn variants() -> [(&'static str, &'static str); 4] {
        [
            ("efficiency_assay", "Efficiency assay on a terminal row"),
            ("safety_assay", "Safety assay handled by a technician"),
            ("calibration", "Equipment calibration window"),
            ("vacation", "Vacation or company holiday block"),
        ]
    }
}

impl std::fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    ReportIssued,
    Completed,
}

impl TaskStatus {
    /// Terminal statuses retire a task in place; it stays on the board
    /// with its final status instead of disappearing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::ReportIssued | TaskStatus::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::ReportIssued => "report_issued",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "report_issued" => Some(TaskStatus::ReportIssued),
            "completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A schedulable unit: an assay, calibration window, or vacation block
/// occupying a row for an inclusive date span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub category: TaskCategory,
    pub row_id: RowId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: TaskStatus,
    /// Ids of tasks that must end before this one starts, in the order
    /// the dependencies were declared.
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl Task {
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        category: TaskCategory,
        row_id: RowId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category,
            row_id,
            start_date,
            end_date,
            status: TaskStatus::Pending,
            depends_on: Vec::new(),
            protocol: None,
            manufacturer: None,
            observations: None,
        }
    }

    /// Duration in calendar days, inclusive of both endpoints' gap:
    /// a one-day task has duration 0.
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Input for creating a task; the session allocates the id and sets the
/// initial status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub name: String,
    pub category: TaskCategory,
    pub row_id: RowId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub depends_on: Vec<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl NewTask {
    pub fn new(
        name: impl Into<String>,
        category: TaskCategory,
        row_id: RowId,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            row_id,
            start_date,
            end_date,
            depends_on: Vec::new(),
            protocol: None,
            manufacturer: None,
            observations: None,
        }
    }
}

/// Partial update of a task's descriptive fields. Dates and the owning
/// row change only through move/resize; dependencies through the
/// dedicated dependency operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observations: Option<String>,
}

impl TaskEdit {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub(crate) fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(protocol) = &self.protocol {
            task.protocol = Some(protocol.clone());
        }
        if let Some(manufacturer) = &self.manufacturer {
            task.manufacturer = Some(manufacturer.clone());
        }
        if let Some(observations) = &self.observations {
            task.observations = Some(observations.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::RowId;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn duration_is_in_calendar_days() {
        let task = Task::new(
            1,
            "Ensaio 42",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 3, 10),
            d(2025, 3, 14),
        );
        assert_eq!(task.duration_days(), 4);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(TaskStatus::ReportIssued.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
    }

    #[test]
    fn category_round_trips_through_parse() {
        for (key, _) in TaskCategory::variants() {
            let parsed = TaskCategory::parse(key).unwrap();
            assert_eq!(parsed.as_str(), key);
        }
        assert!(TaskCategory::parse("unknown").is_none());
    }
}
