use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::graph::{DependencyDag, earliest_start};
use crate::row::RowId;
use crate::state::ScheduleState;
use crate::task::{Task, TaskCategory, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// The proposed dates conflict with the ordering constraint of the
    /// named task (a prerequisite that ends too late, or a dependent
    /// that starts too early).
    DependencyViolation(TaskId),
    RowCategoryMismatch { row: RowId, category: TaskCategory },
    RowNotFound(RowId),
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlacementError::DependencyViolation(task_id) => {
                write!(f, "placement conflicts with the ordering constraint of task {task_id}")
            }
            PlacementError::RowCategoryMismatch { row, category } => {
                write!(f, "row {row} cannot host {category} tasks")
            }
            PlacementError::RowNotFound(row) => write!(f, "row {row} not found"),
        }
    }
}

impl std::error::Error for PlacementError {}

/// What to do with dependents when a prerequisite moves later. `Reject`
/// suits interactive drags (the gesture fails and names the conflicting
/// task); `Cascade` suits batch reschedules (dependents are rigidly
/// shifted by the same calendar-day delta).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentMovePolicy {
    #[default]
    Reject,
    Cascade,
}

/// A validated (row, dates) assignment for one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub task_id: TaskId,
    pub row_id: RowId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Outcome of planning a move or resize: the placement the caller asked
/// for plus any dependent placements a cascade produced. Planning never
/// mutates; the session turns an accepted plan into commands.
#[derive(Debug, Clone, PartialEq)]
pub struct MovePlan {
    pub primary: Placement,
    pub cascaded: Vec<Placement>,
}

/// Validates a drag of `task` to `new_row` starting at `new_start`. The
/// task keeps its duration in calendar days; activities legitimately
/// span weekends and holidays, so non-working days do not constrain the
/// dates.
pub fn plan_move(
    state: &ScheduleState,
    task: &Task,
    new_row: &RowId,
    new_start: NaiveDate,
    policy: DependentMovePolicy,
) -> Result<MovePlan, PlacementError> {
    let calendar = state.calendar();
    let new_end = calendar.shift_by_calendar_days(new_start, task.duration_days());

    check_prerequisites(state, task, new_start)?;
    let delta = (new_start - task.start_date).num_days();
    let cascaded = check_dependents(state, task, new_end, delta, policy)?;
    check_row(state, new_row, task.category)?;

    Ok(MovePlan {
        primary: Placement {
            task_id: task.id,
            row_id: new_row.clone(),
            start_date: new_start,
            end_date: new_end,
        },
        cascaded,
    })
}

/// Validates a drag-handle duration change: the start stays fixed and
/// only the end date varies. Same validation path as a move.
pub fn plan_resize(
    state: &ScheduleState,
    task: &Task,
    new_end: NaiveDate,
    policy: DependentMovePolicy,
) -> Result<MovePlan, PlacementError> {
    check_prerequisites(state, task, task.start_date)?;
    let delta = (new_end - task.end_date).num_days();
    let cascaded = check_dependents(state, task, new_end, delta, policy)?;
    check_row(state, &task.row_id, task.category)?;

    Ok(MovePlan {
        primary: Placement {
            task_id: task.id,
            row_id: task.row_id.clone(),
            start_date: task.start_date,
            end_date: new_end,
        },
        cascaded,
    })
}

fn check_prerequisites(
    state: &ScheduleState,
    task: &Task,
    new_start: NaiveDate,
) -> Result<(), PlacementError> {
    let Some(earliest) = earliest_start(&state.tasks, task.id) else {
        return Ok(());
    };
    if new_start >= earliest {
        return Ok(());
    }
    // Name the prerequisite that pins the earliest start.
    let blocking = task
        .depends_on
        .iter()
        .filter_map(|id| state.tasks.get(id))
        .max_by_key(|prerequisite| (prerequisite.end_date, prerequisite.id))
        .map(|prerequisite| prerequisite.id)
        .unwrap_or(task.id);
    Err(PlacementError::DependencyViolation(blocking))
}

fn check_dependents(
    state: &ScheduleState,
    task: &Task,
    new_end: NaiveDate,
    delta_days: i64,
    policy: DependentMovePolicy,
) -> Result<Vec<Placement>, PlacementError> {
    let dag = DependencyDag::build(&state.tasks);

    match policy {
        DependentMovePolicy::Reject => {
            for dependent_id in dag.direct_dependents(task.id) {
                if let Some(dependent) = state.tasks.get(&dependent_id) {
                    if dependent.start_date < new_end {
                        return Err(PlacementError::DependencyViolation(dependent_id));
                    }
                }
            }
            Ok(Vec::new())
        }
        DependentMovePolicy::Cascade => {
            if delta_days <= 0 {
                // Moving earlier or shrinking can never squeeze a dependent.
                return Ok(Vec::new());
            }
            let mut planned_ends: HashMap<TaskId, NaiveDate> = HashMap::new();
            planned_ends.insert(task.id, new_end);
            let mut cascaded = Vec::new();

            for dependent_id in dag.transitive_dependents(task.id) {
                let Some(dependent) = state.tasks.get(&dependent_id) else {
                    continue;
                };
                let earliest = dependent
                    .depends_on
                    .iter()
                    .filter_map(|id| {
                        planned_ends
                            .get(id)
                            .copied()
                            .or_else(|| state.tasks.get(id).map(|t| t.end_date))
                    })
                    .max();
                let Some(earliest) = earliest else { continue };
                if dependent.start_date >= earliest {
                    continue;
                }
                let shifted_start = dependent.start_date + chrono::Duration::days(delta_days);
                let shifted_end = dependent.end_date + chrono::Duration::days(delta_days);
                planned_ends.insert(dependent_id, shifted_end);
                cascaded.push(Placement {
                    task_id: dependent_id,
                    row_id: dependent.row_id.clone(),
                    start_date: shifted_start,
                    end_date: shifted_end,
                });
            }
            Ok(cascaded)
        }
    }
}

pub(crate) fn check_row(
    state: &ScheduleState,
    row_id: &RowId,
    category: TaskCategory,
) -> Result<(), PlacementError> {
    let Some(row) = state.row(row_id) else {
        return Err(PlacementError::RowNotFound(row_id.clone()));
    };
    if !row.kind.hosts(category) {
        return Err(PlacementError::RowCategoryMismatch {
            row: row_id.clone(),
            category,
        });
    }
    Ok(())
}
