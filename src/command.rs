use chrono::NaiveDate;

use crate::row::{Row, RowId, RowKind};
use crate::state::ScheduleState;
use crate::task::{Task, TaskId};

/// Record of a dependency link removed when its prerequisite was
/// deleted: which dependent lost the reference and where it sat in that
/// dependent's `depends_on` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeveredLink {
    pub dependent: TaskId,
    pub position: usize,
}

/// One accepted mutation of the scheduling surface, carrying enough
/// state to apply itself and to revert itself exactly. Everything the
/// session accepts becomes one of these; undo/redo replays them.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddTask {
        task: Task,
    },
    MoveTask {
        task_id: TaskId,
        from_row: RowId,
        from_start: NaiveDate,
        from_end: NaiveDate,
        to_row: RowId,
        to_start: NaiveDate,
        to_end: NaiveDate,
    },
    EditTask {
        before: Task,
        after: Task,
    },
    DeleteTask {
        task: Task,
        severed: Vec<SeveredLink>,
    },
    AddRow {
        row: Row,
    },
    RenameRow {
        row_id: RowId,
        from: String,
        to: String,
    },
    DeleteRow {
        row: Row,
    },
    /// Several commands applied as one undo unit (cascaded row deletion,
    /// cascaded reschedules).
    Compound(Vec<Command>),
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::AddTask { .. } => "add_task",
            Command::MoveTask { .. } => "move_task",
            Command::EditTask { .. } => "edit_task",
            Command::DeleteTask { .. } => "delete_task",
            Command::AddRow { .. } => "add_row",
            Command::RenameRow { .. } => "rename_row",
            Command::DeleteRow { .. } => "delete_row",
            Command::Compound(_) => "compound",
        }
    }

    pub fn apply(&self, state: &mut ScheduleState) {
        match self {
            Command::AddTask { task } => {
                state.tasks.insert(task.id, task.clone());
                state.next_task_id += 1;
            }
            Command::MoveTask {
                task_id,
                to_row,
                to_start,
                to_end,
                ..
            } => {
                if let Some(task) = state.tasks.get_mut(task_id) {
                    task.row_id = to_row.clone();
                    task.start_date = *to_start;
                    task.end_date = *to_end;
                }
            }
            Command::EditTask { after, .. } => {
                state.tasks.insert(after.id, after.clone());
            }
            Command::DeleteTask { task, severed } => {
                state.tasks.remove(&task.id);
                for link in severed {
                    if let Some(dependent) = state.tasks.get_mut(&link.dependent) {
                        dependent.depends_on.retain(|id| *id != task.id);
                    }
                }
            }
            Command::AddRow { row } => {
                state.rows.insert(row.id.clone(), row.clone());
                match row.kind {
                    RowKind::Efficiency => state.efficiency_rows_allocated += 1,
                    RowKind::Safety => state.safety_rows_allocated += 1,
                }
            }
            Command::RenameRow { row_id, to, .. } => {
                if let Some(row) = state.rows.get_mut(row_id) {
                    row.label = to.clone();
                }
            }
            Command::DeleteRow { row } => {
                state.rows.remove(&row.id);
            }
            Command::Compound(commands) => {
                for command in commands {
                    command.apply(state);
                }
            }
        }
    }

    pub fn revert(&self, state: &mut ScheduleState) {
        match self {
            Command::AddTask { task } => {
                state.tasks.remove(&task.id);
                state.next_task_id -= 1;
            }
            Command::MoveTask {
                task_id,
                from_row,
                from_start,
                from_end,
                ..
            } => {
                if let Some(task) = state.tasks.get_mut(task_id) {
                    task.row_id = from_row.clone();
                    task.start_date = *from_start;
                    task.end_date = *from_end;
                }
            }
            Command::EditTask { before, .. } => {
                state.tasks.insert(before.id, before.clone());
            }
            Command::DeleteTask { task, severed } => {
                state.tasks.insert(task.id, task.clone());
                for link in severed {
                    if let Some(dependent) = state.tasks.get_mut(&link.dependent) {
                        dependent.depends_on.insert(link.position, task.id);
                    }
                }
            }
            Command::AddRow { row } => {
                state.rows.remove(&row.id);
                match row.kind {
                    RowKind::Efficiency => state.efficiency_rows_allocated -= 1,
                    RowKind::Safety => state.safety_rows_allocated -= 1,
                }
            }
            Command::RenameRow { row_id, from, .. } => {
                if let Some(row) = state.rows.get_mut(row_id) {
                    row.label = from.clone();
                }
            }
            Command::DeleteRow { row } => {
                state.rows.insert(row.id.clone(), row.clone());
            }
            Command::Compound(commands) => {
                for command in commands.iter().rev() {
                    command.revert(state);
                }
            }
        }
    }
}
