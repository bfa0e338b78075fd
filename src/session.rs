use std::fmt;

use chrono::NaiveDate;

use crate::calendar::{Holiday, HolidayId, WorkCalendar};
use crate::command::{Command, SeveredLink};
use crate::graph::{DependencyDag, GraphError};
use crate::history::UndoStack;
use crate::persistence::{PersistenceError, ScheduleSnapshot, SnapshotStore};
use crate::placement::{
    self, DependentMovePolicy, MovePlan, Placement, PlacementError, plan_move, plan_resize,
};
use crate::projection::ScheduleProjection;
use crate::row::{RegistryError, Row, RowId, RowKind};
use crate::state::ScheduleState;
use crate::task::{NewTask, Task, TaskEdit, TaskId, TaskStatus};

/// Role supplied by the identity collaborator. Viewers may read and
/// navigate; every mutating operation is rejected for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Administrator,
    Technician,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    CommitInProgress,
    PersistFailed(String),
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionError::CommitInProgress => {
                f.write_str("a commit is already in progress")
            }
            TransactionError::PersistFailed(message) => {
                write!(f, "persisting the schedule failed: {message}")
            }
        }
    }
}

impl std::error::Error for TransactionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Placement(PlacementError),
    Graph(GraphError),
    Registry(RegistryError),
    Transaction(TransactionError),
    PermissionDenied,
    TaskNotFound(TaskId),
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Placement(err) => err.fmt(f),
            EngineError::Graph(err) => err.fmt(f),
            EngineError::Registry(err) => err.fmt(f),
            EngineError::Transaction(err) => err.fmt(f),
            EngineError::PermissionDenied => {
                f.write_str("the viewer role cannot modify the schedule")
            }
            EngineError::TaskNotFound(id) => write!(f, "task {id} not found"),
            EngineError::InvalidDateRange { start, end } => {
                write!(f, "end date {end} precedes start date {start}")
            }
        }
    }
}

impl std::error::Error for EngineError {}

impl From<PlacementError> for EngineError {
    fn from(value: PlacementError) -> Self {
        EngineError::Placement(value)
    }
}

impl From<GraphError> for EngineError {
    fn from(value: GraphError) -> Self {
        EngineError::Graph(value)
    }
}

impl From<RegistryError> for EngineError {
    fn from(value: RegistryError) -> Self {
        EngineError::Registry(value)
    }
}

impl From<TransactionError> for EngineError {
    fn from(value: TransactionError) -> Self {
        EngineError::Transaction(value)
    }
}

/// Rendering collaborator boundary: receives the refreshed projection
/// after every successful mutation, undo/redo step, discard or load.
pub trait RenderSink {
    fn schedule_changed(&mut self, projection: &ScheduleProjection);
}

/// One interactive editing session over the scheduling surface. Owns the
/// staged overlay, the last-committed snapshot, and the command history;
/// all mutations pass through its named operations so every accepted
/// change is an invertible command and every rejected one leaves the
/// overlay untouched.
pub struct ScheduleSession {
    overlay: ScheduleState,
    committed: ScheduleState,
    history: UndoStack,
    role: Role,
    commit_in_flight: Option<ScheduleState>,
    render_sink: Option<Box<dyn RenderSink + Send + Sync>>,
}

impl std::fmt::Debug for ScheduleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleSession")
            .field("overlay", &self.overlay)
            .field("committed", &self.committed)
            .field("history", &self.history)
            .field("role", &self.role)
            .field("commit_in_flight", &self.commit_in_flight)
            .field("render_sink", &self.render_sink.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl ScheduleSession {
    pub fn new(role: Role) -> Self {
        Self::with_state(ScheduleState::new(), role)
    }

    /// Fresh session seeded with the built-in rows.
    pub fn with_default_rows(role: Role) -> Self {
        Self::with_state(ScheduleState::with_default_rows(), role)
    }

    /// Session over an already-validated state; the overlay starts equal
    /// to the committed snapshot.
    pub fn with_state(state: ScheduleState, role: Role) -> Self {
        Self {
            overlay: state.clone(),
            committed: state,
            history: UndoStack::new(),
            role,
            commit_in_flight: None,
            render_sink: None,
        }
    }

    /// Initializes a session from the persistence collaborator. A
    /// missing snapshot surfaces as `NotFound`; a corrupt one as
    /// `InvalidData`, and the engine refuses to run on partial data.
    pub fn load(store: &dyn SnapshotStore, role: Role) -> Result<Self, PersistenceError> {
        let snapshot = store.load_snapshot()?.ok_or(PersistenceError::NotFound)?;
        let state = ScheduleState::from_snapshot(&snapshot)
            .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
        Ok(Self::with_state(state, role))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn overlay(&self) -> &ScheduleState {
        &self.overlay
    }

    pub fn last_committed(&self) -> &ScheduleState {
        &self.committed
    }

    /// Clean means the overlay is exactly the last-committed snapshot.
    pub fn dirty(&self) -> bool {
        self.overlay != self.committed
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn projection(&self) -> ScheduleProjection {
        ScheduleProjection::from_state(&self.overlay)
    }

    pub fn calendar(&self) -> WorkCalendar {
        self.overlay.calendar()
    }

    pub fn upcoming_holidays(&self, from: NaiveDate, horizon_days: i64) -> Vec<&Holiday> {
        self.overlay.upcoming_holidays(from, horizon_days)
    }

    pub fn set_render_sink(&mut self, sink: Box<dyn RenderSink + Send + Sync>) {
        self.render_sink = Some(sink);
    }

    fn ensure_mutable(&self) -> Result<(), EngineError> {
        if self.role == Role::Viewer {
            return Err(EngineError::PermissionDenied);
        }
        Ok(())
    }

    fn notify_render(&mut self) {
        if self.render_sink.is_some() {
            let projection = ScheduleProjection::from_state(&self.overlay);
            if let Some(sink) = self.render_sink.as_mut() {
                sink.schedule_changed(&projection);
            }
        }
    }

    fn apply_command(&mut self, command: Command) {
        tracing::debug!(command = command.kind(), "staged mutation accepted");
        command.apply(&mut self.overlay);
        self.history.push(command);
        self.notify_render();
    }

    fn move_command_for(task: &Task, placement: &Placement) -> Command {
        Command::MoveTask {
            task_id: task.id,
            from_row: task.row_id.clone(),
            from_start: task.start_date,
            from_end: task.end_date,
            to_row: placement.row_id.clone(),
            to_start: placement.start_date,
            to_end: placement.end_date,
        }
    }

    fn severed_links(state: &ScheduleState, task_id: TaskId) -> Vec<SeveredLink> {
        state
            .tasks
            .values()
            .filter_map(|task| {
                task.depends_on
                    .iter()
                    .position(|id| *id == task_id)
                    .map(|position| SeveredLink {
                        dependent: task.id,
                        position,
                    })
            })
            .collect()
    }

    fn plan_into_command(&self, task: &Task, plan: &MovePlan) -> Command {
        let primary = Self::move_command_for(task, &plan.primary);
        if plan.cascaded.is_empty() {
            return primary;
        }
        let mut commands = vec![primary];
        for placement in &plan.cascaded {
            if let Some(dependent) = self.overlay.task(placement.task_id) {
                commands.push(Self::move_command_for(dependent, placement));
            }
        }
        Command::Compound(commands)
    }

    // ---- task operations -------------------------------------------------

    pub fn add_task(&mut self, new_task: NewTask) -> Result<TaskId, EngineError> {
        self.ensure_mutable()?;
        if new_task.end_date < new_task.start_date {
            return Err(EngineError::InvalidDateRange {
                start: new_task.start_date,
                end: new_task.end_date,
            });
        }
        placement::check_row(&self.overlay, &new_task.row_id, new_task.category)?;
        for prerequisite in &new_task.depends_on {
            let Some(found) = self.overlay.task(*prerequisite) else {
                return Err(EngineError::TaskNotFound(*prerequisite));
            };
            if new_task.start_date < found.end_date {
                return Err(PlacementError::DependencyViolation(found.id).into());
            }
        }

        let id = self.overlay.next_task_id;
        let mut task = Task::new(
            id,
            new_task.name,
            new_task.category,
            new_task.row_id,
            new_task.start_date,
            new_task.end_date,
        );
        task.depends_on = new_task.depends_on;
        task.protocol = new_task.protocol;
        task.manufacturer = new_task.manufacturer;
        task.observations = new_task.observations;

        self.apply_command(Command::AddTask { task });
        Ok(id)
    }

    /// Drag-and-drop reschedule. The task keeps its calendar-day
    /// duration; validation happens strictly before any mutation.
    pub fn move_task(
        &mut self,
        task_id: TaskId,
        new_row: RowId,
        new_start: NaiveDate,
        policy: DependentMovePolicy,
    ) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let task = self
            .overlay
            .task(task_id)
            .ok_or(EngineError::TaskNotFound(task_id))?
            .clone();
        let plan = plan_move(&self.overlay, &task, &new_row, new_start, policy)?;
        let command = self.plan_into_command(&task, &plan);
        self.apply_command(command);
        Ok(())
    }

    /// Drag-handle duration change: start fixed, end varies.
    pub fn resize_task(
        &mut self,
        task_id: TaskId,
        new_end: NaiveDate,
        policy: DependentMovePolicy,
    ) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let task = self
            .overlay
            .task(task_id)
            .ok_or(EngineError::TaskNotFound(task_id))?
            .clone();
        if new_end < task.start_date {
            return Err(EngineError::InvalidDateRange {
                start: task.start_date,
                end: new_end,
            });
        }
        let plan = plan_resize(&self.overlay, &task, new_end, policy)?;
        let command = self.plan_into_command(&task, &plan);
        self.apply_command(command);
        Ok(())
    }

    pub fn edit_task(&mut self, task_id: TaskId, edit: TaskEdit) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let before = self
            .overlay
            .task(task_id)
            .ok_or(EngineError::TaskNotFound(task_id))?
            .clone();
        let mut after = before.clone();
        edit.apply_to(&mut after);
        if after == before {
            return Ok(());
        }
        self.apply_command(Command::EditTask { before, after });
        Ok(())
    }

    /// Status transition; a terminal status retires the task in place.
    pub fn set_status(&mut self, task_id: TaskId, status: TaskStatus) -> Result<(), EngineError> {
        self.edit_task(task_id, TaskEdit::status(status))
    }

    pub fn delete_task(&mut self, task_id: TaskId) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let task = self
            .overlay
            .task(task_id)
            .ok_or(EngineError::TaskNotFound(task_id))?
            .clone();
        let severed = Self::severed_links(&self.overlay, task_id);
        self.apply_command(Command::DeleteTask { task, severed });
        Ok(())
    }

    // ---- dependency operations -------------------------------------------

    /// Declares that `from` must end before `to` starts. Rejected when it
    /// would close a cycle or when `to` already starts too early.
    pub fn add_dependency(&mut self, from: TaskId, to: TaskId) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let from_task = self
            .overlay
            .task(from)
            .ok_or(EngineError::TaskNotFound(from))?
            .clone();
        let to_task = self
            .overlay
            .task(to)
            .ok_or(EngineError::TaskNotFound(to))?
            .clone();
        if to_task.depends_on.contains(&from) {
            return Ok(());
        }
        let dag = DependencyDag::build(&self.overlay.tasks);
        if dag.would_close_cycle(from, to) {
            return Err(GraphError::CycleDetected { from, to }.into());
        }
        if to_task.start_date < from_task.end_date {
            return Err(PlacementError::DependencyViolation(from).into());
        }
        let mut after = to_task.clone();
        after.depends_on.push(from);
        self.apply_command(Command::EditTask {
            before: to_task,
            after,
        });
        Ok(())
    }

    pub fn remove_dependency(&mut self, from: TaskId, to: TaskId) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let to_task = self
            .overlay
            .task(to)
            .ok_or(EngineError::TaskNotFound(to))?
            .clone();
        if !to_task.depends_on.contains(&from) {
            return Ok(());
        }
        let mut after = to_task.clone();
        after.depends_on.retain(|id| *id != from);
        self.apply_command(Command::EditTask {
            before: to_task,
            after,
        });
        Ok(())
    }

    // ---- row operations --------------------------------------------------

    pub fn add_row(&mut self, kind: RowKind) -> Result<RowId, EngineError> {
        self.ensure_mutable()?;
        let id = self.overlay.next_row_id(kind);
        let row = Row::new(id.clone(), kind);
        self.apply_command(Command::AddRow { row });
        Ok(id)
    }

    pub fn rename_row(
        &mut self,
        row_id: RowId,
        new_label: impl Into<String>,
    ) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let row = self
            .overlay
            .row(&row_id)
            .ok_or_else(|| RegistryError::RowNotFound(row_id.clone()))?;
        let from = row.label.clone();
        let to = new_label.into();
        if from == to {
            return Ok(());
        }
        self.apply_command(Command::RenameRow { row_id, from, to });
        Ok(())
    }

    /// Removes a row. Without `cascade` the call fails with `RowInUse`
    /// while any task references the row; with it, every referencing
    /// task is deleted first and the whole cascade is a single compound
    /// command, so one undo restores the row and all of its tasks.
    pub fn delete_row(&mut self, row_id: RowId, cascade: bool) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        let row = self
            .overlay
            .row(&row_id)
            .ok_or_else(|| RegistryError::RowNotFound(row_id.clone()))?
            .clone();
        let referencing = self.overlay.tasks_on_row(&row_id);
        if referencing.is_empty() {
            self.apply_command(Command::DeleteRow { row });
            return Ok(());
        }
        if !cascade {
            return Err(RegistryError::RowInUse(row_id).into());
        }

        // Each deletion sees the state left by the previous one, so the
        // severed links are captured against a simulated overlay.
        let mut simulated = self.overlay.clone();
        let mut commands = Vec::with_capacity(referencing.len() + 1);
        for task_id in referencing {
            let Some(task) = simulated.task(task_id).cloned() else {
                continue;
            };
            let severed = Self::severed_links(&simulated, task_id);
            let command = Command::DeleteTask { task, severed };
            command.apply(&mut simulated);
            commands.push(command);
        }
        commands.push(Command::DeleteRow { row });
        self.apply_command(Command::Compound(commands));
        Ok(())
    }

    // ---- holiday registry ------------------------------------------------

    /// Registers a non-working period. Holiday edits are staged (and
    /// reverted by `discard`) but sit outside the command history.
    pub fn add_holiday(
        &mut self,
        name: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<HolidayId, EngineError> {
        self.ensure_mutable()?;
        if end_date < start_date {
            return Err(EngineError::InvalidDateRange {
                start: start_date,
                end: end_date,
            });
        }
        let id = self.overlay.next_holiday_id;
        self.overlay.holidays.insert(
            id,
            Holiday {
                id,
                name: name.into(),
                start_date,
                end_date,
            },
        );
        self.overlay.next_holiday_id += 1;
        self.notify_render();
        Ok(id)
    }

    pub fn remove_holiday(&mut self, id: HolidayId) -> Result<bool, EngineError> {
        self.ensure_mutable()?;
        let removed = self.overlay.holidays.remove(&id).is_some();
        if removed {
            self.notify_render();
        }
        Ok(removed)
    }

    // ---- undo / redo -----------------------------------------------------

    /// Reverts the most recent command. `Ok(false)` when there is
    /// nothing to undo. Undoing is independent of the commit boundary:
    /// the history survives a commit.
    pub fn undo(&mut self) -> Result<bool, EngineError> {
        self.ensure_mutable()?;
        let Some(command) = self.history.undo() else {
            return Ok(false);
        };
        let command = command.clone();
        tracing::debug!(command = command.kind(), "undo");
        command.revert(&mut self.overlay);
        self.notify_render();
        Ok(true)
    }

    pub fn redo(&mut self) -> Result<bool, EngineError> {
        self.ensure_mutable()?;
        let Some(command) = self.history.redo() else {
            return Ok(false);
        };
        let command = command.clone();
        tracing::debug!(command = command.kind(), "redo");
        command.apply(&mut self.overlay);
        self.notify_render();
        Ok(true)
    }

    // ---- staging / commit ------------------------------------------------

    /// First half of a commit: captures the staged overlay and hands the
    /// snapshot to send to the persistence collaborator. Only one commit
    /// may be outstanding; staged mutations remain accepted meanwhile.
    pub fn begin_commit(&mut self) -> Result<ScheduleSnapshot, EngineError> {
        self.ensure_mutable()?;
        if self.commit_in_flight.is_some() {
            return Err(TransactionError::CommitInProgress.into());
        }
        let staged = self.overlay.clone();
        let snapshot = staged.to_snapshot();
        self.commit_in_flight = Some(staged);
        tracing::info!(tasks = snapshot.tasks.len(), "commit started");
        Ok(snapshot)
    }

    /// Second half of a commit. On success the captured state becomes
    /// the committed snapshot (the undo history is kept); on failure the
    /// overlay stays dirty so the commit can be retried.
    pub fn finish_commit(
        &mut self,
        outcome: Result<(), PersistenceError>,
    ) -> Result<(), EngineError> {
        let Some(staged) = self.commit_in_flight.take() else {
            tracing::warn!("finish_commit called with no commit in flight");
            return Ok(());
        };
        match outcome {
            Ok(()) => {
                self.committed = staged;
                tracing::info!("commit completed");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "commit failed, staged edits preserved");
                Err(TransactionError::PersistFailed(err.to_string()).into())
            }
        }
    }

    /// Synchronous commit against a store: both phases in one call.
    pub fn commit(&mut self, store: &dyn SnapshotStore) -> Result<(), EngineError> {
        let snapshot = self.begin_commit()?;
        let outcome = store.save_snapshot(&snapshot);
        self.finish_commit(outcome)
    }

    /// Throws away every staged edit: the overlay reverts to the last
    /// committed snapshot and the command history is cleared, so a
    /// discarded session cannot be redone.
    pub fn discard(&mut self) -> Result<(), EngineError> {
        self.ensure_mutable()?;
        self.overlay = self.committed.clone();
        self.history.clear();
        tracing::info!("staged edits discarded");
        self.notify_render();
        Ok(())
    }
}
