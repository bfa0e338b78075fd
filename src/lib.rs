pub mod calendar;
pub mod command;
pub mod graph;
pub mod history;
pub mod persistence;
pub mod placement;
pub mod projection;
pub mod row;
pub mod session;
pub mod state;
pub mod task;

#[cfg(feature = "http_api")]
pub mod http_api;

pub use calendar::{Holiday, HolidayId, WorkCalendar};
pub use command::Command;
pub use graph::{DependencyDag, GraphError};
pub use history::UndoStack;
pub use persistence::{PersistenceError, ScheduleSnapshot, SnapshotStore};
pub use placement::{DependentMovePolicy, MovePlan, Placement, PlacementError};
pub use projection::{ScheduleProjection, TaskView};
pub use row::{RegistryError, Row, RowId, RowKind};
pub use session::{EngineError, RenderSink, Role, ScheduleSession, TransactionError};
pub use state::ScheduleState;
pub use task::{NewTask, Task, TaskCategory, TaskEdit, TaskId, TaskStatus};
