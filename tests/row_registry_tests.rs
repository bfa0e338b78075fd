use chrono::NaiveDate;
use cronograma::row::{RowId, RowKind};
use cronograma::session::{EngineError, Role, ScheduleSession};
use cronograma::task::{NewTask, TaskCategory};
use cronograma::{PlacementError, RegistryError};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn admin_session() -> ScheduleSession {
    ScheduleSession::with_default_rows(Role::Administrator)
}

#[test]
fn added_rows_get_sequential_ids_and_placeholder_labels() {
    let mut session = admin_session();

    let first = session.add_row(RowKind::Efficiency).unwrap();
    let second = session.add_row(RowKind::Efficiency).unwrap();
    assert_eq!(first, RowId::Index(3));
    assert_eq!(second, RowId::Index(4));

    let row = session.overlay().row(&second).unwrap();
    assert_eq!(row.label, "Linha 4");

    let safety = session.add_row(RowKind::Safety).unwrap();
    assert_eq!(safety, RowId::Letter("B".to_string()));
}

#[test]
fn deleted_row_ids_are_never_reused() {
    let mut session = admin_session();
    let id = session.add_row(RowKind::Efficiency).unwrap();
    assert_eq!(id, RowId::Index(3));

    session.delete_row(id, false).unwrap();
    let next = session.add_row(RowKind::Efficiency).unwrap();
    assert_eq!(next, RowId::Index(4));
}

#[test]
fn safety_row_ids_walk_the_letter_space() {
    let mut session = admin_session();
    // "A" is built in; allocate through the end of the alphabet.
    let mut last = RowId::Letter("A".to_string());
    for _ in 0..26 {
        last = session.add_row(RowKind::Safety).unwrap();
    }
    assert_eq!(last, RowId::Letter("AA".to_string()));
}

#[test]
fn rename_propagates_to_the_projection() {
    let mut session = admin_session();
    session
        .add_task(NewTask::new(
            "Calibracao anual",
            TaskCategory::Calibration,
            RowId::Index(1),
            d(2025, 2, 3),
            d(2025, 2, 4),
        ))
        .unwrap();

    session
        .rename_row(RowId::Index(1), "Terminal de eficiencia")
        .unwrap();

    let projection = session.projection();
    assert_eq!(projection.task(1).unwrap().row_label, "Terminal de eficiencia");
    let row = projection
        .rows
        .iter()
        .find(|row| row.id == RowId::Index(1))
        .unwrap();
    assert_eq!(row.label, "Terminal de eficiencia");
}

#[test]
fn delete_row_in_use_is_a_strict_no_op() {
    let mut session = admin_session();
    session
        .add_task(NewTask::new(
            "Ensaio 12",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 2, 3),
            d(2025, 2, 7),
        ))
        .unwrap();
    let before = session.overlay().clone();

    let err = session.delete_row(RowId::Index(1), false).unwrap_err();
    assert_eq!(
        err,
        EngineError::Registry(RegistryError::RowInUse(RowId::Index(1)))
    );
    assert_eq!(session.overlay(), &before);
}

#[test]
fn cascade_delete_removes_tasks_and_one_undo_restores_everything() {
    let mut session = admin_session();
    session
        .add_task(NewTask::new(
            "Ensaio 12",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 2, 3),
            d(2025, 2, 7),
        ))
        .unwrap();
    let mut second = NewTask::new(
        "Ensaio 13",
        TaskCategory::EfficiencyAssay,
        RowId::Index(1),
        d(2025, 2, 10),
        d(2025, 2, 12),
    );
    second.depends_on = vec![1];
    session.add_task(second).unwrap();
    let before = session.overlay().clone();

    session.delete_row(RowId::Index(1), true).unwrap();
    assert!(session.overlay().row(&RowId::Index(1)).is_none());
    assert_eq!(session.overlay().task_count(), 0);

    assert!(session.undo().unwrap());
    assert_eq!(session.overlay(), &before);
    assert_eq!(session.overlay().task(2).unwrap().depends_on, vec![1]);
}

#[test]
fn deleting_a_missing_row_reports_not_found() {
    let mut session = admin_session();
    let err = session
        .delete_row(RowId::Index(9), false)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Registry(RegistryError::RowNotFound(RowId::Index(9)))
    );
}

#[test]
fn assay_tasks_cannot_land_on_the_wrong_row_kind() {
    let mut session = admin_session();
    let err = session
        .add_task(NewTask::new(
            "Ensaio de seguranca",
            TaskCategory::SafetyAssay,
            RowId::Index(1),
            d(2025, 2, 3),
            d(2025, 2, 7),
        ))
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Placement(PlacementError::RowCategoryMismatch {
            row: RowId::Index(1),
            category: TaskCategory::SafetyAssay,
        })
    );

    // A vacation block is welcome on either kind.
    session
        .add_task(NewTask::new(
            "Ferias",
            TaskCategory::Vacation,
            RowId::Index(1),
            d(2025, 2, 3),
            d(2025, 2, 7),
        ))
        .unwrap();
}
