use chrono::NaiveDate;
use cronograma::placement::DependentMovePolicy;
use cronograma::row::RowId;
use cronograma::session::{EngineError, Role, ScheduleSession};
use cronograma::task::{NewTask, TaskCategory};
use cronograma::PlacementError;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// T1 on Jan 10-12 with dependent T2 on Jan 13-15, both on terminal 1.
fn session_with_pair() -> ScheduleSession {
    let mut session = ScheduleSession::with_default_rows(Role::Administrator);
    session
        .add_task(NewTask::new(
            "T1",
            TaskCategory::EfficiencyAssay,
            RowId::Index(1),
            d(2025, 1, 10),
            d(2025, 1, 12),
        ))
        .unwrap();
    let mut second = NewTask::new(
        "T2",
        TaskCategory::EfficiencyAssay,
        RowId::Index(1),
        d(2025, 1, 13),
        d(2025, 1, 15),
    );
    second.depends_on = vec![1];
    session.add_task(second).unwrap();
    session
}

#[test]
fn dependent_cannot_move_before_its_prerequisite_ends() {
    let mut session = session_with_pair();
    let before = session.overlay().clone();

    let err = session
        .move_task(2, RowId::Index(2), d(2025, 1, 11), DependentMovePolicy::Reject)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Placement(PlacementError::DependencyViolation(1))
    );
    assert_eq!(session.overlay(), &before);
}

#[test]
fn dependency_checks_run_before_row_checks() {
    let mut session = session_with_pair();
    // Both the dates and the target row are wrong; the ordering
    // constraint is reported first.
    let err = session
        .move_task(2, RowId::Index(99), d(2025, 1, 11), DependentMovePolicy::Reject)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Placement(PlacementError::DependencyViolation(1))
    );
}

#[test]
fn dependent_may_start_the_day_the_prerequisite_ends() {
    let mut session = session_with_pair();
    session
        .move_task(2, RowId::Index(1), d(2025, 1, 12), DependentMovePolicy::Reject)
        .unwrap();
    let task = session.overlay().task(2).unwrap();
    assert_eq!(task.start_date, d(2025, 1, 12));
    assert_eq!(task.end_date, d(2025, 1, 14));
}

#[test]
fn moves_preserve_calendar_day_duration() {
    let mut session = session_with_pair();
    let duration_before = session.overlay().task(2).unwrap().duration_days();

    // Across a weekend: Jan 17, 2025 is a Friday.
    session
        .move_task(2, RowId::Index(2), d(2025, 1, 17), DependentMovePolicy::Reject)
        .unwrap();
    let task = session.overlay().task(2).unwrap();
    assert_eq!(task.duration_days(), duration_before);
    assert_eq!(task.end_date, d(2025, 1, 19));
    assert_eq!(task.row_id, RowId::Index(2));
}

#[test]
fn moving_a_prerequisite_later_names_the_squeezed_dependent() {
    let mut session = session_with_pair();
    let err = session
        .move_task(1, RowId::Index(1), d(2025, 1, 12), DependentMovePolicy::Reject)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Placement(PlacementError::DependencyViolation(2))
    );
}

#[test]
fn cascade_shifts_dependents_by_the_same_delta() {
    let mut session = session_with_pair();
    session
        .move_task(1, RowId::Index(1), d(2025, 1, 12), DependentMovePolicy::Cascade)
        .unwrap();

    let t1 = session.overlay().task(1).unwrap();
    let t2 = session.overlay().task(2).unwrap();
    assert_eq!((t1.start_date, t1.end_date), (d(2025, 1, 12), d(2025, 1, 14)));
    assert_eq!((t2.start_date, t2.end_date), (d(2025, 1, 15), d(2025, 1, 17)));

    // The whole cascade is one command: a single undo restores both.
    assert!(session.undo().unwrap());
    let t1 = session.overlay().task(1).unwrap();
    let t2 = session.overlay().task(2).unwrap();
    assert_eq!((t1.start_date, t1.end_date), (d(2025, 1, 10), d(2025, 1, 12)));
    assert_eq!((t2.start_date, t2.end_date), (d(2025, 1, 13), d(2025, 1, 15)));
}

#[test]
fn cascade_reaches_transitive_dependents() {
    let mut session = session_with_pair();
    let mut third = NewTask::new(
        "T3",
        TaskCategory::EfficiencyAssay,
        RowId::Index(1),
        d(2025, 1, 15),
        d(2025, 1, 16),
    );
    third.depends_on = vec![2];
    session.add_task(third).unwrap();

    session
        .move_task(1, RowId::Index(1), d(2025, 1, 12), DependentMovePolicy::Cascade)
        .unwrap();

    let t2 = session.overlay().task(2).unwrap();
    let t3 = session.overlay().task(3).unwrap();
    assert_eq!((t2.start_date, t2.end_date), (d(2025, 1, 15), d(2025, 1, 17)));
    assert_eq!((t3.start_date, t3.end_date), (d(2025, 1, 17), d(2025, 1, 18)));
}

#[test]
fn cascade_leaves_unaffected_dependents_alone() {
    let mut session = session_with_pair();
    // Plenty of slack: T2 already starts well after the shifted end.
    session
        .move_task(2, RowId::Index(1), d(2025, 1, 20), DependentMovePolicy::Reject)
        .unwrap();
    session
        .move_task(1, RowId::Index(1), d(2025, 1, 12), DependentMovePolicy::Cascade)
        .unwrap();
    let t2 = session.overlay().task(2).unwrap();
    assert_eq!(t2.start_date, d(2025, 1, 20));
}

#[test]
fn safety_tasks_stay_off_terminal_rows_when_moving() {
    let mut session = ScheduleSession::with_default_rows(Role::Administrator);
    session
        .add_task(NewTask::new(
            "Inspecao",
            TaskCategory::SafetyAssay,
            RowId::Letter("A".to_string()),
            d(2025, 1, 10),
            d(2025, 1, 12),
        ))
        .unwrap();

    let err = session
        .move_task(1, RowId::Index(1), d(2025, 1, 10), DependentMovePolicy::Reject)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Placement(PlacementError::RowCategoryMismatch {
            row: RowId::Index(1),
            category: TaskCategory::SafetyAssay,
        })
    );

    let err = session
        .move_task(1, RowId::Index(99), d(2025, 1, 10), DependentMovePolicy::Reject)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Placement(PlacementError::RowNotFound(RowId::Index(99)))
    );
}

#[test]
fn resize_follows_the_same_validation_path() {
    let mut session = session_with_pair();

    let err = session
        .resize_task(1, d(2025, 1, 14), DependentMovePolicy::Reject)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Placement(PlacementError::DependencyViolation(2))
    );

    session
        .resize_task(1, d(2025, 1, 14), DependentMovePolicy::Cascade)
        .unwrap();
    let t1 = session.overlay().task(1).unwrap();
    let t2 = session.overlay().task(2).unwrap();
    assert_eq!(t1.start_date, d(2025, 1, 10));
    assert_eq!(t1.end_date, d(2025, 1, 14));
    assert_eq!((t2.start_date, t2.end_date), (d(2025, 1, 15), d(2025, 1, 17)));
}

#[test]
fn resize_rejects_an_end_before_the_start() {
    let mut session = session_with_pair();
    let err = session
        .resize_task(1, d(2025, 1, 9), DependentMovePolicy::Reject)
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDateRange { .. }));
}

#[test]
fn unknown_tasks_cannot_be_moved() {
    let mut session = session_with_pair();
    let err = session
        .move_task(42, RowId::Index(1), d(2025, 1, 10), DependentMovePolicy::Reject)
        .unwrap_err();
    assert_eq!(err, EngineError::TaskNotFound(42));
}
