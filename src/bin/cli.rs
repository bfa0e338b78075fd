use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use cronograma::persistence::{
    CsvFileStore, JsonFileStore, PersistenceError, SnapshotStore, load_snapshot_from_csv,
    load_snapshot_from_json,
};
use cronograma::placement::DependentMovePolicy;
use cronograma::row::{RowId, RowKind};
use cronograma::session::{Role, ScheduleSession};
use cronograma::state::ScheduleState;
use cronograma::task::{NewTask, TaskCategory, TaskStatus};

fn print_help() {
    println!(
        "Commands:\n  help                                    Show this help\n  show                                    Show the staged schedule\n  rows                                    List rows\n  holidays                                List registered holidays\n  warn <YYYY-MM-DD>                       Holidays in the next 14 days\n  add <category> <row> <start> <end> <name...>\n                                          Add a task (category: efficiency_assay,\n                                          safety_assay, calibration, vacation)\n  move <id> <row> <YYYY-MM-DD> [cascade]  Reschedule a task\n  resize <id> <YYYY-MM-DD> [cascade]      Change a task's end date\n  status <id> <status>                    Set status (pending, in_progress,\n                                          report_issued, completed)\n  dep <from> <to>                         Require <from> to end before <to> starts\n  undep <from> <to>                       Remove that requirement\n  delete <id>                             Delete a task\n  row add <efficiency|safety>             Add a row\n  row rename <id> <label...>              Rename a row\n  row delete <id> [cascade]               Delete a row\n  holiday add <start> <end> <name...>     Register a holiday range\n  holiday delete <id>                     Remove a holiday\n  undo | redo                             Step the command history\n  commit                                  Persist staged edits\n  discard                                 Drop staged edits\n  export <path>                           Write the projection as CSV\n  save <json|csv> <path>                  Save a snapshot to disk\n  load <json|csv> <path>                  Replace the session from disk\n  quit | exit                             Exit"
    );
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            if cell.len() > widths[index] {
                widths[index] = cell.len();
            }
        }
    }

    let mut sep = String::from("+");
    for width in &widths {
        sep.push_str(&"-".repeat(width + 2));
        sep.push('+');
    }

    let format_line = |cells: &[String]| {
        let mut line = String::from("|");
        for (index, cell) in cells.iter().enumerate() {
            line.push(' ');
            line.push_str(cell);
            line.push_str(&" ".repeat(widths[index] - cell.len()));
            line.push_str(" |");
        }
        line
    };

    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&format_line(&header_cells));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        out.push_str(&format_line(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out
}

fn show_schedule(session: &ScheduleSession) {
    let projection = session.projection();
    let rows: Vec<Vec<String>> = projection
        .tasks
        .iter()
        .map(|task| {
            vec![
                task.id.to_string(),
                task.name.clone(),
                task.category.to_string(),
                format!("{} ({})", task.row_id, task.row_label),
                task.start_date.to_string(),
                task.end_date.to_string(),
                task.status.to_string(),
                task.depends_on
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(","),
            ]
        })
        .collect();
    println!(
        "{}",
        render_table(
            &["id", "name", "category", "row", "start", "end", "status", "deps"],
            &rows
        )
    );
    if session.dirty() {
        println!("(staged edits not committed)");
    }
}

fn show_rows(session: &ScheduleSession) {
    let projection = session.projection();
    let rows: Vec<Vec<String>> = projection
        .rows
        .iter()
        .map(|row| {
            vec![
                row.id.to_string(),
                row.label.clone(),
                row.kind.to_string(),
                row.task_count.to_string(),
            ]
        })
        .collect();
    println!("{}", render_table(&["id", "label", "kind", "tasks"], &rows));
}

fn show_holidays(session: &ScheduleSession) {
    let rows: Vec<Vec<String>> = session
        .overlay()
        .holidays()
        .map(|holiday| {
            vec![
                holiday.id.to_string(),
                holiday.name.clone(),
                holiday.start_date.to_string(),
                holiday.end_date.to_string(),
            ]
        })
        .collect();
    println!("{}", render_table(&["id", "name", "start", "end"], &rows));
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    match raw.parse::<NaiveDate>() {
        Ok(date) => Some(date),
        Err(_) => {
            println!("Invalid date '{raw}' (expected YYYY-MM-DD).");
            None
        }
    }
}

fn parse_row_id(raw: &str) -> Option<RowId> {
    match raw.parse::<RowId>() {
        Ok(id) => Some(id),
        Err(err) => {
            println!("{err}");
            None
        }
    }
}

fn policy_from(flag: Option<&&str>) -> DependentMovePolicy {
    match flag {
        Some(&"cascade") => DependentMovePolicy::Cascade,
        _ => DependentMovePolicy::Reject,
    }
}

fn load_session(kind: &str, path: &str) -> Result<ScheduleSession, PersistenceError> {
    let snapshot = match kind {
        "csv" => load_snapshot_from_csv(path)?,
        _ => load_snapshot_from_json(path)?,
    };
    let state = ScheduleState::from_snapshot(&snapshot)
        .map_err(|err| PersistenceError::InvalidData(err.to_string()))?;
    Ok(ScheduleSession::with_state(state, Role::Administrator))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut store_path: Option<PathBuf> = std::env::args().nth(1).map(PathBuf::from);
    let mut session = match &store_path {
        Some(path) if path.exists() => {
            let store = JsonFileStore::new(path.clone());
            match ScheduleSession::load(&store, Role::Administrator) {
                Ok(session) => session,
                Err(err) => {
                    eprintln!("Refusing to start on corrupt schedule: {err}");
                    std::process::exit(1);
                }
            }
        }
        _ => ScheduleSession::with_default_rows(Role::Administrator),
    };

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(Ok(line)) = lines.next() else { break };
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => {}
            ["help"] => print_help(),
            ["show"] => show_schedule(&session),
            ["rows"] => show_rows(&session),
            ["holidays"] => show_holidays(&session),
            ["warn", date] => {
                let Some(from) = parse_date(date) else { continue };
                let upcoming = session.upcoming_holidays(from, 14);
                if upcoming.is_empty() {
                    println!("No holidays in the next 14 days.");
                } else {
                    for holiday in upcoming {
                        println!(
                            "Upcoming: {} ({} to {})",
                            holiday.name, holiday.start_date, holiday.end_date
                        );
                    }
                }
            }
            ["add", category, row, start, end, name @ ..] if !name.is_empty() => {
                let Some(category) = TaskCategory::parse(category) else {
                    println!("Unknown category '{category}'.");
                    continue;
                };
                let Some(row_id) = parse_row_id(row) else { continue };
                let Some(start) = parse_date(start) else { continue };
                let Some(end) = parse_date(end) else { continue };
                let new_task = NewTask::new(name.join(" "), category, row_id, start, end);
                match session.add_task(new_task) {
                    Ok(id) => println!("Added task {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["move", id, row, start, rest @ ..] => {
                let Ok(id) = id.parse() else {
                    println!("Invalid task id '{id}'.");
                    continue;
                };
                let Some(row_id) = parse_row_id(row) else { continue };
                let Some(start) = parse_date(start) else { continue };
                match session.move_task(id, row_id, start, policy_from(rest.first())) {
                    Ok(()) => println!("Moved task {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["resize", id, end, rest @ ..] => {
                let Ok(id) = id.parse() else {
                    println!("Invalid task id '{id}'.");
                    continue;
                };
                let Some(end) = parse_date(end) else { continue };
                match session.resize_task(id, end, policy_from(rest.first())) {
                    Ok(()) => println!("Resized task {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["status", id, status] => {
                let Ok(id) = id.parse() else {
                    println!("Invalid task id '{id}'.");
                    continue;
                };
                let Some(status) = TaskStatus::parse(status) else {
                    println!("Unknown status '{status}'.");
                    continue;
                };
                match session.set_status(id, status) {
                    Ok(()) => println!("Task {id} is now {status}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["dep", from, to] => {
                let (Ok(from), Ok(to)) = (from.parse(), to.parse()) else {
                    println!("Invalid task ids.");
                    continue;
                };
                match session.add_dependency(from, to) {
                    Ok(()) => println!("Task {to} now waits for task {from}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["undep", from, to] => {
                let (Ok(from), Ok(to)) = (from.parse(), to.parse()) else {
                    println!("Invalid task ids.");
                    continue;
                };
                match session.remove_dependency(from, to) {
                    Ok(()) => println!("Dependency removed."),
                    Err(err) => println!("{err}"),
                }
            }
            ["delete", id] => {
                let Ok(id) = id.parse() else {
                    println!("Invalid task id '{id}'.");
                    continue;
                };
                match session.delete_task(id) {
                    Ok(()) => println!("Deleted task {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["row", "add", kind] => {
                let Some(kind) = RowKind::parse(kind) else {
                    println!("Unknown row kind '{kind}'.");
                    continue;
                };
                match session.add_row(kind) {
                    Ok(id) => println!("Added row {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["row", "rename", id, label @ ..] if !label.is_empty() => {
                let Some(row_id) = parse_row_id(id) else { continue };
                match session.rename_row(row_id, label.join(" ")) {
                    Ok(()) => println!("Renamed row {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["row", "delete", id, rest @ ..] => {
                let Some(row_id) = parse_row_id(id) else { continue };
                let cascade = rest.first() == Some(&"cascade");
                match session.delete_row(row_id, cascade) {
                    Ok(()) => println!("Deleted row {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["holiday", "add", start, end, name @ ..] if !name.is_empty() => {
                let Some(start) = parse_date(start) else { continue };
                let Some(end) = parse_date(end) else { continue };
                match session.add_holiday(name.join(" "), start, end) {
                    Ok(id) => println!("Registered holiday {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["holiday", "delete", id] => {
                let Ok(id) = id.parse() else {
                    println!("Invalid holiday id '{id}'.");
                    continue;
                };
                match session.remove_holiday(id) {
                    Ok(true) => println!("Removed holiday {id}."),
                    Ok(false) => println!("No holiday {id}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["undo"] => match session.undo() {
                Ok(true) => println!("Undone."),
                Ok(false) => println!("Nothing to undo."),
                Err(err) => println!("{err}"),
            },
            ["redo"] => match session.redo() {
                Ok(true) => println!("Redone."),
                Ok(false) => println!("Nothing to redo."),
                Err(err) => println!("{err}"),
            },
            ["commit"] => {
                let Some(path) = &store_path else {
                    println!("No schedule file configured; use 'save json <path>' first.");
                    continue;
                };
                let store = JsonFileStore::new(path.clone());
                match session.commit(&store) {
                    Ok(()) => println!("Committed to {}.", path.display()),
                    Err(err) => println!("{err}"),
                }
            }
            ["discard"] => match session.discard() {
                Ok(()) => println!("Staged edits discarded."),
                Err(err) => println!("{err}"),
            },
            ["export", path] => {
                let projection = session.projection();
                match std::fs::File::create(path) {
                    Ok(file) => match projection.write_csv(file) {
                        Ok(()) => println!("Projection exported to {path}."),
                        Err(err) => println!("{err}"),
                    },
                    Err(err) => println!("{err}"),
                }
            }
            ["save", kind, path] => {
                let snapshot = session.overlay().to_snapshot();
                let result = match *kind {
                    "csv" => CsvFileStore::new(*path).save_snapshot(&snapshot),
                    _ => {
                        store_path = Some(PathBuf::from(*path));
                        JsonFileStore::new(*path).save_snapshot(&snapshot)
                    }
                };
                match result {
                    Ok(()) => println!("Schedule saved to {path}."),
                    Err(err) => println!("{err}"),
                }
            }
            ["load", kind, path] => match load_session(kind, path) {
                Ok(loaded) => {
                    session = loaded;
                    println!("Schedule loaded from {path}.");
                }
                Err(err) => println!("{err}"),
            },
            ["quit"] | ["exit"] => break,
            _ => println!("Unknown command; try 'help'."),
        }
    }
}
