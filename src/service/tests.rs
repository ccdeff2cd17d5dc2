use super::*;
use crate::clock::ManualClock;
use crate::models::{Capture, Someday, Waiting};
use time::Duration;
use time::macros::{date, datetime};

fn service_at(now: OffsetDateTime) -> (GtdService, ManualClock) {
    let db = Database::in_memory().expect("failed to create in-memory database");
    let clock = ManualClock::new(now);
    (GtdService::with_clock(db, clock.clone()), clock)
}

fn service() -> GtdService {
    service_at(datetime!(2024-06-15 10:00 UTC)).0
}

fn log_len(service: &GtdService) -> usize {
    ActionLog::new(service.database().connection())
        .len()
        .expect("failed to count log entries")
}

fn row_count(service: &GtdService, table: &str) -> i64 {
    service
        .database()
        .connection()
        .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .expect("failed to count rows")
}

// --- Creation ---

#[test]
fn capture_trims_and_stores_content() {
    let service = service();

    let id = service.capture("  call mom\n").expect("capture failed");
    let capture: Capture = service.item(id).expect("capture missing");

    assert_eq!(capture.content, "call mom");
    assert!(!capture.done);
}

#[test]
fn blank_capture_is_rejected() {
    let service = service();

    let err = service.capture(" \n\n").unwrap_err();

    assert!(matches!(
        err,
        TudoError::Validation(ValidationError::EmptyCapture)
    ));
    assert_eq!(row_count(&service, "capture"), 0);
}

#[test]
fn duplicate_captures_are_allowed() {
    let service = service();

    let first = service.capture("idea").unwrap();
    let second = service.capture("idea").unwrap();

    assert_ne!(first, second);
}

#[test]
fn next_action_stamps_created_at_from_clock() {
    let (service, _) = service_at(datetime!(2024-06-15 10:00 UTC));

    let id = service.add_next_action("call Ann", None, None).unwrap();
    let task = service.task(id).unwrap();

    assert!(task.is_next_action());
    assert_eq!(task.created_at, datetime!(2024-06-15 10:00 UTC));
}

#[test]
fn empty_task_content_is_rejected() {
    let service = service();

    let err = service.add_next_action("   ", None, None).unwrap_err();

    assert!(matches!(
        err,
        TudoError::Validation(ValidationError::EmptyContent)
    ));
}

#[test]
fn past_due_date_is_rejected_without_writing() {
    let service = service();

    let err = service
        .add_next_action("file taxes", Some(date!(2020 - 01 - 01)), None)
        .unwrap_err();

    assert!(matches!(
        err,
        TudoError::Validation(ValidationError::DueDateInPast { .. })
    ));
    assert_eq!(row_count(&service, "tasks"), 0);
}

#[test]
fn due_today_is_accepted() {
    let service = service();

    let id = service
        .add_next_action("dentist", Some(service.today()), None)
        .unwrap();

    assert!(service.task(id).unwrap().is_calendar());
}

#[test]
fn project_task_requires_active_project() {
    let service = service();

    let err = service
        .add_project_task("Nowhere", NewTask::new("fix sink"))
        .unwrap_err();
    assert!(matches!(err, TudoError::NotFound(_)));

    let home = service.add_project("Home").unwrap();
    service.complete(home).unwrap();
    let err = service
        .add_project_task("Home", NewTask::new("fix sink"))
        .unwrap_err();
    assert!(matches!(err, TudoError::NotFound(_)));
    assert_eq!(row_count(&service, "tasks"), 0);
}

#[test]
fn task_with_finished_project_id_is_rejected() {
    let service = service();
    let home = service.add_project("Home").unwrap();
    service.complete(home).unwrap();

    let err = service
        .add_task(NewTask::new("fix sink").project(home))
        .unwrap_err();

    assert_eq!(err.to_string(), "active project 1 does not exist");
}

#[test]
fn task_with_unknown_context_is_rejected() {
    let service = service();

    let err = service
        .add_next_action("buy nails", None, Some(ContextId::new(3)))
        .unwrap_err();

    assert!(matches!(err, TudoError::NotFound(_)));
    assert_eq!(row_count(&service, "tasks"), 0);
}

#[test]
fn task_keeps_its_context() {
    let service = service();
    let errand = service.add_context("errand").unwrap();

    let id = service
        .add_next_action("buy nails", None, Some(errand))
        .unwrap();

    assert_eq!(service.task(id).unwrap().context_id, Some(errand));
    assert_eq!(service.context(errand).unwrap().name, "errand");
}

#[test]
fn duplicate_active_project_is_rejected() {
    let service = service();
    service.add_project("Home").unwrap();

    let err = service.add_project("Home").unwrap_err();

    assert!(matches!(
        err,
        TudoError::AlreadyExists { kind: "project", .. }
    ));
    assert_eq!(err.to_string(), "project `Home` already exists");
}

#[test]
fn duplicate_context_is_rejected() {
    let service = service();
    service.add_context("home").unwrap();

    let err = service.add_context("home").unwrap_err();

    assert!(matches!(
        err,
        TudoError::AlreadyExists { kind: "context", .. }
    ));
}

#[test]
fn duplicate_waiting_item_is_rejected() {
    let service = service();
    service.add_waiting("reply from Bob").unwrap();

    assert!(service.add_waiting("reply from Bob").is_err());
    assert_eq!(service.active::<WaitingId>().unwrap().len(), 1);
}

#[test]
fn someday_can_be_recreated_after_completion() {
    let service = service();
    let milk = service.add_someday("buy milk").unwrap();
    service.complete(milk).unwrap();

    let again = service.add_someday("buy milk").expect("recreate failed");

    assert_ne!(milk, again);
    let active: Vec<Someday> = service.active().unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, again);
}

// --- Completion ---

#[test]
fn complete_sets_finished_at_and_logs_once() {
    let (service, clock) = service_at(datetime!(2024-06-15 10:00 UTC));
    let id = service.add_waiting("reply from Bob").unwrap();
    clock.advance(Duration::hours(3));

    service.complete(id).unwrap();

    let waiting: Waiting = service.item(id).unwrap();
    assert!(waiting.done);
    assert_eq!(waiting.finished_at, Some(datetime!(2024-06-15 13:00 UTC)));
    assert_eq!(log_len(&service), 1);

    let entry = service.last_action().unwrap().unwrap();
    assert_eq!(entry.target, id.item_ref());
}

#[test]
fn completing_done_item_fails_without_mutation() {
    let (service, clock) = service_at(datetime!(2024-06-15 10:00 UTC));
    let id = service.capture("call mom").unwrap();
    service.complete(id).unwrap();
    clock.advance(Duration::days(1));

    let err = service.complete(id).unwrap_err();

    assert!(matches!(err, TudoError::AlreadyDone(item) if item == id.item_ref()));
    let capture: Capture = service.item(id).unwrap();
    assert_eq!(capture.finished_at, Some(datetime!(2024-06-15 10:00 UTC)));
    assert_eq!(log_len(&service), 1);
}

#[test]
fn completing_missing_item_is_not_found() {
    let service = service();

    let err = service.complete(TaskId::new(9)).unwrap_err();

    assert!(matches!(err, TudoError::NotFound(_)));
    assert_eq!(log_len(&service), 0);
}

#[test]
fn complete_project_by_name() {
    let service = service();
    service.add_project("Home").unwrap();

    let project = service.complete_project("Home").unwrap();

    assert_eq!(project.content, "Home");
    assert!(service.item(project.id).unwrap().done);
    assert!(service.complete_project("Home").is_err());
}

#[test]
fn complete_project_task_checks_membership() {
    let service = service();
    service.add_project("Home").unwrap();
    service.add_project("Garage").unwrap();
    let sink = service
        .add_project_task("Home", NewTask::new("fix sink"))
        .unwrap();

    let err = service.complete_project_task("Garage", sink).unwrap_err();
    assert!(matches!(err, TudoError::NotFound(_)));

    let task = service.complete_project_task("Home", sink).unwrap();
    assert_eq!(task.content, "fix sink");
    assert!(service.task(sink).unwrap().done);
}

// --- Undo ---

#[test]
fn undo_on_empty_log_is_nothing_to_undo() {
    let service = service();
    service.add_next_action("call Ann", None, None).unwrap();

    let err = service.undo().unwrap_err();

    assert!(matches!(err, TudoError::NothingToUndo));
    assert_eq!(service.next_actions().unwrap().len(), 1);
}

#[test]
fn undo_reopens_latest_completion() {
    let service = service();
    let id = service.add_someday("learn piano").unwrap();
    service.complete(id).unwrap();

    let entry = service.undo().unwrap();

    assert_eq!(entry.target, id.item_ref());
    let item: Someday = service.item(id).unwrap();
    assert!(!item.done);
    assert_eq!(item.finished_at, None);
    assert_eq!(log_len(&service), 0);
}

#[test]
fn repeated_undo_walks_back_through_completions() {
    let service = service();
    let first = service.capture("a").unwrap();
    let second = service.add_next_action("b", None, None).unwrap();
    service.complete(first).unwrap();
    service.complete(second).unwrap();

    assert_eq!(service.undo().unwrap().target, second.item_ref());
    assert_eq!(service.undo().unwrap().target, first.item_ref());
    assert!(matches!(service.undo(), Err(TudoError::NothingToUndo)));
}

#[test]
fn completed_again_after_undo_gets_fresh_entry() {
    let service = service();
    let id = service.add_next_action("call Ann", None, None).unwrap();
    let first = service.complete(id).unwrap();
    service.undo().unwrap();

    let second = service.complete(id).unwrap();

    assert!(second.get() > first.get());
    assert_eq!(log_len(&service), 1);
}

#[test]
fn undo_fails_closed_when_item_was_reopened_elsewhere() {
    let service = service();
    let id = service.add_next_action("call Ann", None, None).unwrap();
    service.complete(id).unwrap();
    // Reopen behind the log's back so the reversal has nothing to reverse.
    service
        .database()
        .connection()
        .execute(
            "UPDATE tasks SET done = 0, finished_at = NULL WHERE id = ?1",
            [id.get()],
        )
        .unwrap();

    let err = service.undo().unwrap_err();

    assert!(matches!(err, TudoError::UndoFailed { .. }));
    assert!(err.is_fatal());
    assert_eq!(log_len(&service), 1);
}

#[test]
fn clean_is_not_undoable() {
    let service = service();
    let kept = service.capture("a").unwrap();
    service.complete(kept).unwrap();
    service.capture("b").unwrap();

    assert_eq!(service.clean(CleanScope::Inbox).unwrap(), 1);

    // Undo still targets the explicit completion, not the cleaned item.
    assert_eq!(service.undo().unwrap().target, kept.item_ref());
}

// --- Clean ---

#[test]
fn clean_counts_match_completions() {
    let service = service();
    service.add_project("Home").unwrap();
    service.add_next_action("a", None, None).unwrap();
    service
        .add_next_action("b", Some(service.today()), None)
        .unwrap();
    service
        .add_project_task("Home", NewTask::new("c"))
        .unwrap();

    for scope in [
        CleanScope::NextActions,
        CleanScope::Calendar,
        CleanScope::ProjectTasks,
    ] {
        let count = service.clean_count(scope).unwrap();
        assert_eq!(count, 1, "{scope:?}");
        assert_eq!(service.clean(scope).unwrap(), count);
        assert_eq!(service.clean_count(scope).unwrap(), 0);
    }
    assert_eq!(log_len(&service), 0);
}

#[test]
fn clean_all_reaches_tasks_of_finished_projects() {
    let service = service();
    service.add_project("Garage").unwrap();
    let sweep = service
        .add_project_task("Garage", NewTask::new("sweep"))
        .unwrap();
    service.complete_project("Garage").unwrap();

    let cleaned: usize = CleanScope::ALL
        .into_iter()
        .map(|scope| service.clean(scope).unwrap())
        .sum();

    assert_eq!(cleaned, 1);
    assert!(service.task(sweep).unwrap().done);
    let open: i64 = service
        .database()
        .connection()
        .query_row("SELECT COUNT(*) FROM tasks WHERE done = 0", [], |row| {
            row.get(0)
        })
        .expect("failed to count open tasks");
    assert_eq!(open, 0);
}

// --- Someday promotion ---

#[test]
fn promote_requires_completed_someday_item() {
    let service = service();
    let id = service.add_someday("write a book").unwrap();

    let err = service.promote_someday(id, None).unwrap_err();

    assert!(matches!(err, TudoError::NotDone(_)));
    assert_eq!(row_count(&service, "projects"), 0);
}

#[test]
fn promote_uses_content_or_given_name() {
    let service = service();
    let book = service.add_someday("write a book").unwrap();
    let trip = service.add_someday("visit Japan").unwrap();
    service.complete(book).unwrap();
    service.complete(trip).unwrap();

    let first = service.promote_someday(book, None).unwrap();
    let second = service.promote_someday(trip, Some("Japan 2025")).unwrap();

    assert_eq!(service.item(first).unwrap().content, "write a book");
    assert_eq!(service.item(second).unwrap().content, "Japan 2025");
    let someday: Someday = service.item(book).unwrap();
    assert!(someday.done);
}

#[test]
fn promote_refuses_duplicate_active_project() {
    let service = service();
    let book = service.add_someday("write a book").unwrap();
    service.complete(book).unwrap();
    service.promote_someday(book, None).unwrap();

    let err = service.promote_someday(book, None).unwrap_err();

    assert!(matches!(err, TudoError::AlreadyExists { .. }));
    assert_eq!(row_count(&service, "projects"), 1);
}

// --- Views and dates ---

#[test]
fn review_follows_the_clock() {
    let (service, clock) = service_at(datetime!(2024-06-15 10:00 UTC));
    let id = service.add_next_action("call Ann", None, None).unwrap();
    service.complete(id).unwrap();

    clock.advance(Duration::days(3));
    assert_eq!(service.review().unwrap().finished_tasks.len(), 1);

    clock.advance(Duration::days(5));
    assert!(service.review().unwrap().finished_tasks.is_empty());
}

#[test]
fn project_view_today_and_all() {
    let service = service();
    service.add_project("Home").unwrap();
    let later = date!(2024 - 06 - 20);
    service
        .add_project_task("Home", NewTask::new("paint walls").due(later))
        .unwrap();

    assert!(service.project_view("Home", false).unwrap().is_empty());
    assert_eq!(service.project_view("Home", true).unwrap().dated.len(), 1);
}

#[test]
fn parse_due_date_uses_clock() {
    let service = service();

    assert_eq!(
        service.parse_due_date("2024-06-16"),
        Ok(date!(2024 - 06 - 16))
    );
    assert_eq!(
        service.parse_due_date("16/06/2024"),
        Err(ValidationError::MalformedDate("16/06/2024".to_string()))
    );
    assert!(matches!(
        service.parse_due_date("2024-06-14"),
        Err(ValidationError::DueDateInPast { .. })
    ));
}
