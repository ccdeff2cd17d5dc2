use super::*;
use crate::db::Database;
use crate::models::{Capture, Someday, Waiting};
use time::Duration;
use time::macros::{date, datetime};

const NOW: OffsetDateTime = datetime!(2024-06-15 10:00 UTC);
const TODAY: Date = date!(2024 - 06 - 15);

#[test]
fn create_capture_and_read_back() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());

    let id = store.create_capture("call mom", NOW).unwrap();
    let capture: Capture = store.get_item(id).unwrap();

    assert_eq!(capture.content, "call mom");
    assert!(!capture.done);
    assert_eq!(capture.created_at, NOW);
    assert_eq!(capture.finished_at, None);
}

#[test]
fn ids_are_per_kind() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());

    let capture = store.create_capture("a", NOW).unwrap();
    let waiting = store.create_waiting("b", NOW).unwrap();

    assert_eq!(capture.get(), 1);
    assert_eq!(waiting.get(), 1);
}

#[test]
fn get_missing_item_is_not_found() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());

    let err = store.get_item(SomedayId::new(7)).unwrap_err();

    assert!(matches!(err, TudoError::NotFound(_)));
    assert_eq!(err.to_string(), "someday item 7 does not exist");
}

#[test]
fn task_round_trips_project_context_and_due() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());

    let project = store.create_project("Home", NOW).unwrap();
    let context = store.create_context("errand", NOW).unwrap();
    let id = store
        .create_task(
            &NewTask::new("buy paint")
                .project(project)
                .context(context)
                .due(date!(2024 - 06 - 20)),
            NOW,
        )
        .unwrap();

    let task = store.get_task(id).unwrap();
    assert_eq!(task.project_id, Some(project));
    assert_eq!(task.context_id, Some(context));
    assert_eq!(task.due, Some(date!(2024 - 06 - 20)));
}

#[test]
fn mark_done_sets_finished_at_and_undone_clears_it() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let id = store.create_waiting("reply from Bob", NOW).unwrap();
    let later = NOW + Duration::hours(2);

    store.mark_done(id.item_ref(), later).unwrap();
    let done: Waiting = store.get_item(id).unwrap();
    assert!(done.done);
    assert_eq!(done.finished_at, Some(later));

    store.mark_undone(id.item_ref()).unwrap();
    let reopened: Waiting = store.get_item(id).unwrap();
    assert!(!reopened.done);
    assert_eq!(reopened.finished_at, None);
}

#[test]
fn mark_done_twice_fails() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let id = store.create_capture("x", NOW).unwrap();

    store.mark_done(id.item_ref(), NOW).unwrap();
    assert!(store.mark_done(id.item_ref(), NOW).is_err());
}

#[test]
fn mark_undone_on_active_row_fails() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let id = store.create_capture("x", NOW).unwrap();

    assert!(store.mark_undone(id.item_ref()).is_err());
}

#[test]
fn is_done_distinguishes_missing_rows() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let id = store.create_someday("learn piano", NOW).unwrap();

    assert_eq!(store.is_done(id.item_ref()).unwrap(), Some(false));
    assert_eq!(
        store.is_done(ItemRef::Someday(SomedayId::new(99))).unwrap(),
        None
    );
    assert!(store.exists(id.item_ref()).unwrap());
}

#[test]
fn content_exists_ignores_finished_rows() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let id = store.create_capture("buy milk", NOW).unwrap();

    assert_eq!(
        store.content_exists(ItemKind::Capture, "buy milk").unwrap(),
        Some(id.get())
    );

    store.mark_done(id.item_ref(), NOW).unwrap();
    assert_eq!(
        store.content_exists(ItemKind::Capture, "buy milk").unwrap(),
        None
    );
}

#[test]
fn content_match_is_case_sensitive() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    store.create_project("Home", NOW).unwrap();

    assert!(store.find_active_project("Home").unwrap().is_some());
    assert!(store.find_active_project("home").unwrap().is_none());
}

#[test]
fn list_active_skips_done_items_in_insertion_order() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let a = store.create_someday("a", NOW).unwrap();
    let b = store.create_someday("b", NOW).unwrap();
    let c = store.create_someday("c", NOW).unwrap();
    store.mark_done(b.item_ref(), NOW).unwrap();

    let active: Vec<Someday> = store.list_active().unwrap();
    let ids: Vec<_> = active.iter().map(|item| item.id).collect();

    assert_eq!(ids, vec![a, c]);
}

#[test]
fn next_actions_filter_excludes_project_and_dated_tasks() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let project = store.create_project("Home", NOW).unwrap();
    let next = store.create_task(&NewTask::new("call Ann"), NOW).unwrap();
    store
        .create_task(&NewTask::new("fix sink").project(project), NOW)
        .unwrap();
    store
        .create_task(&NewTask::new("dentist").due(TODAY), NOW)
        .unwrap();

    let tasks = store.list_tasks(&TaskFilter::NextActions).unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, next);
}

#[test]
fn dated_tasks_are_ordered_by_due_date() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let later = store
        .create_task(&NewTask::new("later").due(date!(2024 - 07 - 01)), NOW)
        .unwrap();
    let sooner = store
        .create_task(&NewTask::new("sooner").due(date!(2024 - 06 - 16)), NOW)
        .unwrap();

    let tasks = store.list_tasks(&TaskFilter::Dated).unwrap();
    let ids: Vec<_> = tasks.iter().map(|task| task.id).collect();

    assert_eq!(ids, vec![sooner, later]);
}

#[test]
fn contains_text_is_case_sensitive() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let hit = store
        .create_task(&NewTask::new("read the manual"), NOW)
        .unwrap();
    store.create_task(&NewTask::new("Read later"), NOW).unwrap();

    let tasks = store
        .list_tasks(&TaskFilter::ContainsText("read".to_string()))
        .unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, hit);
}

#[test]
fn finished_since_uses_strict_threshold() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let on_edge = store.create_project("edge", NOW).unwrap();
    let inside = store.create_project("inside", NOW).unwrap();
    let threshold = NOW - Duration::days(7);
    store.mark_done(on_edge.item_ref(), threshold).unwrap();
    store
        .mark_done(inside.item_ref(), threshold + Duration::seconds(1))
        .unwrap();

    let finished: Vec<Project> = store.finished_since(threshold).unwrap();

    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].id, inside);
}

#[test]
fn project_tasks_scope_includes_tasks_of_finished_projects() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let open = store.create_project("Home", NOW).unwrap();
    let closed = store.create_project("Garage", NOW).unwrap();
    store
        .create_task(&NewTask::new("fix sink").project(open), NOW)
        .unwrap();
    store
        .create_task(&NewTask::new("sweep").project(closed), NOW)
        .unwrap();
    store
        .create_task(&NewTask::new("paint door").project(closed).due(TODAY), NOW)
        .unwrap();
    store.mark_done(closed.item_ref(), NOW).unwrap();

    assert_eq!(store.count_active(CleanScope::ProjectTasks).unwrap(), 2);
    assert_eq!(store.bulk_complete(CleanScope::ProjectTasks, NOW).unwrap(), 2);

    // Only the dated task is left, for the calendar scope.
    assert_eq!(store.list_tasks(&TaskFilter::Dated).unwrap().len(), 1);
    assert_eq!(store.count_active(CleanScope::ProjectTasks).unwrap(), 0);
}

#[test]
fn bulk_complete_returns_changed_rows() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    store.create_capture("a", NOW).unwrap();
    store.create_capture("b", NOW).unwrap();

    assert_eq!(store.count_active(CleanScope::Inbox).unwrap(), 2);
    assert_eq!(store.bulk_complete(CleanScope::Inbox, NOW).unwrap(), 2);
    assert_eq!(store.count_active(CleanScope::Inbox).unwrap(), 0);
    assert_eq!(store.bulk_complete(CleanScope::Inbox, NOW).unwrap(), 0);
}

#[test]
fn contexts_are_unique_by_name() {
    let db = Database::in_memory().unwrap();
    let store = ItemStore::new(db.connection());
    let id = store.create_context("home", NOW).unwrap();

    assert!(store.create_context("home", NOW).is_err());
    assert_eq!(store.context_exists("home").unwrap(), Some(id));
    assert_eq!(store.list_contexts().unwrap().len(), 1);
}
