//! Durable CRUD for the five item kinds plus contexts.
//!
//! `ItemStore` borrows a connection rather than owning one so the same
//! statements can run inside a transaction opened by the caller.

use rusqlite::types::{Type, Value};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::{Result, TudoError};
use crate::models::{
    CaptureId, Context, ContextId, Item, ItemId, ItemKind, ItemRef, NewTask, Project, ProjectId,
    SomedayId, Task, TaskId, WaitingId,
};

const ITEM_COLUMNS: &str = "id, content, done, created_at, finished_at";
const TASK_COLUMNS: &str =
    "id, content, project_id, context_id, due, done, created_at, finished_at";

/// Predicates over the `tasks` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFilter {
    /// Active tasks with neither project nor due date.
    NextActions,
    /// Active tasks of a project without a due date.
    ProjectUndated(ProjectId),
    /// Active tasks of a project with a due date.
    ProjectDated(ProjectId),
    /// Active tasks of a project due on the given day.
    ProjectDueOn(ProjectId, Date),
    /// Active tasks without a project due on exactly this day.
    DueOnWithoutProject(Date),
    /// All active tasks with a due date.
    Dated,
    /// Active tasks whose due date has lapsed before the given day.
    DueBefore(Date),
    /// Tasks in any state due strictly after the given day.
    DueAfter(Date),
    /// Active tasks containing the literal, case-sensitive substring.
    ContainsText(String),
    /// Next actions completed strictly after the given instant.
    NextActionsFinishedAfter(OffsetDateTime),
}

impl TaskFilter {
    fn clause(&self) -> (&'static str, Vec<Value>) {
        match self {
            Self::NextActions => ("done = 0 AND project_id IS NULL AND due IS NULL", vec![]),
            Self::ProjectUndated(project) => (
                "done = 0 AND project_id = ?1 AND due IS NULL",
                vec![Value::Integer(project.get())],
            ),
            Self::ProjectDated(project) => (
                "done = 0 AND project_id = ?1 AND due IS NOT NULL",
                vec![Value::Integer(project.get())],
            ),
            Self::ProjectDueOn(project, day) => (
                "done = 0 AND project_id = ?1 AND due = ?2",
                vec![Value::Integer(project.get()), date_value(*day)],
            ),
            Self::DueOnWithoutProject(day) => (
                "done = 0 AND project_id IS NULL AND due = ?1",
                vec![date_value(*day)],
            ),
            Self::Dated => ("done = 0 AND due IS NOT NULL", vec![]),
            Self::DueBefore(day) => ("done = 0 AND due < ?1", vec![date_value(*day)]),
            Self::DueAfter(day) => ("due > ?1", vec![date_value(*day)]),
            Self::ContainsText(needle) => (
                "done = 0 AND instr(content, ?1) > 0",
                vec![Value::Text(needle.clone())],
            ),
            Self::NextActionsFinishedAfter(at) => (
                "done = 1 AND project_id IS NULL AND due IS NULL AND finished_at > ?1",
                vec![Value::Integer(at.unix_timestamp())],
            ),
        }
    }
}

/// Groups of active items that "clean" force-completes together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CleanScope {
    /// Every open capture.
    Inbox,
    /// Every open task with a due date.
    Calendar,
    /// Every open next action.
    NextActions,
    /// Undated open tasks of any project, finished or not.
    ProjectTasks,
    /// Every open waiting-for item.
    Waiting,
    /// Every open someday item.
    Someday,
}

impl CleanScope {
    /// Scopes a plain `clean` touches.
    pub const DEFAULT: [CleanScope; 4] = [
        CleanScope::Inbox,
        CleanScope::Calendar,
        CleanScope::NextActions,
        CleanScope::ProjectTasks,
    ];

    /// Every scope, as used by `clean --all`.
    pub const ALL: [CleanScope; 6] = [
        CleanScope::Inbox,
        CleanScope::Calendar,
        CleanScope::NextActions,
        CleanScope::ProjectTasks,
        CleanScope::Waiting,
        CleanScope::Someday,
    ];

    fn target(self) -> (ItemKind, &'static str) {
        match self {
            Self::Inbox => (ItemKind::Capture, "done = 0"),
            Self::Calendar => (ItemKind::Task, "done = 0 AND due IS NOT NULL"),
            Self::NextActions => (
                ItemKind::Task,
                "done = 0 AND project_id IS NULL AND due IS NULL",
            ),
            Self::ProjectTasks => (
                ItemKind::Task,
                "done = 0 AND project_id IS NOT NULL AND due IS NULL",
            ),
            Self::Waiting => (ItemKind::Waiting, "done = 0"),
            Self::Someday => (ItemKind::Someday, "done = 0"),
        }
    }

    /// Plural noun phrase naming the scope's items in prompts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Inbox => "items from in list",
            Self::Calendar => "tasks from calendar",
            Self::NextActions => "next actions",
            Self::ProjectTasks => "project tasks",
            Self::Waiting => "waiting items",
            Self::Someday => "someday items",
        }
    }
}

/// SQLite-backed item store.
pub struct ItemStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ItemStore<'conn> {
    /// Wraps a connection or an open transaction.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Inserts an active capture.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> anyhow::Result<()> {
    /// use time::macros::datetime;
    /// use tudo::{Database, ItemStore};
    ///
    /// let db = Database::in_memory()?;
    /// let store = ItemStore::new(db.connection());
    /// let id = store.create_capture("call mom", datetime!(2024-06-15 10:00 UTC))?;
    ///
    /// assert!(!store.get_item(id)?.done);
    /// # Ok(())
    /// # }
    /// ```
    pub fn create_capture(&self, content: &str, now: OffsetDateTime) -> Result<CaptureId> {
        self.insert_item(content, now)
    }

    /// Inserts an active project. Name uniqueness is left to the caller.
    pub fn create_project(&self, content: &str, now: OffsetDateTime) -> Result<ProjectId> {
        self.insert_item(content, now)
    }

    /// Inserts an active waiting-for item.
    pub fn create_waiting(&self, content: &str, now: OffsetDateTime) -> Result<WaitingId> {
        self.insert_item(content, now)
    }

    /// Inserts an active someday item.
    pub fn create_someday(&self, content: &str, now: OffsetDateTime) -> Result<SomedayId> {
        self.insert_item(content, now)
    }

    fn insert_item<I: ItemId>(&self, content: &str, now: OffsetDateTime) -> Result<I> {
        let sql = format!(
            "INSERT INTO {} (content, done, created_at, finished_at) VALUES (?1, 0, ?2, NULL)",
            I::KIND.table()
        );
        self.conn
            .execute(&sql, params![content, now.unix_timestamp()])?;
        Ok(I::new(self.conn.last_insert_rowid()))
    }

    /// Inserts a task. References are not checked here; the foreign keys
    /// reject ids that do not exist at all.
    pub fn create_task(&self, task: &NewTask, now: OffsetDateTime) -> Result<TaskId> {
        self.conn.execute(
            "INSERT INTO tasks (content, project_id, context_id, due, done, created_at, finished_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, NULL)",
            params![
                task.content,
                task.project.map(ProjectId::get),
                task.context.map(ContextId::get),
                task.due.map(|day| day.to_string()),
                now.unix_timestamp()
            ],
        )?;
        Ok(TaskId::new(self.conn.last_insert_rowid()))
    }

    /// Inserts a context. The UNIQUE constraint rejects a repeated name.
    pub fn create_context(&self, name: &str, now: OffsetDateTime) -> Result<ContextId> {
        self.conn.execute(
            "INSERT INTO contexts (content, created_at) VALUES (?1, ?2)",
            params![name, now.unix_timestamp()],
        )?;
        Ok(ContextId::new(self.conn.last_insert_rowid()))
    }

    /// Whether a row with this id exists, in any state.
    pub fn exists(&self, item: ItemRef) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)",
            item.kind().table()
        );
        Ok(self.conn.query_row(&sql, [item.row_id()], |row| row.get(0))?)
    }

    /// `Some(done)` for an existing row, `None` when absent.
    pub fn is_done(&self, item: ItemRef) -> Result<Option<bool>> {
        let sql = format!("SELECT done FROM {} WHERE id = ?1", item.kind().table());
        Ok(self
            .conn
            .query_row(&sql, [item.row_id()], |row| row.get(0))
            .optional()?)
    }

    /// Id of an active row of `kind` with exactly this content.
    ///
    /// Completed rows never match, so finished items can be recreated.
    pub fn content_exists(&self, kind: ItemKind, content: &str) -> Result<Option<i64>> {
        let sql = format!(
            "SELECT id FROM {} WHERE content = ?1 AND done = 0 ORDER BY id LIMIT 1",
            kind.table()
        );
        Ok(self
            .conn
            .query_row(&sql, [content], |row| row.get(0))
            .optional()?)
    }

    /// Content of any item, for messages that only hold a reference.
    pub fn content_of(&self, item: ItemRef) -> Result<String> {
        let sql = format!("SELECT content FROM {} WHERE id = ?1", item.kind().table());
        self.conn
            .query_row(&sql, [item.row_id()], |row| row.get(0))
            .optional()?
            .ok_or_else(|| TudoError::not_found(item))
    }

    /// Loads one item of the id's kind, in any state.
    ///
    /// Returns `NotFound` when the row does not exist.
    pub fn get_item<I: ItemId>(&self, id: I) -> Result<Item<I>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} WHERE id = ?1",
            I::KIND.table()
        );
        self.conn
            .query_row(&sql, [id.get()], row_to_item)
            .optional()?
            .ok_or_else(|| TudoError::not_found(id.item_ref()))
    }

    /// Loads one task, in any state.
    pub fn get_task(&self, id: TaskId) -> Result<Task> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
        self.conn
            .query_row(&sql, [id.get()], row_to_task)
            .optional()?
            .ok_or_else(|| TudoError::not_found(id.item_ref()))
    }

    /// Active items of one kind, oldest first.
    pub fn list_active<I: ItemId>(&self) -> Result<Vec<Item<I>>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} WHERE done = 0 ORDER BY id",
            I::KIND.table()
        );
        self.collect_items(&sql, Vec::new())
    }

    /// Active items of one kind whose content contains `needle`, case-sensitively.
    pub fn list_active_containing<I: ItemId>(&self, needle: &str) -> Result<Vec<Item<I>>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} WHERE done = 0 AND instr(content, ?1) > 0 ORDER BY id",
            I::KIND.table()
        );
        self.collect_items(&sql, vec![Value::Text(needle.to_string())])
    }

    /// Items of one kind completed strictly after `threshold`.
    pub fn finished_since<I: ItemId>(&self, threshold: OffsetDateTime) -> Result<Vec<Item<I>>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM {} WHERE done = 1 AND finished_at > ?1 ORDER BY finished_at, id",
            I::KIND.table()
        );
        self.collect_items(&sql, vec![Value::Integer(threshold.unix_timestamp())])
    }

    fn collect_items<I: ItemId>(&self, sql: &str, values: Vec<Value>) -> Result<Vec<Item<I>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let items = stmt
            .query_map(params_from_iter(values), row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Tasks completed strictly after `threshold`, in completion order.
    pub fn tasks_finished_since(&self, threshold: OffsetDateTime) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE done = 1 AND finished_at > ?1 ORDER BY finished_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map([threshold.unix_timestamp()], row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// Tasks matching `filter`, dated ones first by due date, then by id.
    ///
    /// # Examples
    ///
    /// ```
    /// # fn main() -> anyhow::Result<()> {
    /// use time::macros::datetime;
    /// use tudo::{Database, ItemStore, NewTask, TaskFilter};
    ///
    /// let db = Database::in_memory()?;
    /// let store = ItemStore::new(db.connection());
    /// store.create_task(&NewTask::new("call Ann"), datetime!(2024-06-15 10:00 UTC))?;
    ///
    /// let next = store.list_tasks(&TaskFilter::NextActions)?;
    /// assert_eq!(next[0].content, "call Ann");
    /// # Ok(())
    /// # }
    /// ```
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let (clause, values) = filter.clause();
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE {clause} ORDER BY due IS NULL, due, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params_from_iter(values), row_to_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tasks)
    }

    /// The active project with exactly this name.
    pub fn find_active_project(&self, name: &str) -> Result<Option<Project>> {
        match self.content_exists(ItemKind::Project, name)? {
            Some(id) => self.get_item(ProjectId::new(id)).map(Some),
            None => Ok(None),
        }
    }

    /// Loads one context by id.
    pub fn get_context(&self, id: ContextId) -> Result<Context> {
        self.conn
            .query_row(
                "SELECT id, content, created_at FROM contexts WHERE id = ?1",
                [id.get()],
                row_to_context,
            )
            .optional()?
            .ok_or_else(|| TudoError::not_found(format!("context {id}")))
    }

    /// Id of the context with exactly this name. Contexts have no lifecycle.
    pub fn context_exists(&self, name: &str) -> Result<Option<ContextId>> {
        Ok(self
            .conn
            .query_row("SELECT id FROM contexts WHERE content = ?1", [name], |row| {
                row.get(0).map(ContextId::new)
            })
            .optional()?)
    }

    /// Every context, oldest first.
    pub fn list_contexts(&self) -> Result<Vec<Context>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, content, created_at FROM contexts ORDER BY id")?;
        let contexts = stmt
            .query_map([], row_to_context)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(contexts)
    }

    /// Sets `done` and `finished_at` on an active row.
    pub fn mark_done(&self, item: ItemRef, now: OffsetDateTime) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET done = 1, finished_at = ?1 WHERE id = ?2 AND done = 0",
            item.kind().table()
        );
        let updated = self
            .conn
            .execute(&sql, params![now.unix_timestamp(), item.row_id()])?;
        if updated == 0 {
            return Err(TudoError::not_found(format!("active {item}")));
        }
        Ok(())
    }

    /// Reopens a completed row, clearing `finished_at`.
    pub fn mark_undone(&self, item: ItemRef) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET done = 0, finished_at = NULL WHERE id = ?1 AND done = 1",
            item.kind().table()
        );
        let updated = self.conn.execute(&sql, [item.row_id()])?;
        if updated == 0 {
            return Err(TudoError::not_found(format!("completed {item}")));
        }
        Ok(())
    }

    /// Number of rows `bulk_complete` would change for the scope.
    pub fn count_active(&self, scope: CleanScope) -> Result<usize> {
        let (kind, clause) = scope.target();
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {clause}", kind.table());
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Force-completes every row in the scope and returns how many changed.
    pub fn bulk_complete(&self, scope: CleanScope, now: OffsetDateTime) -> Result<usize> {
        let (kind, clause) = scope.target();
        let sql = format!(
            "UPDATE {} SET done = 1, finished_at = ?1 WHERE {clause}",
            kind.table()
        );
        Ok(self.conn.execute(&sql, [now.unix_timestamp()])?)
    }
}

fn date_value(day: Date) -> Value {
    Value::Text(day.to_string())
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(e)))
}

fn optional_timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<Option<OffsetDateTime>> {
    match row.get::<_, Option<i64>>(idx)? {
        Some(_) => timestamp_at(row, idx).map(Some),
        None => Ok(None),
    }
}

fn optional_date_at(row: &Row, idx: usize) -> rusqlite::Result<Option<Date>> {
    let Some(text) = row.get::<_, Option<String>>(idx)? else {
        return Ok(None);
    };
    Date::parse(&text, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_item<I: ItemId>(row: &Row) -> rusqlite::Result<Item<I>> {
    Ok(Item {
        id: I::new(row.get(0)?),
        content: row.get(1)?,
        done: row.get(2)?,
        created_at: timestamp_at(row, 3)?,
        finished_at: optional_timestamp_at(row, 4)?,
    })
}

fn row_to_task(row: &Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: TaskId::new(row.get(0)?),
        content: row.get(1)?,
        project_id: row.get::<_, Option<i64>>(2)?.map(ProjectId::new),
        context_id: row.get::<_, Option<i64>>(3)?.map(ContextId::new),
        due: optional_date_at(row, 4)?,
        done: row.get(5)?,
        created_at: timestamp_at(row, 6)?,
        finished_at: optional_timestamp_at(row, 7)?,
    })
}

fn row_to_context(row: &Row) -> rusqlite::Result<Context> {
    Ok(Context {
        id: ContextId::new(row.get(0)?),
        name: row.get(1)?,
        created_at: timestamp_at(row, 2)?,
    })
}

#[cfg(test)]
#[path = "store/tests.rs"]
mod tests;
