use log::{debug, info};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::action_log::ActionLog;
use crate::clock::{Clock, SystemClock};
use crate::db::Database;
use crate::error::{Result, TudoError, ValidationError};
use crate::models::{
    CaptureId, Context, ContextId, Item, ItemId, ItemKind, ItemRef, LogEntry, LogEntryId, NewTask,
    Project, ProjectId, SomedayId, Task, TaskId, WaitingId,
};
use crate::query::{AllView, ProjectView, ReadView, Review, TodayView};
use crate::store::{CleanScope, ItemStore, TaskFilter};

/// Service layer implementing the item lifecycle.
///
/// GtdService owns the Database and the clock that stamps every write. All
/// validation happens before the first write, and every completion is
/// recorded in the action log in the same transaction as the state change,
/// so the latest completion can always be undone.
///
/// # Examples
///
/// ```
/// use tudo::{Database, GtdService};
///
/// # fn main() -> anyhow::Result<()> {
/// let db = Database::in_memory()?;
/// let service = GtdService::new(db);
///
/// let id = service.add_next_action("call the plumber", None, None)?;
/// service.complete(id)?;
/// service.undo()?;
///
/// assert!(!service.task(id)?.done);
/// # Ok(())
/// # }
/// ```
pub struct GtdService {
    db: Database,
    clock: Box<dyn Clock>,
}

impl GtdService {
    /// Creates a service that reads the local system clock.
    pub fn new(db: Database) -> Self {
        Self::with_clock(db, SystemClock)
    }

    /// Creates a service with an explicit time source.
    pub fn with_clock(db: Database, clock: impl Clock + 'static) -> Self {
        Self {
            db,
            clock: Box::new(clock),
        }
    }

    /// Returns a reference to the underlying database.
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> Date {
        self.clock.today()
    }

    fn store(&self) -> ItemStore<'_> {
        ItemStore::new(self.db.connection())
    }

    fn log(&self) -> ActionLog<'_> {
        ActionLog::new(self.db.connection())
    }

    /// Files free text into the inbox. Duplicates are allowed.
    pub fn capture(&self, content: &str) -> Result<CaptureId> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ValidationError::EmptyCapture.into());
        }
        let id = self.store().create_capture(content, self.now())?;
        debug!("captured {}", id.item_ref());
        Ok(id)
    }

    /// Creates a task without a project. With a due date it lands on the
    /// calendar instead of the next action list.
    pub fn add_next_action(
        &self,
        content: &str,
        due: Option<Date>,
        context: Option<ContextId>,
    ) -> Result<TaskId> {
        let mut task = NewTask::new(content);
        task.due = due;
        task.context = context;
        self.add_task(task)
    }

    /// Creates a task under the active project called `project`.
    pub fn add_project_task(&self, project: &str, task: NewTask) -> Result<TaskId> {
        let project = self.active_project(project)?;
        self.add_task(task.project(project.id))
    }

    /// Validates and creates a task.
    ///
    /// Fails with `EmptyContent` for blank content, `DueDateInPast` for a due
    /// date before today, and `NotFound` when the project is missing or
    /// finished or the context is missing. No row is written on failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use time::macros::{date, datetime};
    /// use tudo::{Database, GtdService, ManualClock, NewTask};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let clock = ManualClock::new(datetime!(2024-06-15 09:00 UTC));
    /// let service = GtdService::with_clock(Database::in_memory()?, clock);
    ///
    /// let late = service.add_task(NewTask::new("file taxes").due(date!(2020 - 01 - 01)));
    /// assert!(late.is_err());
    /// # Ok(())
    /// # }
    /// ```
    pub fn add_task(&self, mut task: NewTask) -> Result<TaskId> {
        task.content = required(&task.content)?;
        if let Some(due) = task.due {
            check_due_date(due, self.today())?;
        }

        let store = self.store();
        if let Some(project) = task.project {
            match store.is_done(project.item_ref())? {
                Some(false) => {}
                Some(true) => {
                    return Err(TudoError::not_found(format!(
                        "active {}",
                        project.item_ref()
                    )));
                }
                None => return Err(TudoError::not_found(project.item_ref())),
            }
        }
        if let Some(context) = task.context {
            store.get_context(context)?;
        }

        let id = store.create_task(&task, self.now())?;
        debug!("created {}", id.item_ref());
        Ok(id)
    }

    pub fn add_project(&self, name: &str) -> Result<ProjectId> {
        let name = self.unique_content(ItemKind::Project, name)?;
        let id = self.store().create_project(&name, self.now())?;
        info!("created project `{name}`");
        Ok(id)
    }

    pub fn add_context(&self, name: &str) -> Result<ContextId> {
        let name = required(name)?;
        let store = self.store();
        if store.context_exists(&name)?.is_some() {
            return Err(TudoError::AlreadyExists {
                kind: "context",
                content: name,
            });
        }
        Ok(store.create_context(&name, self.now())?)
    }

    pub fn add_waiting(&self, content: &str) -> Result<WaitingId> {
        let content = self.unique_content(ItemKind::Waiting, content)?;
        self.store().create_waiting(&content, self.now())
    }

    pub fn add_someday(&self, content: &str) -> Result<SomedayId> {
        let content = self.unique_content(ItemKind::Someday, content)?;
        self.store().create_someday(&content, self.now())
    }

    /// Trims `content` and rejects it if an active item of `kind` already
    /// carries it. Finished items do not count.
    fn unique_content(&self, kind: ItemKind, content: &str) -> Result<String> {
        let content = required(content)?;
        if self.store().content_exists(kind, &content)?.is_some() {
            return Err(TudoError::AlreadyExists {
                kind: kind.label(),
                content,
            });
        }
        Ok(content)
    }

    /// Marks an active item done and records it for undo.
    ///
    /// The state change and the log entry are written in one transaction.
    /// Completing a done item fails with `AlreadyDone` and writes nothing.
    pub fn complete(&self, item: impl Into<ItemRef>) -> Result<LogEntryId> {
        let item = item.into();
        let tx = self.db.connection().unchecked_transaction()?;
        let store = ItemStore::new(&tx);

        match store.is_done(item)? {
            None => return Err(TudoError::not_found(item)),
            Some(true) => return Err(TudoError::AlreadyDone(item)),
            Some(false) => {}
        }

        let now = self.now();
        store.mark_done(item, now)?;
        let entry = ActionLog::new(&tx).append(item, now)?;
        tx.commit()?;

        info!("completed {item}");
        Ok(entry)
    }

    /// Completes the active project with exactly this name.
    pub fn complete_project(&self, name: &str) -> Result<Project> {
        let project = self.active_project(name)?;
        self.complete(project.id)?;
        Ok(project)
    }

    /// Completes a task, checking first that it belongs to `project`.
    pub fn complete_project_task(&self, project: &str, task: TaskId) -> Result<Task> {
        let project = self.active_project(project)?;
        let found = self.task(task)?;
        if found.project_id != Some(project.id) {
            return Err(TudoError::not_found(format!(
                "task {task} in project `{}`",
                project.content
            )));
        }
        self.complete(task)?;
        Ok(found)
    }

    /// The completion `undo` would reverse, if any.
    pub fn last_action(&self) -> Result<Option<LogEntry>> {
        self.log().peek_latest()
    }

    /// Reopens the most recently completed item and drops its log entry.
    ///
    /// Fails with `NothingToUndo` on an empty log. If the reversal cannot be
    /// applied the entry is kept and `UndoFailed` is returned.
    pub fn undo(&self) -> Result<LogEntry> {
        let log = self.log();
        let entry = log.peek_latest()?.ok_or(TudoError::NothingToUndo)?;
        log.consume(&entry)?;
        info!("undid {}", entry.target);
        Ok(entry)
    }

    /// How many items `clean` would complete in this scope.
    pub fn clean_count(&self, scope: CleanScope) -> Result<usize> {
        self.store().count_active(scope)
    }

    /// Force-completes every active item in the scope. Not undoable.
    pub fn clean(&self, scope: CleanScope) -> Result<usize> {
        let cleaned = self.store().bulk_complete(scope, self.now())?;
        info!("cleaned {cleaned} {}", scope.label());
        Ok(cleaned)
    }

    /// Turns a completed someday item into a new project.
    ///
    /// The project takes `name` when given and the item's content otherwise.
    /// The someday item must already be done, and no active project may
    /// carry the same name.
    pub fn promote_someday(&self, id: SomedayId, name: Option<&str>) -> Result<ProjectId> {
        let item = self.store().get_item(id)?;
        if item.is_active() {
            return Err(TudoError::NotDone(id.item_ref()));
        }
        let project = self.add_project(name.unwrap_or(item.content.as_str()))?;
        info!("promoted {} to {}", id.item_ref(), project.item_ref());
        Ok(project)
    }

    pub fn item<I: ItemId>(&self, id: I) -> Result<Item<I>> {
        self.store().get_item(id)
    }

    pub fn task(&self, id: TaskId) -> Result<Task> {
        self.store().get_task(id)
    }

    pub fn context(&self, id: ContextId) -> Result<Context> {
        self.store().get_context(id)
    }

    pub fn content_of(&self, item: ItemRef) -> Result<String> {
        self.store().content_of(item)
    }

    pub fn active<I: ItemId>(&self) -> Result<Vec<Item<I>>> {
        self.store().list_active()
    }

    pub fn next_actions(&self) -> Result<Vec<Task>> {
        self.store().list_tasks(&TaskFilter::NextActions)
    }

    pub fn contexts(&self) -> Result<Vec<Context>> {
        self.store().list_contexts()
    }

    /// The active project with exactly this name, or `NotFound`.
    pub fn active_project(&self, name: &str) -> Result<Project> {
        self.store()
            .find_active_project(name.trim())?
            .ok_or_else(|| TudoError::not_found(format!("active project `{}`", name.trim())))
    }

    pub fn today_view(&self) -> Result<TodayView> {
        TodayView::build(&self.store(), self.today())
    }

    pub fn all_view(&self) -> Result<AllView> {
        AllView::build(&self.store())
    }

    /// Tasks of one project; `all` lifts the due-today restriction.
    pub fn project_view(&self, name: &str, all: bool) -> Result<ProjectView> {
        let today = (!all).then(|| self.today());
        ProjectView::build(&self.store(), name.trim(), today)
    }

    pub fn read_view(&self) -> Result<ReadView> {
        ReadView::build(&self.store())
    }

    pub fn review(&self) -> Result<Review> {
        Review::build(&self.store(), self.now())
    }

    /// Parses a `YYYY-MM-DD` due date against this service's clock.
    pub fn parse_due_date(&self, input: &str) -> Result<Date, ValidationError> {
        parse_due_date(input, self.today())
    }
}

/// Parses a `YYYY-MM-DD` due date and rejects dates before `today`.
///
/// # Examples
///
/// ```
/// use time::macros::date;
/// use tudo::service::parse_due_date;
///
/// let today = date!(2024 - 06 - 15);
/// assert_eq!(parse_due_date("2024-06-15", today), Ok(today));
/// assert!(parse_due_date("2024-06-14", today).is_err());
/// assert!(parse_due_date("next week", today).is_err());
/// ```
pub fn parse_due_date(input: &str, today: Date) -> Result<Date, ValidationError> {
    let input = input.trim();
    let due = Date::parse(input, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::MalformedDate(input.to_string()))?;
    check_due_date(due, today)?;
    Ok(due)
}

fn check_due_date(due: Date, today: Date) -> Result<(), ValidationError> {
    if due < today {
        return Err(ValidationError::DueDateInPast { due, today });
    }
    Ok(())
}

fn required(content: &str) -> Result<String, ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::EmptyContent);
    }
    Ok(content.to_string())
}

#[cfg(test)]
#[path = "service/tests.rs"]
mod tests;
