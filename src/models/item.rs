use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use super::{CaptureId, ContextId, ItemId, ProjectId, SomedayId, TaskId, WaitingId};

/// An item with the shared lifecycle fields and nothing else.
///
/// Captures, projects, waiting-for and someday items all have exactly this
/// shape; they differ only in the id type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item<I> {
    pub id: I,
    pub content: String,
    pub done: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Set exactly while `done` is true.
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

pub type Capture = Item<CaptureId>;
pub type Project = Item<ProjectId>;
pub type Waiting = Item<WaitingId>;
pub type Someday = Item<SomedayId>;

impl<I: ItemId> Item<I> {
    /// Whether this item is still open.
    pub fn is_active(&self) -> bool {
        !self.done
    }
}

/// A task row: a next action, a project task, or a calendar task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub content: String,
    pub project_id: Option<ProjectId>,
    pub context_id: Option<ContextId>,
    pub due: Option<Date>,
    pub done: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub finished_at: Option<OffsetDateTime>,
}

impl Task {
    /// A task with neither a project nor a due date.
    pub fn is_next_action(&self) -> bool {
        self.project_id.is_none() && self.due.is_none()
    }

    /// A task with a due date.
    pub fn is_calendar(&self) -> bool {
        self.due.is_some()
    }
}

/// Input for creating a task.
///
/// # Examples
///
/// ```
/// use tudo::NewTask;
///
/// let task = NewTask::new("call the plumber");
/// assert!(task.project.is_none());
/// assert!(task.due.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub content: String,
    pub project: Option<ProjectId>,
    pub context: Option<ContextId>,
    pub due: Option<Date>,
}

impl NewTask {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }

    pub fn context(mut self, context: ContextId) -> Self {
        self.context = Some(context);
        self
    }

    pub fn due(mut self, due: Date) -> Self {
        self.due = Some(due);
        self
    }
}

/// A situational label such as "home" or "errand". Has no lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: ContextId,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
