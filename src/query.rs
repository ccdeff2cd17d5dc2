//! Read-only views over the item store: today, all, per-project, read and
//! the weekly review.

use std::collections::BTreeMap;

use serde::Serialize;
use time::{Date, Duration, OffsetDateTime};

use crate::error::{Result, TudoError};
use crate::models::{Project, ProjectId, Someday, Task, Waiting};
use crate::store::{ItemStore, TaskFilter};

/// How far back the weekly review looks.
pub const REVIEW_WINDOW: Duration = Duration::days(7);

/// Substring the read list matches on.
pub const READ_MARKER: &str = "read";

/// An active project together with the tasks a view selected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectTasks {
    pub project: Project,
    pub tasks: Vec<Task>,
}

/// Everything to look at today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodayView {
    pub date: Date,
    /// Tasks without a project due today.
    pub calendar: Vec<Task>,
    pub next_actions: Vec<Task>,
    /// Active projects with tasks due today or undated. Projects with
    /// nothing to do today are left out.
    pub projects: Vec<ProjectTasks>,
    pub waiting: Vec<Waiting>,
}

impl TodayView {
    /// Collects the open work relevant to `today`.
    pub fn build(store: &ItemStore<'_>, today: Date) -> Result<Self> {
        let mut projects = Vec::new();
        for project in store.list_active::<ProjectId>()? {
            let mut tasks = store.list_tasks(&TaskFilter::ProjectDueOn(project.id, today))?;
            tasks.extend(store.list_tasks(&TaskFilter::ProjectUndated(project.id))?);
            if !tasks.is_empty() {
                projects.push(ProjectTasks { project, tasks });
            }
        }

        Ok(Self {
            date: today,
            calendar: store.list_tasks(&TaskFilter::DueOnWithoutProject(today))?,
            next_actions: store.list_tasks(&TaskFilter::NextActions)?,
            projects,
            waiting: store.list_active()?,
        })
    }

    /// True when there is no task of any kind for today.
    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty()
            && self.next_actions.is_empty()
            && self.projects.is_empty()
            && self.waiting.is_empty()
    }
}

/// Every open task regardless of due date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllView {
    /// All dated tasks, project or not, soonest first.
    pub calendar: Vec<Task>,
    pub next_actions: Vec<Task>,
    /// Active projects with their undated tasks.
    pub projects: Vec<ProjectTasks>,
    pub waiting: Vec<Waiting>,
}

impl AllView {
    /// Collects every open task, dated or not.
    pub fn build(store: &ItemStore<'_>) -> Result<Self> {
        let mut projects = Vec::new();
        for project in store.list_active::<ProjectId>()? {
            let tasks = store.list_tasks(&TaskFilter::ProjectUndated(project.id))?;
            if !tasks.is_empty() {
                projects.push(ProjectTasks { project, tasks });
            }
        }

        Ok(Self {
            calendar: store.list_tasks(&TaskFilter::Dated)?,
            next_actions: store.list_tasks(&TaskFilter::NextActions)?,
            projects,
            waiting: store.list_active()?,
        })
    }

    /// True when every section is empty.
    pub fn is_empty(&self) -> bool {
        self.calendar.is_empty()
            && self.next_actions.is_empty()
            && self.projects.is_empty()
            && self.waiting.is_empty()
    }
}

/// Open tasks of a single active project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectView {
    pub project: Project,
    pub dated: Vec<Task>,
    pub undated: Vec<Task>,
}

impl ProjectView {
    /// With `Some(today)` only tasks due that day are listed among the dated
    /// ones; with `None` every dated task is.
    pub fn build(store: &ItemStore<'_>, name: &str, today: Option<Date>) -> Result<Self> {
        let project = store
            .find_active_project(name)?
            .ok_or_else(|| TudoError::not_found(format!("active project `{name}`")))?;

        let dated_filter = match today {
            Some(day) => TaskFilter::ProjectDueOn(project.id, day),
            None => TaskFilter::ProjectDated(project.id),
        };
        let dated = store.list_tasks(&dated_filter)?;
        let undated = store.list_tasks(&TaskFilter::ProjectUndated(project.id))?;

        Ok(Self {
            project,
            dated,
            undated,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.dated.is_empty() && self.undated.is_empty()
    }
}

/// Things to read: matching tasks, or matching someday items when no task
/// matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "items", rename_all = "lowercase")]
pub enum ReadView {
    Tasks(Vec<Task>),
    Someday(Vec<Someday>),
}

impl ReadView {
    /// Prefers matching tasks and falls back to someday items.
    pub fn build(store: &ItemStore<'_>) -> Result<Self> {
        let tasks = store.list_tasks(&TaskFilter::ContainsText(READ_MARKER.to_string()))?;
        if !tasks.is_empty() {
            return Ok(Self::Tasks(tasks));
        }
        Ok(Self::Someday(store.list_active_containing(READ_MARKER)?))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Tasks(tasks) => tasks.is_empty(),
            Self::Someday(items) => items.is_empty(),
        }
    }
}

/// Open items next to the ones finished inside the review window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Split<T> {
    pub pending: Vec<T>,
    pub finished: Vec<T>,
}

/// Items finished on one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FinishedDay {
    pub tasks: Vec<Task>,
    pub waiting: Vec<Waiting>,
}

/// Weekly review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    #[serde(with = "time::serde::rfc3339")]
    pub threshold: OffsetDateTime,
    pub finished_projects: Vec<Project>,
    pub active_projects: Vec<Project>,
    /// Tasks due after the threshold's date.
    pub calendar: Split<Task>,
    pub next_actions: Split<Task>,
    pub waiting: Split<Waiting>,
    /// Every task completed inside the window.
    pub finished_tasks: Vec<Task>,
    /// Open tasks whose due date lies before today.
    pub missed: Vec<Task>,
}

impl Review {
    /// Builds the review for the week ending at `now`.
    pub fn build(store: &ItemStore<'_>, now: OffsetDateTime) -> Result<Self> {
        let threshold = now - REVIEW_WINDOW;
        let today = now.date();

        let (finished, pending): (Vec<Task>, Vec<Task>) = store
            .list_tasks(&TaskFilter::DueAfter(threshold.date()))?
            .into_iter()
            .partition(|task| task.done);

        Ok(Self {
            threshold,
            finished_projects: store.finished_since(threshold)?,
            active_projects: store.list_active()?,
            calendar: Split { pending, finished },
            next_actions: Split {
                pending: store.list_tasks(&TaskFilter::NextActions)?,
                finished: store.list_tasks(&TaskFilter::NextActionsFinishedAfter(threshold))?,
            },
            waiting: Split {
                pending: store.list_active()?,
                finished: store.finished_since(threshold)?,
            },
            finished_tasks: store.tasks_finished_since(threshold)?,
            missed: store.list_tasks(&TaskFilter::DueBefore(today))?,
        })
    }

    /// Finished tasks and waiting items grouped by the day, in the
    /// threshold's offset, they were completed on.
    pub fn finished_by_day(&self) -> BTreeMap<Date, FinishedDay> {
        let offset = self.threshold.offset();
        let mut days: BTreeMap<Date, FinishedDay> = BTreeMap::new();

        for task in &self.finished_tasks {
            if let Some(at) = task.finished_at {
                days.entry(at.to_offset(offset).date())
                    .or_default()
                    .tasks
                    .push(task.clone());
            }
        }
        for item in &self.waiting.finished {
            if let Some(at) = item.finished_at {
                days.entry(at.to_offset(offset).date())
                    .or_default()
                    .waiting
                    .push(item.clone());
            }
        }

        days
    }
}
