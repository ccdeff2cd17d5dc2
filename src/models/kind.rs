use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{CaptureId, ItemId, ProjectId, SomedayId, TaskId, WaitingId};

/// The five item kinds that share the done/finished_at lifecycle.
///
/// Each kind owns one table. The table name is the tag written to the
/// action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    /// Unprocessed inbox entry.
    Capture,
    /// Next action, project task or calendar task.
    Task,
    /// Named container of tasks.
    Project,
    /// Item blocked on someone else.
    Waiting,
    /// Deferred idea.
    Someday,
}

impl ItemKind {
    pub const ALL: [ItemKind; 5] = [
        ItemKind::Capture,
        ItemKind::Task,
        ItemKind::Project,
        ItemKind::Waiting,
        ItemKind::Someday,
    ];

    /// Table holding rows of this kind.
    pub const fn table(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Task => "tasks",
            Self::Project => "projects",
            Self::Waiting => "waiting",
            Self::Someday => "someday",
        }
    }

    /// Human-readable name used in messages.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Capture => "capture item",
            Self::Task => "task",
            Self::Project => "project",
            Self::Waiting => "waiting item",
            Self::Someday => "someday item",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a stored kind tag is not one of the known tables.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown item kind `{0}`")]
pub struct UnknownKind(pub String);

impl FromStr for ItemKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.table() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Kind-tagged reference to a single item.
///
/// This is what a completion is recorded against, and what undo dispatches
/// on. Every variant carries the id type of its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum ItemRef {
    Capture(CaptureId),
    Task(TaskId),
    Project(ProjectId),
    Waiting(WaitingId),
    Someday(SomedayId),
}

impl ItemRef {
    /// Rebuilds a reference from a kind and a raw row id.
    pub fn new(kind: ItemKind, row_id: i64) -> Self {
        match kind {
            ItemKind::Capture => Self::Capture(CaptureId::new(row_id)),
            ItemKind::Task => Self::Task(TaskId::new(row_id)),
            ItemKind::Project => Self::Project(ProjectId::new(row_id)),
            ItemKind::Waiting => Self::Waiting(WaitingId::new(row_id)),
            ItemKind::Someday => Self::Someday(SomedayId::new(row_id)),
        }
    }

    pub fn kind(self) -> ItemKind {
        match self {
            Self::Capture(_) => ItemKind::Capture,
            Self::Task(_) => ItemKind::Task,
            Self::Project(_) => ItemKind::Project,
            Self::Waiting(_) => ItemKind::Waiting,
            Self::Someday(_) => ItemKind::Someday,
        }
    }

    /// Raw row id inside the kind's table.
    pub fn row_id(self) -> i64 {
        match self {
            Self::Capture(id) => id.get(),
            Self::Task(id) => id.get(),
            Self::Project(id) => id.get(),
            Self::Waiting(id) => id.get(),
            Self::Someday(id) => id.get(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.row_id())
    }
}

impl<I: ItemId> From<I> for ItemRef {
    fn from(id: I) -> Self {
        id.item_ref()
    }
}
