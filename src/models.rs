mod ids;
mod item;
mod kind;
mod log_entry;

pub use ids::{CaptureId, ContextId, ItemId, LogEntryId, ProjectId, SomedayId, TaskId, WaitingId};
pub use item::{Capture, Context, Item, NewTask, Project, Someday, Task, Waiting};
pub use kind::{ItemKind, ItemRef, UnknownKind};
pub use log_entry::LogEntry;
