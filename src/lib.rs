pub mod action_log;
pub mod capture;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod prompt;
pub mod query;
pub mod service;
pub mod store;

pub use action_log::ActionLog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use db::Database;
pub use error::{ErrorKind, Result, TudoError, ValidationError};
pub use models::{
    Capture, CaptureId, Context, ContextId, Item, ItemId, ItemKind, ItemRef, LogEntry, LogEntryId,
    NewTask, Project, ProjectId, Someday, SomedayId, Task, TaskId, Waiting, WaitingId,
};
pub use query::{AllView, ProjectView, ReadView, Review, TodayView};
pub use service::GtdService;
pub use store::{CleanScope, ItemStore, TaskFilter};
