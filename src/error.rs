//! Error types returned by every core operation.

use thiserror::Error;
use time::Date;

use crate::models::{ItemRef, LogEntryId, UnknownKind};

pub type Result<T, E = TudoError> = std::result::Result<T, E>;

/// Coarse classification the dispatcher uses to pick an exit path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// I/O or query failure. Always fatal.
    Storage,
    /// The requested id or name does not exist.
    NotFound,
    /// The item is not in a state that allows the requested event.
    InvalidTransition,
    /// Bad user input. Nothing was written.
    Validation,
    /// Undo could not be applied; the log entry was kept.
    UndoFailed,
}

/// Input rejected before touching storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("content cannot be empty")]
    EmptyContent,

    #[error("invalid date `{0}`, expected YYYY-MM-DD")]
    MalformedDate(String),

    #[error("due date {due} has passed already (today is {today})")]
    DueDateInPast { due: Date, today: Date },

    #[error("invalid id `{0}`")]
    MalformedId(String),

    #[error("nothing was captured")]
    EmptyCapture,
}

#[derive(Debug, Error)]
pub enum TudoError {
    /// The SQLite error is kept as the source and never shown to the user.
    #[error("could not access the task database")]
    Storage(#[from] rusqlite::Error),

    /// A row read back from disk does not decode.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0} is already done")]
    AlreadyDone(ItemRef),

    #[error("{0} is still active")]
    NotDone(ItemRef),

    #[error("no actions to undo")]
    NothingToUndo,

    #[error("{kind} `{content}` already exists")]
    AlreadyExists { kind: &'static str, content: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("could not undo action {entry}")]
    UndoFailed {
        entry: LogEntryId,
        #[source]
        source: Box<TudoError>,
    },
}

impl TudoError {
    pub(crate) fn not_found(target: impl std::fmt::Display) -> Self {
        Self::NotFound(target.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Storage(_) | Self::Corrupt(_) => ErrorKind::Storage,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyDone(_) | Self::NotDone(_) | Self::NothingToUndo => {
                ErrorKind::InvalidTransition
            }
            Self::AlreadyExists { .. } | Self::Validation(_) => ErrorKind::Validation,
            Self::UndoFailed { .. } => ErrorKind::UndoFailed,
        }
    }

    /// Whether the command must abort rather than report and exit cleanly.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Storage | ErrorKind::UndoFailed)
    }
}

impl From<UnknownKind> for TudoError {
    fn from(err: UnknownKind) -> Self {
        Self::Corrupt(err.to_string())
    }
}

impl From<time::error::ComponentRange> for TudoError {
    fn from(err: time::error::ComponentRange) -> Self {
        Self::Corrupt(err.to_string())
    }
}
