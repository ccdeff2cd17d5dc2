use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{ItemRef, LogEntryId};

/// One recorded completion that undo can reverse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: LogEntryId,
    /// The item that was marked done.
    pub target: ItemRef,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
