use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ItemKind, ItemRef};

/// Identifier of a row in one of the five item tables.
///
/// Ids are only unique within their own kind, so each kind gets its own
/// newtype and the trait ties it back to the table it came from.
pub trait ItemId: Copy + fmt::Debug + fmt::Display + PartialEq {
    /// Kind of item this id addresses.
    const KIND: ItemKind;

    /// Wraps a raw database id.
    fn new(id: i64) -> Self;

    /// Returns the underlying id value.
    fn get(self) -> i64;

    /// Converts the id into the kind-tagged reference used by the action log.
    fn item_ref(self) -> ItemRef;
}

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Creates a new id.
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying id value.
            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

macro_rules! item_id {
    ($(#[$meta:meta])* $name:ident => $variant:ident) => {
        row_id!($(#[$meta])* $name);

        impl ItemId for $name {
            const KIND: ItemKind = ItemKind::$variant;

            fn new(id: i64) -> Self {
                Self(id)
            }

            fn get(self) -> i64 {
                self.0
            }

            fn item_ref(self) -> ItemRef {
                ItemRef::$variant(self)
            }
        }
    };
}

item_id!(
    /// Identifier of an inbox capture.
    CaptureId => Capture
);
item_id!(
    /// Identifier of a task (next action, project task or calendar task).
    TaskId => Task
);
item_id!(
    /// Identifier of a project.
    ProjectId => Project
);
item_id!(
    /// Identifier of a waiting-for item.
    WaitingId => Waiting
);
item_id!(
    /// Identifier of a someday/maybe item.
    SomedayId => Someday
);
row_id!(
    /// Identifier of a context label.
    ContextId
);
row_id!(
    /// Identifier of an action log entry. Monotonically increasing.
    LogEntryId
);
