//! Append-only record of completions, consumed one entry at a time by undo.

use log::{debug, warn};
use rusqlite::{Connection, OptionalExtension, Row, params};
use time::OffsetDateTime;

use crate::error::{Result, TudoError};
use crate::models::{ItemKind, ItemRef, LogEntry, LogEntryId};
use crate::store::ItemStore;

const ENTRY_COLUMNS: &str = "id, table_name, row_id, created_at";

/// The `action_log` table. Only the newest entry is ever undone.
pub struct ActionLog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ActionLog<'conn> {
    /// Wraps a connection or an open transaction.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Records that `target` was completed. Repeats are allowed.
    pub fn append(&self, target: ItemRef, now: OffsetDateTime) -> Result<LogEntryId> {
        self.conn.execute(
            "INSERT INTO action_log (table_name, row_id, created_at) VALUES (?1, ?2, ?3)",
            params![
                target.kind().table(),
                target.row_id(),
                now.unix_timestamp()
            ],
        )?;
        let id = LogEntryId::new(self.conn.last_insert_rowid());
        debug!("logged action {id} for {target}");
        Ok(id)
    }

    /// The entry with the highest id, if any.
    pub fn peek_latest(&self) -> Result<Option<LogEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM action_log ORDER BY id DESC LIMIT 1");
        let raw = self.conn.query_row(&sql, [], RawEntry::from_row).optional()?;
        raw.map(RawEntry::decode).transpose()
    }

    /// Reopens the entry's item and deletes the entry, atomically.
    ///
    /// On any failure nothing changes and the entry stays at the head of
    /// the log.
    pub fn consume(&self, entry: &LogEntry) -> Result<()> {
        self.try_consume(entry).map_err(|source| {
            warn!("undo of action {} failed: {source}", entry.id);
            TudoError::UndoFailed {
                entry: entry.id,
                source: Box::new(source),
            }
        })
    }

    fn try_consume(&self, entry: &LogEntry) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        ItemStore::new(&tx).mark_undone(entry.target)?;
        let deleted = tx.execute("DELETE FROM action_log WHERE id = ?1", [entry.id.get()])?;
        if deleted == 0 {
            return Err(TudoError::not_found(format!("action {}", entry.id)));
        }

        tx.commit()?;
        debug!("undid action {} on {}", entry.id, entry.target);
        Ok(())
    }

    /// Number of entries still in the log.
    pub fn len(&self) -> Result<usize> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM action_log", [], |row| row.get(0))?)
    }

    /// True when there is nothing to undo.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All entries, newest first.
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM action_log ORDER BY id DESC");
        let mut stmt = self.conn.prepare(&sql)?;
        let raw = stmt
            .query_map([], RawEntry::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        raw.into_iter().map(RawEntry::decode).collect()
    }
}

/// A log row before its kind tag has been checked.
struct RawEntry {
    id: i64,
    table_name: String,
    row_id: i64,
    created_at: i64,
}

impl RawEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            table_name: row.get(1)?,
            row_id: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn decode(self) -> Result<LogEntry> {
        let kind: ItemKind = self.table_name.parse()?;
        Ok(LogEntry {
            id: LogEntryId::new(self.id),
            target: ItemRef::new(kind, self.row_id),
            created_at: OffsetDateTime::from_unix_timestamp(self.created_at)?,
        })
    }
}
