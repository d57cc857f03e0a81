//! Note store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes with replace-by-id semantics.
//! - Publish the full collection to live subscribers after each change.
//!
//! # Invariants
//! - Mutation, snapshot read-back and publication happen under one
//!   connection lock inside one transaction, so subscribers observe only
//!   committed states, in commit order.
//! - Statements that change no rows publish nothing.
//! - Collection order is storage insertion order (`rowid`). `insert` of an
//!   existing id re-inserts the row at the end; `update` keeps its position.
//! - Concurrent writes to the same id are last-write-wins in lock order;
//!   callers needing a deterministic winner must serialize them.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::note::{snapshot_of, Note, NoteId, Snapshot};
use crate::sync::hub::{SnapshotHub, Subscription, SubscriptionId};
use log::{debug, error};
use rusqlite::{params, Connection, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use uuid::Uuid;

const NOTES_TABLE: &str = "notes_tbl";
const NOTE_COLUMNS: [&str; 4] = ["id", "title", "description", "entry_date"];

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    entry_date
FROM notes_tbl";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error surfaced by store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Point lookup found no note with this id.
    NotFound(NoteId),
    /// Underlying persistence failure.
    Storage(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "note not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) => None,
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Storage(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(DbError::Sqlite(value))
    }
}

/// Storage contract for notes.
pub trait NoteStore {
    /// Opens a live sequence of full snapshots, starting with the current one.
    fn get_all(&self) -> StoreResult<Subscription>;
    /// Reads the current collection once.
    fn snapshot(&self) -> StoreResult<Snapshot>;
    /// Gets one note by id.
    fn get_by_id(&self, id: NoteId) -> StoreResult<Note>;
    /// Inserts or fully replaces the note with the same id.
    fn insert(&self, note: &Note) -> StoreResult<()>;
    /// Replaces the note with the same id, inserting it if absent.
    fn update(&self, note: &Note) -> StoreResult<()>;
    /// Removes the note with this note's id. Absent ids are a no-op.
    fn delete_by_id(&self, note: &Note) -> StoreResult<()>;
    /// Removes every note.
    fn delete_all(&self) -> StoreResult<()>;
    /// Releases a live sequence opened by `get_all`.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

impl<S: NoteStore + ?Sized> NoteStore for Arc<S> {
    fn get_all(&self) -> StoreResult<Subscription> {
        (**self).get_all()
    }

    fn snapshot(&self) -> StoreResult<Snapshot> {
        (**self).snapshot()
    }

    fn get_by_id(&self, id: NoteId) -> StoreResult<Note> {
        (**self).get_by_id(id)
    }

    fn insert(&self, note: &Note) -> StoreResult<()> {
        (**self).insert(note)
    }

    fn update(&self, note: &Note) -> StoreResult<()> {
        (**self).update(note)
    }

    fn delete_by_id(&self, note: &Note) -> StoreResult<()> {
        (**self).delete_by_id(note)
    }

    fn delete_all(&self) -> StoreResult<()> {
        (**self).delete_all()
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        (**self).unsubscribe(id)
    }
}

/// SQLite-backed note store.
///
/// Blocking: every call may wait on disk I/O and on the connection lock.
/// Share across threads with `Arc`.
#[derive(Debug)]
pub struct SqliteNoteStore {
    conn: Mutex<Connection>,
    hub: SnapshotHub,
}

impl SqliteNoteStore {
    /// Opens (or creates) a database file and wraps it in a store.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Constructs a store from a migrated/ready connection.
    pub fn try_new(conn: Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            hub: SnapshotHub::new(),
        })
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.hub.subscriber_count()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Storage(DbError::ConnectionPoisoned))
    }

    fn mutate(
        &self,
        event: &'static str,
        statement: impl FnOnce(&Connection) -> rusqlite::Result<usize>,
    ) -> StoreResult<()> {
        let started_at = Instant::now();
        let mut conn = self.lock()?;

        let result = (|| -> StoreResult<Option<Snapshot>> {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let changed = statement(&tx)?;
            let snapshot = if changed > 0 {
                Some(load_snapshot(&tx)?)
            } else {
                None
            };
            tx.commit()?;
            Ok(snapshot)
        })();

        match result {
            Ok(Some(snapshot)) => {
                let delivered = self.hub.publish(&snapshot);
                debug!(
                    "event={event} module=store status=ok changed=true notes={} delivered={delivered} duration_ms={}",
                    snapshot.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Ok(None) => {
                debug!(
                    "event={event} module=store status=ok changed=false duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event={event} module=store status=error duration_ms={} error={err}",
                    started_at.elapsed().as_millis()
                );
                Err(err)
            }
        }
    }
}

impl NoteStore for SqliteNoteStore {
    fn get_all(&self) -> StoreResult<Subscription> {
        let conn = self.lock()?;
        let snapshot = load_snapshot(&conn)?;
        Ok(self.hub.subscribe(snapshot))
    }

    fn snapshot(&self) -> StoreResult<Snapshot> {
        let conn = self.lock()?;
        load_snapshot(&conn)
    }

    fn get_by_id(&self, id: NoteId) -> StoreResult<Note> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return parse_note_row(row);
        }

        Err(StoreError::NotFound(id))
    }

    fn insert(&self, note: &Note) -> StoreResult<()> {
        self.mutate("note_insert", |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO notes_tbl (id, title, description, entry_date)
                 VALUES (?1, ?2, ?3, ?4);",
                params![
                    note.id.to_string(),
                    note.title.as_str(),
                    note.description.as_str(),
                    note.entry_date,
                ],
            )
        })
    }

    fn update(&self, note: &Note) -> StoreResult<()> {
        self.mutate("note_update", |conn| {
            conn.execute(
                "INSERT INTO notes_tbl (id, title, description, entry_date)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                    title = excluded.title,
                    description = excluded.description,
                    entry_date = excluded.entry_date;",
                params![
                    note.id.to_string(),
                    note.title.as_str(),
                    note.description.as_str(),
                    note.entry_date,
                ],
            )
        })
    }

    fn delete_by_id(&self, note: &Note) -> StoreResult<()> {
        self.mutate("note_delete", |conn| {
            conn.execute(
                "DELETE FROM notes_tbl WHERE id = ?1;",
                [note.id.to_string()],
            )
        })
    }

    fn delete_all(&self) -> StoreResult<()> {
        self.mutate("note_delete_all", |conn| {
            conn.execute("DELETE FROM notes_tbl;", [])
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(id)
    }
}

fn load_snapshot(conn: &Connection) -> StoreResult<Snapshot> {
    let mut stmt = conn.prepare(&format!("{NOTE_SELECT_SQL} ORDER BY rowid ASC;"))?;
    let mut rows = stmt.query([])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(parse_note_row(row)?);
    }
    Ok(snapshot_of(notes))
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<Note> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        DbError::InvalidData(format!("invalid uuid value `{id_text}` in notes_tbl.id"))
    })?;

    Ok(Note {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        entry_date: row.get("entry_date")?,
    })
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    if !table_exists(conn, NOTES_TABLE)? {
        return Err(DbError::InvalidData(format!("missing required table `{NOTES_TABLE}`")).into());
    }

    for column in NOTE_COLUMNS {
        if !table_has_column(conn, NOTES_TABLE, column)? {
            return Err(DbError::InvalidData(format!(
                "missing required column `{NOTES_TABLE}.{column}`"
            ))
            .into());
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> StoreResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
