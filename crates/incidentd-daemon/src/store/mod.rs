//! `SQLite`-backed ticket store.
//!
//! Holds the three record sets (active tickets, dependency edges,
//! historical records) behind one connection. Schema setup is idempotent
//! and runs on every open. The two multi-step mutations — edge insertion
//! with its endpoint check, and the archive/delete sequence of a
//! retirement — are each scoped as a single transaction, so no reader ever
//! observes an edge against a missing ticket or a half-retired ticket.
//!
//! # Schema
//!
//! `tickets(id, application, server, error_class, summary, priority,
//! category, status, resolution_secs?, rca_notes?, created_at_ns)`,
//! `dependencies(id, parent_id, child_id)`, and `history` (a copy of the
//! ticket columns plus `original_ticket_id`, `archived_at_ns`, and the
//! optional enrichment columns). See `schema.sql`.

// SQLite returns i64 for row ids and counts, but they are never negative
// here, and u64 nanosecond timestamps fit in i64 until the year 2262.
#![allow(clippy::cast_sign_loss, clippy::cast_possible_wrap)]

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use incidentd_core::ticket::{
    Category, EdgeId, ErrorClass, HistoryEnrichment, HistoryRecord, NewTicket, Priority, Ticket,
    TicketError, TicketId, TicketStatus,
};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;


/// Schema SQL embedded at compile time.
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Errors raised by the ticket store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Database error from `SQLite`.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An edge endpoint does not reference an active ticket.
    #[error("dependency endpoint missing from active set: parent={parent}, child={child}")]
    MissingEndpoint {
        /// Requested parent ticket.
        parent: TicketId,
        /// Requested child ticket.
        child: TicketId,
    },

    /// The ticket is not in the active set.
    #[error("ticket not found in active set: {id}")]
    TicketNotFound {
        /// The missing ticket id.
        id: TicketId,
    },

    /// A persisted row could not be decoded back into the domain model.
    #[error("corrupt row for ticket {id}: {source}")]
    Decode {
        /// Row id of the undecodable ticket.
        id: i64,
        /// Underlying decode failure.
        source: TicketError,
    },

    /// The storage layer is unreachable (poisoned connection lock).
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Raw ticket columns as read from `SQLite`, decoded separately so decode
/// failures carry the row id.
struct TicketRow {
    id: i64,
    application: String,
    server: String,
    error_class: String,
    summary: String,
    priority: String,
    category: String,
    status: String,
    resolution_secs: Option<i64>,
    rca_notes: Option<String>,
    created_at_ns: i64,
}

impl TicketRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            application: row.get(1)?,
            server: row.get(2)?,
            error_class: row.get(3)?,
            summary: row.get(4)?,
            priority: row.get(5)?,
            category: row.get(6)?,
            status: row.get(7)?,
            resolution_secs: row.get(8)?,
            rca_notes: row.get(9)?,
            created_at_ns: row.get(10)?,
        })
    }

    fn decode(self) -> Result<Ticket, StoreError> {
        let id = self.id;
        let wrap = |source| StoreError::Decode { id, source };

        Ok(Ticket {
            id: TicketId::new(id),
            error_class: ErrorClass::parse(&self.error_class).map_err(wrap)?,
            priority: Priority::parse(&self.priority).map_err(wrap)?,
            category: Category::parse(&self.category).map_err(wrap)?,
            status: TicketStatus::from_parts(
                &self.status,
                self.resolution_secs.map(|s| s as u64),
                self.rca_notes,
            )
            .map_err(wrap)?,
            application: self.application,
            server: self.server,
            summary: self.summary,
            created_at_ns: self.created_at_ns as u64,
        })
    }
}

const TICKET_COLUMNS: &str = "id, application, server, error_class, summary, priority, \
                              category, status, resolution_secs, rca_notes, created_at_ns";

/// Durable store for tickets, dependency edges, and history.
///
/// Shared behind an `Arc`; all methods take `&self` and serialise access
/// through an internal mutex, which also gives retirement transactions the
/// single-writer isolation the engine relies on.
#[derive(Debug)]
pub struct TicketStore {
    conn: Arc<Mutex<Connection>>,
}

impl TicketStore {
    /// Opens (or creates) a store at the given path and ensures the schema.
    ///
    /// WAL mode is enabled for concurrent reads. Safe to call on every
    /// startup: schema setup is create-if-absent, never destructive.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialised.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Self::initialize_connection(&conn)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Creates an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialised.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_connection(&conn)?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Per-connection pragmas. `journal_mode` reports the active mode back,
    /// so it is read via `query_row` rather than batched.
    fn initialize_connection(conn: &Connection) -> Result<(), StoreError> {
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA synchronous = NORMAL;")?;
        Ok(())
    }

    /// Creates the three record sets if absent. Idempotent across repeated
    /// invocations and process restarts; existing data is untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the schema DDL fails.
    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Appends a new active ticket and returns its assigned id.
    ///
    /// Ids are unique and strictly increasing relative to every previously
    /// inserted ticket, including retired ones.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub fn insert_ticket(
        &self,
        ticket: &NewTicket,
        created_at_ns: u64,
    ) -> Result<TicketId, StoreError> {
        let conn = self.lock()?;
        let (status, resolution_secs, rca_notes) = ticket.status.to_parts();

        conn.execute(
            "INSERT INTO tickets (application, server, error_class, summary, priority, \
             category, status, resolution_secs, rca_notes, created_at_ns)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                ticket.application,
                ticket.server,
                ticket.error_class.as_str(),
                ticket.summary,
                ticket.priority.as_str(),
                ticket.category.as_str(),
                status,
                resolution_secs.map(|s| s as i64),
                rca_notes,
                created_at_ns as i64,
            ],
        )?;

        let id = TicketId::new(conn.last_insert_rowid());
        debug!(ticket_id = %id, status, "inserted ticket");
        Ok(id)
    }

    /// Appends a dependency edge after verifying both endpoints are active.
    ///
    /// The check and the insert share one transaction, so an edge can never
    /// be committed against a ticket a concurrent retirement has already
    /// removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::MissingEndpoint`] if either endpoint is absent
    /// from the active set.
    pub fn insert_edge(&self, parent: TicketId, child: TicketId) -> Result<EdgeId, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let id = {
            let mut exists = tx.prepare("SELECT 1 FROM tickets WHERE id = ?1")?;
            let parent_active = exists
                .query_row([parent.get()], |_| Ok(()))
                .optional()?
                .is_some();
            let child_active = exists
                .query_row([child.get()], |_| Ok(()))
                .optional()?
                .is_some();
            if !parent_active || !child_active {
                return Err(StoreError::MissingEndpoint { parent, child });
            }

            tx.execute(
                "INSERT INTO dependencies (parent_id, child_id) VALUES (?1, ?2)",
                params![parent.get(), child.get()],
            )?;
            EdgeId::new(tx.last_insert_rowid())
        };

        tx.commit()?;
        debug!(edge_id = %id, parent = %parent, child = %child, "inserted dependency edge");
        Ok(id)
    }

    /// Returns all active tickets created strictly before `cutoff_ns`, in
    /// unspecified order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is corrupt.
    pub fn tickets_older_than(&self, cutoff_ns: u64) -> Result<Vec<Ticket>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets WHERE created_at_ns < ?1"
        ))?;

        let rows = stmt
            .query_map([cutoff_ns as i64], TicketRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter().map(TicketRow::decode).collect()
    }

    /// Retires one ticket: inserts its historical record, deletes every
    /// edge where it is parent or child, and deletes the ticket row, all in
    /// a single transaction. On failure nothing is applied.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TicketNotFound`] if the ticket is no longer in
    /// the active set (for example, already retired by an earlier cycle).
    pub fn archive_and_remove(
        &self,
        ticket: &Ticket,
        enrichment: &HistoryEnrichment,
        archived_at_ns: u64,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let (status, resolution_secs, rca_notes) = ticket.status.to_parts();
        tx.execute(
            "INSERT INTO history (original_ticket_id, application, server, error_class, \
             summary, priority, category, status, resolution_secs, rca_notes, \
             created_at_ns, archived_at_ns, assigned_engineer, resolution_steps)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                ticket.id.get(),
                ticket.application,
                ticket.server,
                ticket.error_class.as_str(),
                ticket.summary,
                ticket.priority.as_str(),
                ticket.category.as_str(),
                status,
                resolution_secs.map(|s| s as i64),
                rca_notes,
                ticket.created_at_ns as i64,
                archived_at_ns as i64,
                enrichment.assigned_engineer,
                enrichment.resolution_steps,
            ],
        )?;

        tx.execute(
            "DELETE FROM dependencies WHERE parent_id = ?1 OR child_id = ?1",
            [ticket.id.get()],
        )?;

        let removed = tx.execute("DELETE FROM tickets WHERE id = ?1", [ticket.id.get()])?;
        if removed == 0 {
            // Dropping the transaction rolls back the history insert.
            return Err(StoreError::TicketNotFound { id: ticket.id });
        }

        tx.commit()?;
        debug!(ticket_id = %ticket.id, "archived and removed ticket");
        Ok(())
    }

    /// Looks up an active ticket by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn get_ticket(&self, id: TicketId) -> Result<Option<Ticket>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
                [id.get()],
                TicketRow::from_row,
            )
            .optional()?;

        row.map(TicketRow::decode).transpose()
    }

    /// Looks up the historical record for a retired ticket by its original
    /// id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is corrupt.
    pub fn history_for_ticket(
        &self,
        original: TicketId,
    ) -> Result<Option<HistoryRecord>, StoreError> {
        let conn = self.lock()?;
        let raw = conn
            .query_row(
                "SELECT id, original_ticket_id, application, server, error_class, summary, \
                 priority, category, status, resolution_secs, rca_notes, created_at_ns, \
                 archived_at_ns, assigned_engineer, resolution_steps
                 FROM history WHERE original_ticket_id = ?1",
                [original.get()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        TicketRow {
                            id: row.get(1)?,
                            application: row.get(2)?,
                            server: row.get(3)?,
                            error_class: row.get(4)?,
                            summary: row.get(5)?,
                            priority: row.get(6)?,
                            category: row.get(7)?,
                            status: row.get(8)?,
                            resolution_secs: row.get(9)?,
                            rca_notes: row.get(10)?,
                            created_at_ns: row.get(11)?,
                        },
                        row.get::<_, i64>(12)?,
                        row.get::<_, Option<String>>(13)?,
                        row.get::<_, Option<String>>(14)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, row, archived_at_ns, assigned_engineer, resolution_steps)) = raw else {
            return Ok(None);
        };
        let ticket = row.decode()?;

        Ok(Some(HistoryRecord {
            id,
            original_ticket_id: ticket.id,
            application: ticket.application,
            server: ticket.server,
            error_class: ticket.error_class,
            summary: ticket.summary,
            priority: ticket.priority,
            category: ticket.category,
            status: ticket.status,
            created_at_ns: ticket.created_at_ns,
            archived_at_ns: archived_at_ns as u64,
            enrichment: HistoryEnrichment {
                assigned_engineer,
                resolution_steps,
            },
        }))
    }

    /// Number of tickets in the active set.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn active_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM tickets")
    }

    /// Number of historical records.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn history_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM history")
    }

    /// Number of dependency edges.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn edge_count(&self) -> Result<u64, StoreError> {
        self.count("SELECT COUNT(*) FROM dependencies")
    }

    /// All dependency edges as `(edge, parent, child)` triples. Used by the
    /// daemon's cycle logging and by integrity checks in tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn edges(&self) -> Result<Vec<(EdgeId, TicketId, TicketId)>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT id, parent_id, child_id FROM dependencies")?;
        let edges = stmt
            .query_map([], |row| {
                Ok((
                    EdgeId::new(row.get(0)?),
                    TicketId::new(row.get(1)?),
                    TicketId::new(row.get(2)?),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    fn count(&self, sql: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(n as u64)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("connection mutex poisoned: {e}")))
    }

    /// Test hook: run arbitrary SQL to sabotage the schema.
    #[cfg(test)]
    pub(crate) fn raw_execute(&self, sql: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(sql)?;
        Ok(())
    }
}
