//! Ticket lifecycle engine.
//!
//! Owns the three public operations of the system: ticket creation,
//! dependency linking, and the retention cycle. The engine holds no
//! state of its own beyond a store handle and an injected clock; the
//! retention window arrives with every cycle invocation and the cadence
//! belongs to the external scheduler.
//!
//! # Retention semantics
//!
//! A cycle computes `cutoff = now - window`, fetches every active ticket
//! created strictly before the cutoff, and retires each one through a
//! single store transaction. Failures are per-ticket: an archival that
//! fails is logged and reported in the [`CycleReport`] while the rest of
//! the expired list is still processed, and tickets that stay behind are
//! picked up again by the next cycle. A ticket is never removed from the
//! active set unless its historical copy committed in the same
//! transaction.

use std::sync::Arc;
use std::time::Duration;

use incidentd_core::clock::Clock;
use incidentd_core::ticket::{
    EdgeId, HistoryEnrichment, NewTicket, Ticket, TicketError, TicketId,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::store::{StoreError, TicketStore};

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A dependency link referenced the same ticket on both ends.
    #[error("self-referential dependency link rejected: {id}")]
    SelfLink {
        /// The ticket used as both parent and child.
        id: TicketId,
    },

    /// A dependency endpoint is not in the active set.
    #[error("dependency endpoint missing: parent={parent}, child={child}")]
    MissingEndpoint {
        /// Requested parent ticket.
        parent: TicketId,
        /// Requested child ticket.
        child: TicketId,
    },

    /// The ticket attributes failed creation-time validation.
    #[error("invalid ticket: {0}")]
    InvalidTicket(#[from] TicketError),

    /// The store rejected the operation.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MissingEndpoint { parent, child } => {
                Self::MissingEndpoint { parent, child }
            },
            other => Self::Store(other),
        }
    }
}

/// Outcome of one retention cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Cutoff applied by this cycle, nanoseconds since the Unix epoch.
    pub cutoff_ns: u64,
    /// Expired tickets found past the cutoff.
    pub scanned: usize,
    /// Tickets successfully archived and removed.
    pub archived: usize,
    /// Tickets whose archival failed, with the failure reason. These stay
    /// in the active set and are retried by the next cycle.
    pub failed: Vec<(TicketId, String)>,
}

impl CycleReport {
    /// Whether every expired ticket was retired.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orchestrates ticket creation, dependency linking, and retention.
pub struct LifecycleEngine {
    store: Arc<TicketStore>,
    clock: Arc<dyn Clock>,
}

impl LifecycleEngine {
    /// Creates an engine over a store and a clock.
    pub fn new(store: Arc<TicketStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Access to the underlying store, for counters and lookups.
    #[must_use]
    pub fn store(&self) -> &TicketStore {
        &self.store
    }

    /// Validates and inserts a new ticket, stamping the creation time from
    /// the injected clock. Status is fixed here; there are no later
    /// transitions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidTicket`] when the attributes are
    /// inconsistent (category outside the error class, blank summary), or
    /// a store error if the insert fails.
    pub fn create_ticket(&self, ticket: &NewTicket) -> Result<TicketId, EngineError> {
        ticket.validate()?;
        let id = self.store.insert_ticket(ticket, self.clock.now_ns())?;
        Ok(id)
    }

    /// Links `child` as a consequence of `parent`.
    ///
    /// Self-links are rejected before the store is touched. Cycles are not
    /// checked: edges are a traceability relation, not a scheduling DAG;
    /// callers keep them sensible by linking within a creation batch or a
    /// small recent window.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SelfLink`] for `parent == child` and
    /// [`EngineError::MissingEndpoint`] when either ticket is not active.
    pub fn link_dependency(
        &self,
        parent: TicketId,
        child: TicketId,
    ) -> Result<EdgeId, EngineError> {
        if parent == child {
            return Err(EngineError::SelfLink { id: parent });
        }
        Ok(self.store.insert_edge(parent, child)?)
    }

    /// Runs one retention cycle with no retirement-time enrichment.
    ///
    /// # Errors
    ///
    /// Returns an error only if the expired-ticket scan itself fails;
    /// per-ticket archival failures are reported in the [`CycleReport`].
    pub fn run_retention_cycle(&self, window: Duration) -> Result<CycleReport, EngineError> {
        self.run_retention_cycle_with(window, |_| HistoryEnrichment::default())
    }

    /// Runs one retention cycle, letting the caller enrich each historical
    /// record (assigned engineer, resolution steps) as tickets retire.
    ///
    /// Safe to run with zero expired tickets, and safe against tickets
    /// created while the cycle runs: their timestamps are at or past `now`,
    /// so they can never fall before this cycle's cutoff.
    ///
    /// # Errors
    ///
    /// Returns an error only if the expired-ticket scan itself fails.
    #[allow(clippy::cast_possible_truncation)] // window fits u64 nanoseconds
    pub fn run_retention_cycle_with(
        &self,
        window: Duration,
        enrich: impl Fn(&Ticket) -> HistoryEnrichment,
    ) -> Result<CycleReport, EngineError> {
        let now_ns = self.clock.now_ns();
        let cutoff_ns = now_ns.saturating_sub(window.as_nanos() as u64);

        let expired = self.store.tickets_older_than(cutoff_ns)?;
        let scanned = expired.len();
        let mut archived = 0usize;
        let mut failed = Vec::new();

        for ticket in expired {
            let enrichment = enrich(&ticket);
            match self
                .store
                .archive_and_remove(&ticket, &enrichment, now_ns)
            {
                Ok(()) => archived += 1,
                Err(e) => {
                    warn!(ticket_id = %ticket.id, error = %e, "failed to retire ticket");
                    failed.push((ticket.id, e.to_string()));
                },
            }
        }

        info!(
            cutoff_ns,
            scanned,
            archived,
            failed = failed.len(),
            "retention cycle complete"
        );

        Ok(CycleReport {
            cutoff_ns,
            scanned,
            archived,
            failed,
        })
    }
}
