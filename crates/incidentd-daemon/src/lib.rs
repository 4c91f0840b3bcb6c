//! incidentd-daemon - incident ticket lifecycle engine and SQLite store.
//!
//! Three cooperating pieces:
//!
//! - [`store::TicketStore`]: durable storage for active tickets, dependency
//!   edges, and historical records, with all multi-step mutations scoped as
//!   single SQLite transactions.
//! - [`engine::LifecycleEngine`]: creates tickets, links dependencies, and
//!   owns the retention/archival algorithm.
//! - The `incidentd` binary (`src/main.rs`): the scheduler that triggers one
//!   retention cycle per tick, or exactly one with `--once`.
//!
//! # Referential integrity
//!
//! No dependency edge ever references a ticket absent from the active set.
//! Edge insertion checks both endpoints inside its transaction, and
//! retirement deletes a ticket's edges in the same transaction that
//! archives and removes the ticket. A link racing a retirement therefore
//! either commits first (and is cleaned up by the retirement) or observes
//! the ticket as already gone and fails.

#![forbid(unsafe_code)]

pub mod engine;
pub mod store;

pub use engine::{CycleReport, EngineError, LifecycleEngine};
pub use store::{StoreError, TicketStore};
