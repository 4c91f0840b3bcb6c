//! incidentd-core - domain model for the incident ticket lifecycle manager.
//!
//! This crate is deliberately free of I/O. It defines:
//!
//! - [`ticket`]: ticket records, dependency edges, historical records,
//!   and creation-time validation
//! - [`clock`]: injectable time source ([`SystemClock`] for production,
//!   [`FixedClock`] for deterministic tests)
//! - [`config`]: retention configuration loaded from TOML
//! - [`synth`]: synthetic ticket generation behind an injected RNG
//!
//! Persistence and the retention cycle itself live in `incidentd-daemon`,
//! which consumes these types.

#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
pub mod synth;
pub mod ticket;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, RetentionConfig};
pub use synth::TicketGenerator;
pub use ticket::{
    Category, EdgeId, ErrorClass, HistoryEnrichment, HistoryRecord, NewTicket, Priority, Ticket,
    TicketError, TicketId, TicketStatus,
};
